//! Structural mapping between registered objects and `serde_json::Value`
//!
//! Primitives map directly. A registered type is written as a JSON object
//! keyed by member name unless it carries the `"array"` shape tag under
//! [`JSON_OBJECT_TYPE`], in which case its [`SequenceAdapter`] drives the
//! conversion to and from a JSON array.

use log::{debug, trace};
use reflex_engine::{
    ArgList, ObjectRef, Registry, SequenceAdapter, SharedObject, TypeDesc, TypeRecord, CTOR,
    JSON_OBJECT_TYPE, SEQUENCE_ADAPTER,
};
use serde_json::{Map, Value};

use crate::error::{JsonMapError, JsonMapResult};

/// Shape tag for types written as JSON objects (the default)
pub const OBJECT: &str = "object";

/// Shape tag for sequence types written as JSON arrays
pub const ARRAY: &str = "array";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Object,
    Array,
}

fn shape_of(record: &TypeRecord) -> JsonMapResult<Shape> {
    let Some(tag) = record.get_metadata(JSON_OBJECT_TYPE) else {
        return Ok(Shape::Object);
    };
    let tag: &str = match tag.downcast::<&'static str>() {
        Ok(tag) => *tag,
        Err(_) => tag.downcast::<String>()?.as_str(),
    };
    match tag {
        OBJECT => Ok(Shape::Object),
        ARRAY => Ok(Shape::Array),
        other => Err(JsonMapError::UnsupportedShape {
            type_name: record.name().to_string(),
            shape: other.to_string(),
        }),
    }
}

fn adapter_of(record: &TypeRecord) -> JsonMapResult<SequenceAdapter> {
    Ok(*record.get_metadata_as::<SequenceAdapter>(SEQUENCE_ADAPTER)?)
}

fn json_kind(json: &Value) -> &'static str {
    match json {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn unexpected(ty: TypeDesc, json: &Value) -> JsonMapError {
    JsonMapError::UnexpectedJson {
        expected: ty.name().to_string(),
        found: json_kind(json),
    }
}

// ============================================================================
// Object -> JSON
// ============================================================================

macro_rules! primitive_to_json {
    ($object:expr; $($ty:ty),* $(,)?) => {
        $(
            if let Ok(value) = $object.downcast::<$ty>() {
                return Some(Value::from(value.clone()));
            }
        )*
    };
}

fn primitive_to_json(object: ObjectRef<'_>) -> Option<Value> {
    primitive_to_json!(object; bool, i32, i64, u32, u64, f32, f64, String);
    None
}

/// Convert a reflected object to a JSON value
///
/// The none handle maps to `null`. Non-primitive values must belong to a type
/// registered in `registry`, as must every member type reached while walking it.
pub fn to_json(registry: &Registry, object: ObjectRef<'_>) -> JsonMapResult<Value> {
    if object.is_none() {
        return Ok(Value::Null);
    }
    if let Some(value) = primitive_to_json(object) {
        return Ok(value);
    }

    let record = registry.lookup(object.type_desc())?;
    match shape_of(&record)? {
        Shape::Object => {
            let mut map = Map::new();
            for member in record.all_members() {
                let value = record.get_member_wrapped(object, member.name());
                map.insert(member.name().to_string(), to_json(registry, value)?);
            }
            Ok(Value::Object(map))
        }
        Shape::Array => {
            let adapter = adapter_of(&record)?;
            let len = adapter.len(object)?;
            let mut items = Vec::with_capacity(len);
            for index in 0..len {
                let element = adapter.get(object, index)?.unwrap_or_else(ObjectRef::none);
                items.push(to_json(registry, element)?);
            }
            Ok(Value::Array(items))
        }
    }
}

/// Serialize a reflected object to compact JSON text
pub fn to_string(registry: &Registry, object: ObjectRef<'_>) -> JsonMapResult<String> {
    Ok(serde_json::to_string(&to_json(registry, object)?)?)
}

/// Serialize a reflected object to indented JSON text
pub fn to_string_pretty(registry: &Registry, object: ObjectRef<'_>) -> JsonMapResult<String> {
    Ok(serde_json::to_string_pretty(&to_json(registry, object)?)?)
}

// ============================================================================
// JSON -> Object
// ============================================================================

macro_rules! primitive_from_json {
    ($ty_desc:expr, $json:expr; $($ty:ty => $read:expr),* $(,)?) => {
        $(
            if $ty_desc.is::<$ty>() {
                let read: fn(&Value) -> Option<$ty> = $read;
                return Some(
                    read($json)
                        .map(SharedObject::new)
                        .ok_or_else(|| unexpected($ty_desc, $json)),
                );
            }
        )*
    };
}

fn primitive_from_json(ty: TypeDesc, json: &Value) -> Option<JsonMapResult<SharedObject>> {
    primitive_from_json!(ty, json;
        bool => Value::as_bool,
        i32 => |v| v.as_i64().and_then(|n| i32::try_from(n).ok()),
        i64 => Value::as_i64,
        u32 => |v| v.as_u64().and_then(|n| u32::try_from(n).ok()),
        u64 => Value::as_u64,
        f32 => |v| v.as_f64().map(|n| n as f32),
        f64 => Value::as_f64,
        String => |v| v.as_str().map(str::to_string),
    );
    None
}

/// Build a new object of type `ty` from a JSON value
///
/// Registered types are default-constructed through their zero-argument
/// `"ctor"` and then populated member by member. Keys naming no member, and
/// keys naming const members, are skipped. Members absent from the input keep
/// their constructed value.
pub fn from_json(registry: &Registry, ty: TypeDesc, json: &Value) -> JsonMapResult<SharedObject> {
    if let Some(result) = primitive_from_json(ty, json) {
        return result;
    }

    let record = registry.lookup(ty)?;
    let object = record.invoke_function(CTOR, &ArgList::new())?.into_shared();
    match shape_of(&record)? {
        Shape::Object => populate_object(registry, &record, &object, json)?,
        Shape::Array => populate_array(registry, &record, &object, json)?,
    }
    Ok(object)
}

fn populate_object(
    registry: &Registry,
    record: &TypeRecord,
    object: &SharedObject,
    json: &Value,
) -> JsonMapResult<()> {
    let map = json
        .as_object()
        .ok_or_else(|| unexpected(record.class_type(), json))?;
    for (key, value) in map {
        let Some(member) = record.member(key) else {
            debug!("{}: ignoring unknown key \"{}\"", record.name(), key);
            continue;
        };
        if member.is_const() {
            debug!("{}: skipping const member \"{}\"", record.name(), key);
            continue;
        }
        trace!("{}: reading \"{}\" as {}", record.name(), key, member.type_desc());

        let child = from_json(registry, member.type_desc(), value)?;
        let child = child.borrow()?;
        let mut target = object.borrow_mut()?;
        record.set_member(target.handle(), key, child.handle())?;
    }
    Ok(())
}

fn populate_array(
    registry: &Registry,
    record: &TypeRecord,
    object: &SharedObject,
    json: &Value,
) -> JsonMapResult<()> {
    let items = json
        .as_array()
        .ok_or_else(|| unexpected(record.class_type(), json))?;
    let adapter = adapter_of(record)?;
    let mut target = object.borrow_mut()?;
    adapter.clear(target.handle())?;
    for item in items {
        let element = from_json(registry, adapter.element_type(), item)?;
        let element = element.borrow()?;
        adapter.push(target.handle(), element.handle())?;
    }
    Ok(())
}

/// Build a new object of type `T` from a JSON value and move it out
pub fn from_json_as<T: 'static>(registry: &Registry, json: &Value) -> JsonMapResult<T> {
    Ok(from_json(registry, TypeDesc::of::<T>(), json)?.into_inner::<T>()?)
}

/// Parse JSON text and build a new object of type `ty` from it
pub fn from_str(registry: &Registry, ty: TypeDesc, text: &str) -> JsonMapResult<SharedObject> {
    let json: Value = serde_json::from_str(text)?;
    from_json(registry, ty, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflex_engine::ReflectError;

    #[test]
    fn test_primitives_to_json() {
        let registry = Registry::new();
        assert_eq!(to_json(&registry, ObjectRef::new(&true)).unwrap(), Value::Bool(true));
        assert_eq!(to_json(&registry, ObjectRef::new(&-3i32)).unwrap(), Value::from(-3));
        assert_eq!(to_json(&registry, ObjectRef::new(&7u64)).unwrap(), Value::from(7u64));
        assert_eq!(to_json(&registry, ObjectRef::new(&1.5f32)).unwrap(), Value::from(1.5));
        assert_eq!(
            to_json(&registry, ObjectRef::new(&"hi".to_string())).unwrap(),
            Value::from("hi")
        );
        assert_eq!(to_json(&registry, ObjectRef::none()).unwrap(), Value::Null);
    }

    #[test]
    fn test_primitives_from_json() {
        let registry = Registry::new();
        let n = from_json(&registry, TypeDesc::of::<i32>(), &Value::from(42)).unwrap();
        assert_eq!(n.get::<i32>().unwrap(), 42);

        let s = from_json(&registry, TypeDesc::of::<String>(), &Value::from("x")).unwrap();
        assert_eq!(s.get::<String>().unwrap(), "x");

        let err = from_json(&registry, TypeDesc::of::<bool>(), &Value::from(1)).unwrap_err();
        assert!(matches!(
            err,
            JsonMapError::UnexpectedJson { found: "number", .. }
        ));
    }

    #[test]
    fn test_integer_out_of_range() {
        let registry = Registry::new();
        let err = from_json(&registry, TypeDesc::of::<i32>(), &Value::from(i64::MAX)).unwrap_err();
        assert!(matches!(err, JsonMapError::UnexpectedJson { .. }));
        let err = from_json(&registry, TypeDesc::of::<u32>(), &Value::from(-1)).unwrap_err();
        assert!(matches!(err, JsonMapError::UnexpectedJson { .. }));
    }

    #[test]
    fn test_unregistered_type() {
        struct Opaque;
        let registry = Registry::new();
        let err = to_json(&registry, ObjectRef::new(&Opaque)).unwrap_err();
        assert!(matches!(err, JsonMapError::Reflect(ReflectError::NotRegistered(_))));
    }

    #[test]
    fn test_json_kind() {
        assert_eq!(json_kind(&Value::Null), "null");
        assert_eq!(json_kind(&Value::Array(vec![])), "array");
        assert_eq!(json_kind(&Value::Object(Map::new())), "object");
    }
}
