//! Metadata storage for reflected types
//!
//! Arbitrary values can be attached to a type record under a string key,
//! either on the type itself (type-level metadata) or on one of its members
//! (member-level metadata). Values are stored type-erased together with their
//! descriptor and read back with a strict downcast.
//!
//! Two keys are understood by serializers:
//! - [`JSON_OBJECT_TYPE`]: `"object"` or `"array"`
//! - [`SEQUENCE_ADAPTER`]: a [`SequenceAdapter`] for array-like types

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{ReflectError, ReflectResult};
use crate::object::{ObjectMut, ObjectRef};
use crate::type_desc::TypeDesc;

/// JSON shape of the type: `"object"` or `"array"`
pub const JSON_OBJECT_TYPE: &str = "json_object_type";

/// Holds a [`SequenceAdapter`] for array-like types
pub const SEQUENCE_ADAPTER: &str = "sequence_adapter";

/// A type-erased metadata value
#[derive(Clone)]
pub struct MetadataValue {
    value: Arc<dyn Any + Send + Sync>,
    ty: TypeDesc,
}

impl MetadataValue {
    /// Wrap a value
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            ty: TypeDesc::of::<T>(),
        }
    }

    /// Descriptor of the stored value
    pub fn type_desc(&self) -> TypeDesc {
        self.ty
    }

    /// Strict downcast
    pub fn downcast<T: Any>(&self) -> ReflectResult<&T> {
        (*self.value)
            .downcast_ref::<T>()
            .ok_or_else(|| ReflectError::type_mismatch(TypeDesc::of::<T>(), self.ty))
    }

    /// Borrowed view of the stored value
    pub fn handle(&self) -> ObjectRef<'_> {
        ObjectRef::erased(&*self.value, self.ty)
    }
}

impl fmt::Debug for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MetadataValue({})", self.ty.name())
    }
}

/// Metadata attached to one type
#[derive(Clone, Debug, Default)]
pub struct MetadataStore {
    /// Type-level metadata (key -> value)
    direct: FxHashMap<String, MetadataValue>,
    /// Member-level metadata (member -> key -> value)
    members: FxHashMap<String, FxHashMap<String, MetadataValue>>,
}

impl MetadataStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Type-level metadata
    // ========================================================================

    /// Attach (or overwrite) metadata, returning the previous value
    pub fn define(&mut self, key: &str, value: MetadataValue) -> Option<MetadataValue> {
        self.direct.insert(key.to_string(), value)
    }

    /// Metadata by key
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.direct.get(key)
    }

    /// Check if a key is present
    pub fn has(&self, key: &str) -> bool {
        self.direct.contains_key(key)
    }

    /// Keys, unordered
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.direct.keys().map(String::as_str)
    }

    // ========================================================================
    // Member-level metadata
    // ========================================================================

    /// Attach metadata to a member
    pub fn define_for_member(
        &mut self,
        member: &str,
        key: &str,
        value: MetadataValue,
    ) -> Option<MetadataValue> {
        self.members
            .entry(member.to_string())
            .or_default()
            .insert(key.to_string(), value)
    }

    /// Member metadata by key
    pub fn get_for_member(&self, member: &str, key: &str) -> Option<&MetadataValue> {
        self.members.get(member)?.get(key)
    }

    /// Keys attached to a member, unordered
    pub fn member_keys(&self, member: &str) -> Vec<&str> {
        self.members
            .get(member)
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Total number of entries at both levels
    pub fn len(&self) -> usize {
        self.direct.len() + self.members.values().map(FxHashMap::len).sum::<usize>()
    }

    /// Check if nothing is attached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Sequence adapter
// ============================================================================

/// Erased element access for a `Vec<E>`
///
/// Lets serializers walk array-like registered types without knowing `E`.
#[derive(Clone, Copy)]
pub struct SequenceAdapter {
    element: TypeDesc,
    len: fn(&dyn Any) -> Option<usize>,
    get: for<'x> fn(&'x dyn Any, usize) -> Option<&'x dyn Any>,
    push: fn(&mut dyn Any, &dyn Any) -> bool,
    clear: fn(&mut dyn Any) -> bool,
}

fn seq_len<E: Any>(seq: &dyn Any) -> Option<usize> {
    seq.downcast_ref::<Vec<E>>().map(Vec::len)
}

fn seq_get<E: Any>(seq: &dyn Any, index: usize) -> Option<&dyn Any> {
    seq.downcast_ref::<Vec<E>>()?
        .get(index)
        .map(|e| e as &dyn Any)
}

fn seq_push<E: Any + Clone>(seq: &mut dyn Any, element: &dyn Any) -> bool {
    match (seq.downcast_mut::<Vec<E>>(), element.downcast_ref::<E>()) {
        (Some(seq), Some(element)) => {
            seq.push(element.clone());
            true
        }
        _ => false,
    }
}

fn seq_clear<E: Any>(seq: &mut dyn Any) -> bool {
    seq.downcast_mut::<Vec<E>>().map(Vec::clear).is_some()
}

impl SequenceAdapter {
    /// Adapter for `Vec<E>`
    pub fn of<E: Any + Clone>() -> Self {
        Self {
            element: TypeDesc::of::<E>(),
            len: seq_len::<E>,
            get: seq_get::<E>,
            push: seq_push::<E>,
            clear: seq_clear::<E>,
        }
    }

    /// Element descriptor
    pub fn element_type(&self) -> TypeDesc {
        self.element
    }

    /// Number of elements
    pub fn len(&self, seq: ObjectRef<'_>) -> ReflectResult<usize> {
        seq.as_any()
            .and_then(self.len)
            .ok_or_else(|| self.mismatch(seq.type_desc()))
    }

    /// Borrowed view of element `index`, `None` when out of range
    pub fn get<'a>(&self, seq: ObjectRef<'a>, index: usize) -> ReflectResult<Option<ObjectRef<'a>>> {
        let any = seq.as_any().ok_or_else(|| self.mismatch(seq.type_desc()))?;
        if (self.len)(any).is_none() {
            return Err(self.mismatch(seq.type_desc()));
        }
        Ok((self.get)(any, index).map(|e| ObjectRef::erased(e, self.element)))
    }

    /// Append a clone of `element`
    pub fn push(&self, mut seq: ObjectMut<'_>, element: ObjectRef<'_>) -> ReflectResult<()> {
        let value = element
            .as_any()
            .ok_or_else(|| ReflectError::type_mismatch(self.element, element.type_desc()))?;
        let ty = seq.type_desc();
        if (self.push)(seq.as_any_mut(), value) {
            Ok(())
        } else if element.type_desc() != self.element {
            Err(ReflectError::type_mismatch(self.element, element.type_desc()))
        } else {
            Err(self.mismatch(ty))
        }
    }

    /// Remove every element
    pub fn clear(&self, mut seq: ObjectMut<'_>) -> ReflectResult<()> {
        let ty = seq.type_desc();
        if (self.clear)(seq.as_any_mut()) {
            Ok(())
        } else {
            Err(self.mismatch(ty))
        }
    }

    fn mismatch(&self, got: TypeDesc) -> ReflectError {
        ReflectError::TypeMismatch {
            expected: format!("Vec<{}>", self.element.name()),
            got: got.name().to_string(),
        }
    }
}

impl fmt::Debug for SequenceAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SequenceAdapter({})", self.element.name())
    }
}
