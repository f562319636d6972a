use reflex_engine::{
    const_field, field, ObjectRef, ReflectError, Registry, SequenceAdapter, TypeDesc,
    JSON_OBJECT_TYPE, SEQUENCE_ADAPTER,
};
use reflex_json::{from_json, from_json_as, from_str, to_json, to_string, JsonMapError, ARRAY};
use serde_json::json;

#[derive(Debug, Clone, Default, PartialEq)]
struct Address {
    city: String,
    zip: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Person {
    id: u64,
    name: String,
    age: u32,
    height: f64,
    active: bool,
    address: Address,
    scores: Vec<i32>,
}

fn registry() -> Registry {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut registry = Registry::new();
    registry
        .register::<Address>("Address")
        .member("city", field!(Address, city))
        .member("zip", field!(Address, zip))
        .constructor(Address::default)
        .publish()
        .unwrap();
    registry
        .register::<Vec<i32>>("IntList")
        .constructor(Vec::<i32>::new)
        .attach_metadata(JSON_OBJECT_TYPE, ARRAY)
        .attach_metadata(SEQUENCE_ADAPTER, SequenceAdapter::of::<i32>())
        .publish()
        .unwrap();
    registry
        .register::<Person>("Person")
        .member("id", const_field!(Person, id))
        .member("name", field!(Person, name))
        .member("age", field!(Person, age))
        .member("height", field!(Person, height))
        .member("active", field!(Person, active))
        .member("address", field!(Person, address))
        .member("scores", field!(Person, scores))
        .constructor(Person::default)
        .publish()
        .unwrap();
    registry
}

fn alice() -> Person {
    Person {
        id: 7,
        name: "Alice".to_string(),
        age: 31,
        height: 1.75,
        active: true,
        address: Address {
            city: "Lisbon".to_string(),
            zip: 1100,
        },
        scores: vec![3, 1, 4],
    }
}

#[test]
fn test_object_to_json() {
    let registry = registry();
    let value = to_json(&registry, ObjectRef::new(&alice())).unwrap();
    assert_eq!(
        value,
        json!({
            "id": 7,
            "name": "Alice",
            "age": 31,
            "height": 1.75,
            "active": true,
            "address": { "city": "Lisbon", "zip": 1100 },
            "scores": [3, 1, 4],
        })
    );
}

#[test]
fn test_object_from_json() {
    let registry = registry();
    let person: Person = from_json_as(
        &registry,
        &json!({
            "name": "Alice",
            "age": 31,
            "height": 1.75,
            "active": true,
            "address": { "city": "Lisbon", "zip": 1100 },
            "scores": [3, 1, 4],
        }),
    )
    .unwrap();
    assert_eq!(person, Person { id: 0, ..alice() });
}

#[test]
fn test_text_round_trip() {
    let registry = registry();
    let mut original = alice();
    original.id = 0;
    let text = to_string(&registry, ObjectRef::new(&original)).unwrap();

    let object = from_str(&registry, TypeDesc::of::<Person>(), &text).unwrap();
    assert_eq!(object.type_desc(), TypeDesc::of::<Person>());
    assert_eq!(object.into_inner::<Person>().unwrap(), original);
}

#[test]
fn test_unknown_and_missing_keys() {
    let registry = registry();
    let person: Person = from_json_as(
        &registry,
        &json!({ "name": "Bob", "nickname": "bobby", "address": { "planet": "Earth" } }),
    )
    .unwrap();
    assert_eq!(person.name, "Bob");
    assert_eq!(person.age, 0);
    assert_eq!(person.address, Address::default());
    assert!(person.scores.is_empty());
}

#[test]
fn test_const_member_is_not_written() {
    let registry = registry();
    let person: Person = from_json_as(&registry, &json!({ "id": 99, "age": 5 })).unwrap();
    assert_eq!(person.id, 0);
    assert_eq!(person.age, 5);
}

#[test]
fn test_array_type() {
    let registry = registry();
    let list = from_json(&registry, TypeDesc::of::<Vec<i32>>(), &json!([5, 6])).unwrap();
    assert_eq!(list.get::<Vec<i32>>().unwrap(), vec![5, 6]);

    let value = to_json(&registry, ObjectRef::new(&vec![9i32])).unwrap();
    assert_eq!(value, json!([9]));

    let err = from_json(&registry, TypeDesc::of::<Vec<i32>>(), &json!([1, "two"])).unwrap_err();
    assert!(matches!(err, JsonMapError::UnexpectedJson { found: "string", .. }));
}

#[test]
fn test_wrong_json_shape() {
    let registry = registry();
    let err = from_json(&registry, TypeDesc::of::<Person>(), &json!([1, 2])).unwrap_err();
    assert!(matches!(err, JsonMapError::UnexpectedJson { found: "array", .. }));

    let err = from_json(&registry, TypeDesc::of::<Person>(), &json!({ "age": "old" })).unwrap_err();
    assert!(matches!(err, JsonMapError::UnexpectedJson { found: "string", .. }));
}

#[test]
fn test_missing_constructor() {
    #[derive(Debug, Clone, Default)]
    struct Bare {
        n: i32,
    }

    let mut registry = Registry::new();
    registry
        .register::<Bare>("Bare")
        .member("n", field!(Bare, n))
        .publish()
        .unwrap();

    let err = from_json(&registry, TypeDesc::of::<Bare>(), &json!({ "n": 1 })).unwrap_err();
    assert!(matches!(
        err,
        JsonMapError::Reflect(ReflectError::MethodNotFound { .. })
    ));
    assert_eq!(
        to_json(&registry, ObjectRef::new(&Bare { n: 3 })).unwrap(),
        json!({ "n": 3 })
    );
}

#[test]
fn test_derived_type_without_constructor() {
    #[derive(Debug, Clone, Default)]
    struct Office {
        address: Address,
        floor: i32,
    }

    let mut registry = registry();
    registry
        .register::<Office>("Office")
        .derives_from::<Address>(|o| &o.address, |o| &mut o.address)
        .member("floor", field!(Office, floor))
        .publish()
        .unwrap();

    let err = from_json(&registry, TypeDesc::of::<Office>(), &json!({ "floor": 2 })).unwrap_err();
    assert!(matches!(
        err,
        JsonMapError::Reflect(ReflectError::MethodNotFound { .. })
    ));
}

#[test]
fn test_unregistered_member_type() {
    #[derive(Debug, Clone, Default)]
    struct Secret;

    #[derive(Debug, Clone, Default)]
    struct Holder {
        secret: Secret,
    }

    let mut registry = Registry::new();
    registry
        .register::<Holder>("Holder")
        .member("secret", field!(Holder, secret))
        .constructor(Holder::default)
        .publish()
        .unwrap();

    let err = to_json(&registry, ObjectRef::new(&Holder::default())).unwrap_err();
    assert!(matches!(
        err,
        JsonMapError::Reflect(ReflectError::NotRegistered(_))
    ));
}

#[test]
fn test_unsupported_shape_tag() {
    #[derive(Debug, Clone, Default)]
    struct Odd;

    let mut registry = Registry::new();
    registry
        .register::<Odd>("Odd")
        .constructor(Odd::default)
        .attach_metadata(JSON_OBJECT_TYPE, "table")
        .publish()
        .unwrap();

    let err = to_json(&registry, ObjectRef::new(&Odd)).unwrap_err();
    assert!(matches!(err, JsonMapError::UnsupportedShape { ref shape, .. } if shape == "table"));
}

#[test]
fn test_syntax_error() {
    let registry = registry();
    let err = from_str(&registry, TypeDesc::of::<Person>(), "{ \"name\": ").unwrap_err();
    assert!(matches!(err, JsonMapError::Syntax(_)));
}
