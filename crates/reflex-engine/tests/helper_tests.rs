use std::any::Any;

use reflex_engine::{args, CallableWrapper, ObjectRef, Receiver, TypeDesc};

#[test]
fn test_can_cast_to() {
    let x: Box<dyn Any> = Box::new(2.5f32);
    assert!(TypeDesc::of::<f32>().matches(x.as_ref()));
    assert!(!TypeDesc::of::<i32>().matches(x.as_ref()));
}

struct TestClass {
    x: f32,
    y: f32,
}

impl TestClass {
    fn test_function(&mut self, x: f32, y: f32) -> f32 {
        self.x = x;
        self.y = y;
        x + y
    }

    fn test_void_function(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }
}

#[test]
fn test_any_wrapper() {
    let mut test_class = TestClass { x: 0.0, y: 0.0 };
    let with_result = CallableWrapper::method(TestClass::test_function);
    let without_result = CallableWrapper::method(TestClass::test_void_function);

    let a = 3.2f32;
    let b = 2.1f32;
    let pack = [ObjectRef::new(&a), ObjectRef::new(&b)];

    let invoke_result = with_result
        .invoke(Receiver::Exclusive(&mut test_class), &pack)
        .unwrap();
    let void_result = without_result
        .invoke(Receiver::Exclusive(&mut test_class), &pack)
        .unwrap();

    assert_eq!(invoke_result.get::<f32>().unwrap(), 3.2f32 + 2.1f32);
    assert!(void_result.is_void());
    assert_eq!(test_class.x, 3.2);
    assert_eq!(test_class.y, 2.1);
}

#[test]
fn test_wrapper_signature() {
    let wrapper = CallableWrapper::method(TestClass::test_function);
    assert_eq!(wrapper.owner_type(), Some(TypeDesc::of::<TestClass>()));
    assert_eq!(wrapper.return_type(), TypeDesc::of::<f32>());
    assert_eq!(
        wrapper.arg_types(),
        &[TypeDesc::of::<f32>(), TypeDesc::of::<f32>()]
    );
    assert!(wrapper.matches(&[TypeDesc::of::<f32>(), TypeDesc::of::<f32>()], None));
    assert!(!wrapper.matches(
        &[TypeDesc::of::<f32>(), TypeDesc::of::<f32>()],
        Some(TypeDesc::void())
    ));
}

#[test]
fn test_erased_arguments_of_wrong_type() {
    let mut test_class = TestClass { x: 0.0, y: 0.0 };
    let wrapper = CallableWrapper::method(TestClass::test_function);

    let list = args![1.0f64, 2.0f64];
    let err = wrapper
        .invoke(
            Receiver::Exclusive(&mut test_class),
            &list.to_object_wrappers(),
        )
        .unwrap_err();
    assert!(matches!(err, reflex_engine::ReflectError::TypeMismatch { .. }));
    assert_eq!(test_class.x, 0.0);
}
