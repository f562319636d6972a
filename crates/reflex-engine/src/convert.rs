//! Conversion between typed argument tuples and erased argument slots
//!
//! `ArgTuple` is implemented for tuples of up to six `Clone + 'static`
//! elements. The erased path clones each argument out of its handle; the
//! statically-typed path moves the tuple straight into the callable.

use std::any::Any;

use crate::error::{ReflectError, ReflectResult};
use crate::object::ObjectRef;
use crate::type_desc::TypeDesc;

/// A tuple of argument types usable at a reflected call site
pub trait ArgTuple: Sized + 'static {
    /// Number of elements
    const ARITY: usize;

    /// Element descriptors, in order
    fn type_descs() -> Vec<TypeDesc>;

    /// Clone each element out of its erased slot
    fn from_handles(args: &[ObjectRef<'_>]) -> ReflectResult<Self>;
}

macro_rules! impl_arg_tuple {
    ($arity:expr; $($ty:ident => $idx:tt),*) => {
        impl<$($ty: Any + Clone),*> ArgTuple for ($($ty,)*) {
            const ARITY: usize = $arity;

            fn type_descs() -> Vec<TypeDesc> {
                vec![$(TypeDesc::of::<$ty>()),*]
            }

            #[allow(unused_variables)]
            fn from_handles(args: &[ObjectRef<'_>]) -> ReflectResult<Self> {
                if args.len() != $arity {
                    return Err(ReflectError::ArgumentCount {
                        expected: $arity,
                        got: args.len(),
                    });
                }
                Ok(($(args[$idx].deref_into::<$ty>()?,)*))
            }
        }
    };
}

impl_arg_tuple!(0;);
impl_arg_tuple!(1; A => 0);
impl_arg_tuple!(2; A => 0, B => 1);
impl_arg_tuple!(3; A => 0, B => 1, C => 2);
impl_arg_tuple!(4; A => 0, B => 1, C => 2, D => 3);
impl_arg_tuple!(5; A => 0, B => 1, C => 2, D => 3, E => 4);
impl_arg_tuple!(6; A => 0, B => 1, C => 2, D => 3, E => 4, F => 5);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_descs() {
        assert!(<()>::type_descs().is_empty());
        assert_eq!(
            <(f32, i32)>::type_descs(),
            vec![TypeDesc::of::<f32>(), TypeDesc::of::<i32>()]
        );
        assert_eq!(<(u8, u8, u8, u8, u8, u8)>::ARITY, 6);
    }

    #[test]
    fn test_from_handles() {
        let x = 1.0f32;
        let name = String::from("v");
        let handles = [ObjectRef::new(&x), ObjectRef::new(&name)];
        let (a, b) = <(f32, String)>::from_handles(&handles).unwrap();
        assert_eq!(a, 1.0);
        assert_eq!(b, "v");
    }

    #[test]
    fn test_from_handles_arity() {
        let x = 1.0f32;
        let err = <(f32, f32)>::from_handles(&[ObjectRef::new(&x)]).unwrap_err();
        assert_eq!(err, ReflectError::ArgumentCount { expected: 2, got: 1 });
    }

    #[test]
    fn test_from_handles_type_mismatch() {
        let x = 1i32;
        let err = <(f32,)>::from_handles(&[ObjectRef::new(&x)]).unwrap_err();
        assert!(matches!(err, ReflectError::TypeMismatch { .. }));
    }
}
