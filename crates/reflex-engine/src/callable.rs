//! Callable table: methods, free functions and overload sets
//!
//! Every registered callable is captured twice:
//!
//! - an **erased adapter** `(Receiver, &[ObjectRef]) -> ReturnValue` used when
//!   the call site only has runtime descriptors, and
//! - a **typed adapter** `(Receiver, Args) -> R` stored behind `Any`, which a
//!   call site with compile-time known types downcasts and calls directly.
//!
//! Both wrap the same user callable, so both paths produce identical results.
//! Overload sets are keyed by the exact argument signature; a lookup is one
//! hash probe, and no implicit conversion is ever attempted.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::convert::ArgTuple;
use crate::error::{ReflectError, ReflectResult};
use crate::object::{ObjectMut, ObjectRef};
use crate::type_desc::TypeDesc;
use crate::value::ReturnValue;

// ============================================================================
// Receiver
// ============================================================================

/// The object a callable is invoked on
pub enum Receiver<'a> {
    /// Free functions and constructors
    None,
    /// Read-only receiver; only const methods accept it
    Shared(&'a dyn Any),
    /// Exclusive receiver; accepted by every method
    Exclusive(&'a mut dyn Any),
}

impl<'a> Receiver<'a> {
    /// Shorter-lived receiver over the same object
    pub fn reborrow(&mut self) -> Receiver<'_> {
        match self {
            Receiver::None => Receiver::None,
            Receiver::Shared(object) => Receiver::Shared(*object),
            Receiver::Exclusive(object) => Receiver::Exclusive(&mut **object),
        }
    }

    /// Check if the receiver allows mutation
    pub fn is_exclusive(&self) -> bool {
        matches!(self, Receiver::Exclusive(_))
    }

    fn object<T: Any>(self) -> ReflectResult<&'a T> {
        let object: Option<&'a dyn Any> = match self {
            Receiver::None => None,
            Receiver::Shared(object) => Some(object),
            Receiver::Exclusive(object) => Some(&*object),
        };
        object
            .and_then(|o| o.downcast_ref::<T>())
            .ok_or_else(|| receiver_mismatch::<T>())
    }

    fn object_mut<T: Any>(self) -> ReflectResult<&'a mut T> {
        match self {
            Receiver::Exclusive(object) => object
                .downcast_mut::<T>()
                .ok_or_else(|| receiver_mismatch::<T>()),
            Receiver::Shared(_) => Err(ReflectError::const_violation(
                TypeDesc::of::<T>(),
                "receiver",
            )),
            Receiver::None => Err(receiver_mismatch::<T>()),
        }
    }
}

fn receiver_mismatch<T: Any>() -> ReflectError {
    ReflectError::TypeMismatch {
        expected: TypeDesc::of::<T>().name().to_string(),
        got: "receiver of another type".to_string(),
    }
}

impl<'a> From<ObjectMut<'a>> for Receiver<'a> {
    fn from(object: ObjectMut<'a>) -> Self {
        Receiver::Exclusive(object.into_any())
    }
}

impl<'a> From<ObjectRef<'a>> for Receiver<'a> {
    fn from(object: ObjectRef<'a>) -> Self {
        object.as_any().map_or(Receiver::None, Receiver::Shared)
    }
}

// ============================================================================
// Adapters
// ============================================================================

/// Statically-typed adapter shape
pub type TypedFn<Args, R> = Arc<dyn Fn(Receiver<'_>, Args) -> ReflectResult<R> + Send + Sync>;

/// Erased adapter shape
pub type InvokeFn =
    Arc<dyn Fn(Receiver<'_>, &[ObjectRef<'_>]) -> ReflectResult<ReturnValue> + Send + Sync>;

/// Marker for methods taking `&T`
pub struct ConstMethod;

/// Marker for methods taking `&mut T`
pub struct MutMethod;

/// Callables usable as methods of `T`
///
/// Implemented for `Fn(&T, A..) -> R` (const) and `Fn(&mut T, A..) -> R`
/// with up to six arguments. `Kind` only disambiguates the two receiver forms.
pub trait IntoMethod<T, Args, R, Kind>: Send + Sync + 'static {
    /// Whether the method only needs a shared receiver
    const IS_CONST: bool;

    /// Capture as a typed adapter
    fn into_typed(self) -> TypedFn<Args, R>;
}

/// Callables usable as free functions or constructors
pub trait IntoFunction<Args, R>: Send + Sync + 'static {
    /// Capture as a typed adapter; the receiver is ignored
    fn into_typed(self) -> TypedFn<Args, R>;
}

macro_rules! impl_callables {
    ($($ty:ident $arg:ident),*) => {
        impl<T, R, Func, $($ty),*> IntoMethod<T, ($($ty,)*), R, ConstMethod> for Func
        where
            T: Any,
            R: Any,
            Func: Fn(&T, $($ty),*) -> R + Send + Sync + 'static,
            $($ty: Any + Clone,)*
        {
            const IS_CONST: bool = true;

            fn into_typed(self) -> TypedFn<($($ty,)*), R> {
                Arc::new(move |receiver: Receiver<'_>, ($($arg,)*): ($($ty,)*)| {
                    let object = receiver.object::<T>()?;
                    Ok((self)(object, $($arg),*))
                })
            }
        }

        impl<T, R, Func, $($ty),*> IntoMethod<T, ($($ty,)*), R, MutMethod> for Func
        where
            T: Any,
            R: Any,
            Func: Fn(&mut T, $($ty),*) -> R + Send + Sync + 'static,
            $($ty: Any + Clone,)*
        {
            const IS_CONST: bool = false;

            fn into_typed(self) -> TypedFn<($($ty,)*), R> {
                Arc::new(move |receiver: Receiver<'_>, ($($arg,)*): ($($ty,)*)| {
                    let object = receiver.object_mut::<T>()?;
                    Ok((self)(object, $($arg),*))
                })
            }
        }

        impl<R, Func, $($ty),*> IntoFunction<($($ty,)*), R> for Func
        where
            R: Any,
            Func: Fn($($ty),*) -> R + Send + Sync + 'static,
            $($ty: Any + Clone,)*
        {
            fn into_typed(self) -> TypedFn<($($ty,)*), R> {
                Arc::new(move |_receiver: Receiver<'_>, ($($arg,)*): ($($ty,)*)| {
                    Ok((self)($($arg),*))
                })
            }
        }
    };
}

impl_callables!();
impl_callables!(A a);
impl_callables!(A a, B b);
impl_callables!(A a, B b, C c);
impl_callables!(A a, B b, C c, D d);
impl_callables!(A a, B b, C c, D d, E e);
impl_callables!(A a, B b, C c, D d, E e, F f);

// ============================================================================
// CallableWrapper
// ============================================================================

/// One registered overload
#[derive(Clone)]
pub struct CallableWrapper {
    invoke: InvokeFn,
    typed: Arc<dyn Any + Send + Sync>,
    return_type: TypeDesc,
    arg_types: Vec<TypeDesc>,
    owner_type: Option<TypeDesc>,
    is_const: bool,
}

impl CallableWrapper {
    /// Wrap a method of `T`
    pub fn method<T, Args, R, Kind, F>(method: F) -> Self
    where
        T: Any,
        Args: ArgTuple,
        R: Any,
        F: IntoMethod<T, Args, R, Kind>,
    {
        Self::from_typed(method.into_typed(), Some(TypeDesc::of::<T>()), F::IS_CONST)
    }

    /// Wrap a free function or constructor
    pub fn function<Args, R, F>(function: F) -> Self
    where
        Args: ArgTuple,
        R: Any,
        F: IntoFunction<Args, R>,
    {
        Self::from_typed(function.into_typed(), None, false)
    }

    fn from_typed<Args: ArgTuple, R: Any>(
        typed: TypedFn<Args, R>,
        owner_type: Option<TypeDesc>,
        is_const: bool,
    ) -> Self {
        let target = Arc::clone(&typed);
        let invoke: InvokeFn = Arc::new(
            move |receiver: Receiver<'_>, args: &[ObjectRef<'_>]| {
                let args = Args::from_handles(args)?;
                target(receiver, args).map(ReturnValue::new)
            },
        );
        Self {
            invoke,
            typed: Arc::new(typed),
            return_type: TypeDesc::of::<R>(),
            arg_types: Args::type_descs(),
            owner_type,
            is_const,
        }
    }

    /// Call through the erased adapter
    pub fn invoke(
        &self,
        receiver: Receiver<'_>,
        args: &[ObjectRef<'_>],
    ) -> ReflectResult<ReturnValue> {
        (self.invoke)(receiver, args)
    }

    /// Reinterpret as the typed adapter shape `(Args) -> R`
    ///
    /// Returns `None` when the stored callable has a different shape.
    pub fn typed<Args: ArgTuple, R: Any>(&self) -> Option<&TypedFn<Args, R>> {
        (*self.typed).downcast_ref::<TypedFn<Args, R>>()
    }

    /// Declared return type
    pub fn return_type(&self) -> TypeDesc {
        self.return_type
    }

    /// Declared argument types
    pub fn arg_types(&self) -> &[TypeDesc] {
        &self.arg_types
    }

    /// Owning type for methods, `None` for functions
    pub fn owner_type(&self) -> Option<TypeDesc> {
        self.owner_type
    }

    /// Whether a shared receiver suffices
    pub fn is_const(&self) -> bool {
        self.is_const
    }

    /// Exact signature match; `ret` is only checked when given
    pub fn matches(&self, args: &[TypeDesc], ret: Option<TypeDesc>) -> bool {
        self.arg_types == args && ret.is_none_or(|r| r == self.return_type)
    }
}

impl fmt::Debug for CallableWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallableWrapper")
            .field("args", &self.arg_types)
            .field("ret", &self.return_type)
            .field("owner", &self.owner_type)
            .field("is_const", &self.is_const)
            .finish()
    }
}

// ============================================================================
// Overload sets
// ============================================================================

/// All overloads registered under one name
#[derive(Clone, Default, Debug)]
pub struct OverloadSet {
    overloads: Vec<CallableWrapper>,
    by_signature: FxHashMap<Vec<TypeDesc>, usize>,
}

impl OverloadSet {
    /// Add an overload; hands it back if its argument signature is taken
    pub(crate) fn insert(&mut self, wrapper: CallableWrapper) -> Result<(), CallableWrapper> {
        if self.by_signature.contains_key(wrapper.arg_types()) {
            return Err(wrapper);
        }
        self.by_signature
            .insert(wrapper.arg_types.clone(), self.overloads.len());
        self.overloads.push(wrapper);
        Ok(())
    }

    /// Exact match on arguments and, when given, on the return type
    pub fn resolve(&self, args: &[TypeDesc], ret: Option<TypeDesc>) -> Option<&CallableWrapper> {
        let wrapper = &self.overloads[*self.by_signature.get(args)?];
        wrapper.matches(args, ret).then_some(wrapper)
    }

    /// Overloads in registration order
    pub fn iter(&self) -> std::slice::Iter<'_, CallableWrapper> {
        self.overloads.iter()
    }

    /// Number of overloads
    pub fn len(&self) -> usize {
        self.overloads.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.overloads.is_empty()
    }

    /// True if any overload was captured from a const method
    pub fn any_const(&self) -> bool {
        self.overloads.iter().any(CallableWrapper::is_const)
    }
}

/// Name to overload set map
#[derive(Clone, Default, Debug)]
pub struct CallableTable {
    sets: FxHashMap<String, OverloadSet>,
}

impl CallableTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an overload under `name`
    pub(crate) fn insert(
        &mut self,
        name: &str,
        wrapper: CallableWrapper,
    ) -> Result<(), CallableWrapper> {
        self.sets.entry(name.to_string()).or_default().insert(wrapper)
    }

    /// Overload set for `name`
    pub fn get(&self, name: &str) -> Option<&OverloadSet> {
        self.sets.get(name)
    }

    /// Registered names, unordered
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    /// Number of distinct names
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
