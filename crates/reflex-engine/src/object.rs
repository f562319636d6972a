//! Object handles
//!
//! Three flavors of type-erased object:
//!
//! - [`ObjectRef`]: a borrowed, read-only view (`&dyn Any` + descriptor).
//!   `Copy`, and may carry the "none" sentinel.
//! - [`ObjectMut`]: a borrowed, exclusive view (`&mut dyn Any` + descriptor).
//! - [`SharedObject`]: an owned, reference-counted value. Views into it are
//!   obtained through [`SharedRef`] / [`SharedMut`] guards, so a view can
//!   never outlive the allocation it points into.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::error::{ReflectError, ReflectResult};
use crate::type_desc::TypeDesc;

// ============================================================================
// ObjectRef
// ============================================================================

/// Borrowed, read-only handle to a value of a runtime-known type
#[derive(Clone, Copy)]
pub struct ObjectRef<'a> {
    value: Option<&'a dyn Any>,
    ty: TypeDesc,
}

impl<'a> ObjectRef<'a> {
    /// Borrow a concrete value
    #[inline]
    pub fn new<T: Any>(value: &'a T) -> Self {
        Self {
            value: Some(value),
            ty: TypeDesc::of::<T>(),
        }
    }

    /// The "none" sentinel (void type, no referent)
    #[inline]
    pub fn none() -> Self {
        Self {
            value: None,
            ty: TypeDesc::void(),
        }
    }

    /// Wrap an already-erased value, checking it against `ty`
    pub fn from_dyn(value: &'a dyn Any, ty: TypeDesc) -> ReflectResult<Self> {
        if !ty.matches(value) {
            return Err(ReflectError::value_mismatch(ty, value));
        }
        Ok(Self {
            value: Some(value),
            ty,
        })
    }

    /// Pair an erased value with a descriptor the caller already verified
    #[inline]
    pub(crate) fn erased(value: &'a dyn Any, ty: TypeDesc) -> Self {
        debug_assert!(ty.matches(value));
        Self {
            value: Some(value),
            ty,
        }
    }

    /// Descriptor of the referenced value
    #[inline]
    pub fn type_desc(&self) -> TypeDesc {
        self.ty
    }

    /// Check if this is the none sentinel
    #[inline]
    pub fn is_none(&self) -> bool {
        self.value.is_none()
    }

    /// Erased referent, `None` for the sentinel
    #[inline]
    pub fn as_any(&self) -> Option<&'a dyn Any> {
        self.value
    }

    /// Strict downcast
    pub fn downcast<T: Any>(&self) -> ReflectResult<&'a T> {
        self.value
            .and_then(|v| v.downcast_ref::<T>())
            .ok_or_else(|| ReflectError::type_mismatch(TypeDesc::of::<T>(), self.ty))
    }

    /// Clone the referent out as `T`
    pub fn deref_into<T: Any + Clone>(&self) -> ReflectResult<T> {
        self.downcast::<T>().cloned()
    }
}

impl<'a, T: Any> From<&'a T> for ObjectRef<'a> {
    fn from(value: &'a T) -> Self {
        ObjectRef::new(value)
    }
}

impl fmt::Debug for ObjectRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "ObjectRef::None")
        } else {
            write!(f, "ObjectRef({})", self.ty.name())
        }
    }
}

// ============================================================================
// ObjectMut
// ============================================================================

/// Borrowed, exclusive handle to a value of a runtime-known type
pub struct ObjectMut<'a> {
    value: &'a mut dyn Any,
    ty: TypeDesc,
}

impl<'a> ObjectMut<'a> {
    /// Borrow a concrete value mutably
    #[inline]
    pub fn new<T: Any>(value: &'a mut T) -> Self {
        Self {
            value,
            ty: TypeDesc::of::<T>(),
        }
    }

    /// Wrap an already-erased value, checking it against `ty`
    pub fn from_dyn(value: &'a mut dyn Any, ty: TypeDesc) -> ReflectResult<Self> {
        if !ty.matches(value) {
            return Err(ReflectError::value_mismatch(ty, value));
        }
        Ok(Self { value, ty })
    }

    /// Descriptor of the referenced value
    #[inline]
    pub fn type_desc(&self) -> TypeDesc {
        self.ty
    }

    /// Shorter-lived exclusive view of the same value
    #[inline]
    pub fn reborrow(&mut self) -> ObjectMut<'_> {
        ObjectMut {
            value: &mut *self.value,
            ty: self.ty,
        }
    }

    /// Read-only view of the same value
    #[inline]
    pub fn view(&self) -> ObjectRef<'_> {
        ObjectRef {
            value: Some(&*self.value),
            ty: self.ty,
        }
    }

    /// Erased referent
    #[inline]
    pub fn as_any_mut(&mut self) -> &mut dyn Any {
        &mut *self.value
    }

    /// Give up the handle, keeping the erased borrow
    #[inline]
    pub fn into_any(self) -> &'a mut dyn Any {
        self.value
    }

    /// Strict mutable downcast
    pub fn downcast_mut<T: Any>(&mut self) -> ReflectResult<&mut T> {
        let ty = self.ty;
        self.value
            .downcast_mut::<T>()
            .ok_or_else(|| ReflectError::type_mismatch(TypeDesc::of::<T>(), ty))
    }

    /// Strict downcast that keeps the full borrow lifetime
    pub fn into_downcast<T: Any>(self) -> ReflectResult<&'a mut T> {
        let ty = self.ty;
        self.value
            .downcast_mut::<T>()
            .ok_or_else(|| ReflectError::type_mismatch(TypeDesc::of::<T>(), ty))
    }

    /// Overwrite the referent; `T` must be exactly the referenced type
    pub fn set_value<T: Any>(&mut self, value: T) -> ReflectResult<()> {
        *self.downcast_mut::<T>()? = value;
        Ok(())
    }
}

impl<'a, T: Any> From<&'a mut T> for ObjectMut<'a> {
    fn from(value: &'a mut T) -> Self {
        ObjectMut::new(value)
    }
}

impl fmt::Debug for ObjectMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectMut({})", self.ty.name())
    }
}

// ============================================================================
// SharedObject
// ============================================================================

/// Owned, reference-counted value of a runtime-known type
///
/// Cloning shares the allocation; it is released when the last clone drops.
/// Not `Send`: shared values stay on the thread that produced them.
#[derive(Clone)]
pub struct SharedObject {
    storage: Rc<RefCell<Box<dyn Any>>>,
    ty: TypeDesc,
}

impl SharedObject {
    /// Move a value into a fresh shared allocation
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            storage: Rc::new(RefCell::new(Box::new(value))),
            ty: TypeDesc::of::<T>(),
        }
    }

    /// Descriptor of the owned value
    #[inline]
    pub fn type_desc(&self) -> TypeDesc {
        self.ty
    }

    /// Number of live owners of the allocation
    #[inline]
    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.storage)
    }

    /// Check if two handles own the same allocation
    #[inline]
    pub fn ptr_eq(&self, other: &SharedObject) -> bool {
        Rc::ptr_eq(&self.storage, &other.storage)
    }

    /// Borrow the value for reading
    pub fn borrow(&self) -> ReflectResult<SharedRef<'_>> {
        let guard = self
            .storage
            .try_borrow()
            .map_err(|_| ReflectError::Borrowed(self.ty.name().to_string()))?;
        Ok(SharedRef {
            guard: Ref::map(guard, |b| &**b),
            ty: self.ty,
        })
    }

    /// Borrow the value for writing
    pub fn borrow_mut(&self) -> ReflectResult<SharedMut<'_>> {
        let guard = self
            .storage
            .try_borrow_mut()
            .map_err(|_| ReflectError::Borrowed(self.ty.name().to_string()))?;
        Ok(SharedMut {
            guard: RefMut::map(guard, |b| &mut **b),
            ty: self.ty,
        })
    }

    /// Clone the value out as `T`
    pub fn get<T: Any + Clone>(&self) -> ReflectResult<T> {
        self.borrow()?.handle().deref_into::<T>()
    }

    /// Move the value out; only possible for the last owner
    pub fn into_inner<T: Any>(self) -> ReflectResult<T> {
        if !self.ty.is::<T>() {
            return Err(ReflectError::type_mismatch(TypeDesc::of::<T>(), self.ty));
        }
        let ty = self.ty;
        let cell = Rc::try_unwrap(self.storage)
            .map_err(|_| ReflectError::Borrowed(ty.name().to_string()))?;
        cell.into_inner()
            .downcast::<T>()
            .map(|b| *b)
            .map_err(|_| ReflectError::type_mismatch(TypeDesc::of::<T>(), ty))
    }
}

impl fmt::Debug for SharedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedObject")
            .field("type", &self.ty.name())
            .field("owners", &self.strong_count())
            .finish()
    }
}

/// Read guard over a [`SharedObject`]
pub struct SharedRef<'a> {
    guard: Ref<'a, dyn Any>,
    ty: TypeDesc,
}

impl SharedRef<'_> {
    /// Borrowed view, valid while the guard is held
    #[inline]
    pub fn handle(&self) -> ObjectRef<'_> {
        ObjectRef {
            value: Some(&*self.guard),
            ty: self.ty,
        }
    }

    /// Strict downcast of the guarded value
    pub fn downcast<T: Any>(&self) -> ReflectResult<&T> {
        self.guard
            .downcast_ref::<T>()
            .ok_or_else(|| ReflectError::type_mismatch(TypeDesc::of::<T>(), self.ty))
    }
}

/// Write guard over a [`SharedObject`]
pub struct SharedMut<'a> {
    guard: RefMut<'a, dyn Any>,
    ty: TypeDesc,
}

impl SharedMut<'_> {
    /// Exclusive view, valid while the guard is held
    #[inline]
    pub fn handle(&mut self) -> ObjectMut<'_> {
        ObjectMut {
            value: &mut *self.guard,
            ty: self.ty,
        }
    }

    /// Read-only view of the guarded value
    #[inline]
    pub fn handle_ref(&self) -> ObjectRef<'_> {
        ObjectRef {
            value: Some(&*self.guard),
            ty: self.ty,
        }
    }
}
