//! Return values and lifetime extension
//!
//! Every call through the engine produces a [`ReturnValue`]: the result moved
//! into a shared allocation, tagged with its descriptor and size. Duplicating
//! a return value shares the allocation, and borrowed views are only handed
//! out through guards tied to a live owner.
//!
//! [`KeepAlive`] holds extra owners for callers that want to rebind a
//! return-value variable while something else still depends on the old value
//! (for example, a [`SharedObject`] handed to another subsystem).

use std::any::Any;
use std::fmt;
use std::ops::ShlAssign;

use crate::error::ReflectResult;
use crate::object::{SharedMut, SharedObject, SharedRef};
use crate::type_desc::TypeDesc;

/// Owning, reference-counted result of an invocation
#[derive(Clone)]
pub struct ReturnValue {
    storage: SharedObject,
    size: usize,
}

impl ReturnValue {
    /// Wrap a freshly produced value
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            storage: SharedObject::new(value),
            size: std::mem::size_of::<T>(),
        }
    }

    /// Zero-sized placeholder for calls returning `()`
    pub fn void() -> Self {
        Self::new(())
    }

    /// Descriptor of the held value
    #[inline]
    pub fn type_desc(&self) -> TypeDesc {
        self.storage.type_desc()
    }

    /// Size of the held value in bytes
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Check if this is the void placeholder
    #[inline]
    pub fn is_void(&self) -> bool {
        self.storage.type_desc().is_void()
    }

    /// Share the same allocation
    #[inline]
    pub fn duplicate(&self) -> ReturnValue {
        self.clone()
    }

    /// Read guard; its `handle()` is the borrowed view of the value
    pub fn to_wrapped(&self) -> ReflectResult<SharedRef<'_>> {
        self.storage.borrow()
    }

    /// Write guard; its `handle()` is the exclusive view of the value
    pub fn to_wrapped_mut(&self) -> ReflectResult<SharedMut<'_>> {
        self.storage.borrow_mut()
    }

    /// Clone the value out; fails with `TypeMismatch` on the wrong type
    pub fn get<T: Any + Clone>(&self) -> ReflectResult<T> {
        self.storage.get::<T>()
    }

    /// Move the value out; requires this to be the last owner
    pub fn into_inner<T: Any>(self) -> ReflectResult<T> {
        self.storage.into_inner::<T>()
    }

    /// Shared handle to the underlying allocation
    #[inline]
    pub fn shared(&self) -> &SharedObject {
        &self.storage
    }

    /// Convert into the underlying shared handle
    #[inline]
    pub fn into_shared(self) -> SharedObject {
        self.storage
    }
}

impl fmt::Debug for ReturnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReturnValue")
            .field("type", &self.type_desc().name())
            .field("size", &self.size)
            .finish()
    }
}

// ============================================================================
// Lifetime extension
// ============================================================================

/// Anything that can hand out an owner of its shared allocation
pub trait SharedStorage {
    /// A new owner of the same allocation
    fn shared_storage(&self) -> SharedObject;
}

impl SharedStorage for SharedObject {
    fn shared_storage(&self) -> SharedObject {
        self.clone()
    }
}

impl SharedStorage for ReturnValue {
    fn shared_storage(&self) -> SharedObject {
        self.storage.clone()
    }
}

/// Push-only stack of owners that keeps allocations alive until `clear`
#[derive(Default)]
pub struct KeepAlive {
    held: Vec<SharedObject>,
}

impl KeepAlive {
    /// Create an empty helper
    pub fn new() -> Self {
        Self::default()
    }

    /// Retain an owner
    pub fn push(&mut self, shared: SharedObject) {
        self.held.push(shared);
    }

    /// Retain an owner pulled from any provider
    pub fn push_from(&mut self, provider: &impl SharedStorage) {
        self.held.push(provider.shared_storage());
    }

    /// Release every retained owner
    pub fn clear(&mut self) {
        self.held.clear();
    }

    /// Number of retained owners
    pub fn len(&self) -> usize {
        self.held.len()
    }

    /// Check if nothing is retained
    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

impl ShlAssign<&ReturnValue> for KeepAlive {
    fn shl_assign(&mut self, rhs: &ReturnValue) {
        self.push_from(rhs);
    }
}

impl fmt::Debug for KeepAlive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeepAlive")
            .field("held", &self.held.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReflectError;

    #[test]
    fn test_void_placeholder() {
        let ret = ReturnValue::void();
        assert!(ret.is_void());
        assert_eq!(ret.size(), 0);
        assert_eq!(ret.type_desc(), TypeDesc::void());
    }

    #[test]
    fn test_value_size_and_type() {
        let ret = ReturnValue::new((1.0f32, 2.0f32));
        assert!(!ret.is_void());
        assert_eq!(ret.size(), 8);
        assert_eq!(ret.type_desc(), TypeDesc::of::<(f32, f32)>());
        assert_eq!(ret.get::<(f32, f32)>().unwrap(), (1.0, 2.0));
    }

    #[test]
    fn test_strict_get() {
        let ret = ReturnValue::new(5i32);
        assert!(matches!(
            ret.get::<f32>(),
            Err(ReflectError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_duplicate_survives_rebinding() {
        let mut ret = ReturnValue::new(String::from("first"));
        let kept = ret.duplicate();
        ret = ReturnValue::new(String::from("second"));

        assert_eq!(kept.get::<String>().unwrap(), "first");
        assert_eq!(ret.get::<String>().unwrap(), "second");
    }

    #[test]
    fn test_keep_alive() {
        let mut keep = KeepAlive::new();
        let mut ret = ReturnValue::new(42u64);
        let shared = ret.shared().clone();

        keep <<= &ret;
        ret = ReturnValue::void();
        assert!(ret.is_void());
        assert_eq!(keep.len(), 1);
        assert_eq!(shared.strong_count(), 2);

        keep.clear();
        assert!(keep.is_empty());
        assert_eq!(shared.strong_count(), 1);
        assert_eq!(shared.get::<u64>().unwrap(), 42);
    }

    #[test]
    fn test_wrapped_views() {
        let ret = ReturnValue::new(vec![1u8, 2, 3]);
        {
            let mut guard = ret.to_wrapped_mut().unwrap();
            guard.handle().downcast_mut::<Vec<u8>>().unwrap().push(4);
        }
        let guard = ret.to_wrapped().unwrap();
        assert_eq!(guard.handle().downcast::<Vec<u8>>().unwrap().len(), 4);
    }

    #[test]
    fn test_into_inner_last_owner() {
        let ret = ReturnValue::new(String::from("owned"));
        let dup = ret.duplicate();
        assert!(ret.into_inner::<String>().is_err());
        assert_eq!(dup.into_inner::<String>().unwrap(), "owned");
    }
}
