//! Type descriptors
//!
//! A `TypeDesc` is the runtime identity of a Rust type: its `TypeId` plus the
//! compiler-provided type name for diagnostics. Equality and hashing only
//! consider the `TypeId`, so two descriptors of the same type always compare
//! equal regardless of where they were created.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Opaque, comparable identity of a type
#[derive(Clone, Copy)]
pub struct TypeDesc {
    id: TypeId,
    name: &'static str,
}

impl TypeDesc {
    /// Descriptor of `T`
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Descriptor of the unit type, used for void results and the none handle
    #[inline]
    pub fn void() -> Self {
        Self::of::<()>()
    }

    /// Underlying type identity
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Human-readable type name
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Check if this is the void descriptor
    #[inline]
    pub fn is_void(&self) -> bool {
        self.id == TypeId::of::<()>()
    }

    /// Check if this describes `T`
    #[inline]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Check if a type-erased value has this type
    #[inline]
    pub fn matches(&self, value: &dyn Any) -> bool {
        value.type_id() == self.id
    }
}

impl PartialEq for TypeDesc {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDesc {}

impl Hash for TypeDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeDesc({})", self.name)
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Join descriptor names for diagnostics, e.g. `f32, i32`
pub(crate) fn signature_string(types: &[TypeDesc]) -> String {
    types
        .iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_identity() {
        assert_eq!(TypeDesc::of::<f32>(), TypeDesc::of::<f32>());
        assert_ne!(TypeDesc::of::<f32>(), TypeDesc::of::<f64>());
        assert!(TypeDesc::of::<i32>().is::<i32>());
        assert!(!TypeDesc::of::<i32>().is::<u32>());
    }

    #[test]
    fn test_void() {
        assert!(TypeDesc::void().is_void());
        assert!(!TypeDesc::of::<u8>().is_void());
        assert_eq!(TypeDesc::void().name(), "()");
    }

    #[test]
    fn test_matches_erased_value() {
        let value: Box<dyn Any> = Box::new(3.5f64);
        assert!(TypeDesc::of::<f64>().matches(value.as_ref()));
        assert!(!TypeDesc::of::<f32>().matches(value.as_ref()));
    }

    #[test]
    fn test_hash_set_key() {
        let mut set = FxHashSet::default();
        set.insert(TypeDesc::of::<String>());
        set.insert(TypeDesc::of::<String>());
        set.insert(TypeDesc::of::<i64>());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_signature_string() {
        let sig = [TypeDesc::of::<f32>(), TypeDesc::of::<i32>()];
        assert_eq!(signature_string(&sig), "f32, i32");
        assert_eq!(signature_string(&[]), "");
    }
}
