//! Member table
//!
//! A member is a named field of a registered type. It is described by an
//! accessor pair rather than a raw address: the getter projects a borrowed
//! object onto the field, the optional mutable getter does the same for an
//! exclusive borrow. The byte offset is still recorded (from
//! `core::mem::offset_of!`) for callers that reason about layout.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::type_desc::TypeDesc;

/// Erased read accessor
pub type GetFn = Arc<dyn for<'x> Fn(&'x dyn Any) -> Option<&'x dyn Any> + Send + Sync>;

/// Erased write accessor
pub type GetMutFn =
    Arc<dyn for<'x> Fn(&'x mut dyn Any) -> Option<&'x mut dyn Any> + Send + Sync>;

/// Erased assignment `target = value.clone()`; false when either side has the wrong type
pub type AssignFn = Arc<dyn Fn(&mut dyn Any, &dyn Any) -> bool + Send + Sync>;

// ============================================================================
// Field descriptors
// ============================================================================

/// Typed description of a field `M` inside `T`
///
/// Usually built with [`field!`](crate::field) or
/// [`const_field!`](crate::const_field).
pub struct Field<T, M> {
    get: fn(&T) -> &M,
    get_mut: Option<fn(&mut T) -> &mut M>,
    offset: usize,
}

impl<T: Any, M: Any> Field<T, M> {
    /// Writable field
    pub fn new(get: fn(&T) -> &M, get_mut: fn(&mut T) -> &mut M, offset: usize) -> Self {
        Self {
            get,
            get_mut: Some(get_mut),
            offset,
        }
    }

    /// Const field: readable, never writable through reflection
    pub fn read_only(get: fn(&T) -> &M, offset: usize) -> Self {
        Self {
            get,
            get_mut: None,
            offset,
        }
    }

    /// Byte offset of the field within `T`
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Check if the field was declared const
    pub fn is_const(&self) -> bool {
        self.get_mut.is_none()
    }
}

/// Describe a writable field: `field!(Vector3, x)`
#[macro_export]
macro_rules! field {
    ($ty:ty, $field:ident) => {
        $crate::Field::<$ty, _>::new(
            |o| &o.$field,
            |o| &mut o.$field,
            ::core::mem::offset_of!($ty, $field),
        )
    };
}

/// Describe a const field: `const_field!(Vector3, id)`
#[macro_export]
macro_rules! const_field {
    ($ty:ty, $field:ident) => {
        $crate::Field::<$ty, _>::read_only(|o| &o.$field, ::core::mem::offset_of!($ty, $field))
    };
}

// ============================================================================
// Member
// ============================================================================

pub(crate) fn erase_get<F>(get: F) -> GetFn
where
    F: for<'x> Fn(&'x dyn Any) -> Option<&'x dyn Any> + Send + Sync + 'static,
{
    Arc::new(get)
}

pub(crate) fn erase_get_mut<F>(get_mut: F) -> GetMutFn
where
    F: for<'x> Fn(&'x mut dyn Any) -> Option<&'x mut dyn Any> + Send + Sync + 'static,
{
    Arc::new(get_mut)
}

fn clone_assign<M: Any + Clone>() -> AssignFn {
    Arc::new(|target: &mut dyn Any, value: &dyn Any| {
        match (target.downcast_mut::<M>(), value.downcast_ref::<M>()) {
            (Some(target), Some(value)) => {
                target.clone_from(value);
                true
            }
            _ => false,
        }
    })
}

/// A registered field
#[derive(Clone)]
pub struct Member {
    name: String,
    type_desc: TypeDesc,
    offset: usize,
    size: usize,
    get: GetFn,
    get_mut: Option<GetMutFn>,
    assign: Option<AssignFn>,
}

impl Member {
    /// Member whose type can be assigned by cloning
    pub(crate) fn from_field<T: Any, M: Any + Clone>(name: &str, field: Field<T, M>) -> Self {
        let mut member = Self::opaque(name, field);
        member.assign = Some(clone_assign::<M>());
        member
    }

    /// Member without an assignment strategy
    pub(crate) fn opaque<T: Any, M: Any>(name: &str, field: Field<T, M>) -> Self {
        let Field {
            get,
            get_mut,
            offset,
        } = field;
        Self {
            name: name.to_string(),
            type_desc: TypeDesc::of::<M>(),
            offset,
            size: std::mem::size_of::<M>(),
            get: erase_get(move |object| {
                object
                    .downcast_ref::<T>()
                    .map(|o| get(o) as &dyn Any)
            }),
            get_mut: get_mut.map(|get_mut| {
                erase_get_mut(move |object| {
                    object
                        .downcast_mut::<T>()
                        .map(|o| get_mut(o) as &mut dyn Any)
                })
            }),
            assign: None,
        }
    }

    /// Member name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Descriptor of the field type
    pub fn type_desc(&self) -> TypeDesc {
        self.type_desc
    }

    /// Byte offset within the owning type
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Size of the field in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Check if the member was declared const
    pub fn is_const(&self) -> bool {
        self.get_mut.is_none()
    }

    /// Check if the member has an assignment strategy
    pub fn is_assignable(&self) -> bool {
        self.assign.is_some() && !self.is_const()
    }

    /// Project an owner onto this field; `None` if `owner` has the wrong type
    pub fn get<'x>(&self, owner: &'x dyn Any) -> Option<&'x dyn Any> {
        (self.get)(owner)
    }

    /// Exclusive projection; `None` for const members or the wrong owner type
    pub fn get_mut<'x>(&self, owner: &'x mut dyn Any) -> Option<&'x mut dyn Any> {
        self.get_mut.as_ref().and_then(|get_mut| get_mut(owner))
    }

    /// Clone `value` into the field slot `target`
    pub(crate) fn assign(&self, target: &mut dyn Any, value: &dyn Any) -> Option<bool> {
        self.assign.as_ref().map(|assign| assign(target, value))
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("type", &self.type_desc)
            .field("offset", &self.offset)
            .field("size", &self.size)
            .field("is_const", &self.is_const())
            .finish()
    }
}

/// Name to member map of one type (ancestors excluded)
#[derive(Clone, Default, Debug)]
pub struct MemberTable {
    members: FxHashMap<String, Member>,
}

impl MemberTable {
    /// Insert, returning the member it replaced
    pub(crate) fn insert(&mut self, member: Member) -> Option<Member> {
        self.members.insert(member.name.clone(), member)
    }

    /// Member by name
    pub fn get(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    /// Members, unordered
    pub fn iter(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
