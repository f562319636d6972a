//! Argument lists for type-erased invocation
//!
//! An [`ArgList`] is an ordered, move-only collection of arguments prepared for
//! one call. Each slot either borrows an existing object or owns a value that
//! was moved in. Merging consumes both operands, so a merged-away list cannot
//! be read again: the compiler rejects it.
//!
//! ```ignore
//! let list = args![1.0f32, 2.0f32] | ObjectRef::new(&z);
//! let merged = list.merge(args![4i32]);
//! ```

use std::any::Any;
use std::fmt;
use std::ops::BitOr;

use crate::object::ObjectRef;
use crate::type_desc::TypeDesc;

/// One argument slot
pub enum Arg<'a> {
    /// Borrowed from the caller
    Borrowed(ObjectRef<'a>),
    /// Moved into the list
    Owned {
        /// The value
        value: Box<dyn Any>,
        /// Its descriptor
        ty: TypeDesc,
    },
}

impl Arg<'_> {
    /// Descriptor of the argument
    pub fn type_desc(&self) -> TypeDesc {
        match self {
            Arg::Borrowed(handle) => handle.type_desc(),
            Arg::Owned { ty, .. } => *ty,
        }
    }

    /// Borrowed view of the argument
    pub fn handle(&self) -> ObjectRef<'_> {
        match self {
            Arg::Borrowed(handle) => *handle,
            Arg::Owned { value, ty } => ObjectRef::erased(&**value, *ty),
        }
    }
}

/// Ordered arguments for a single invocation
#[derive(Default)]
pub struct ArgList<'a> {
    args: Vec<Arg<'a>>,
}

impl<'a> ArgList<'a> {
    /// Create an empty list
    pub fn new() -> Self {
        Self { args: Vec::new() }
    }

    /// Build from borrowed handles
    pub fn from_handles(handles: Vec<ObjectRef<'a>>) -> Self {
        Self {
            args: handles.into_iter().map(Arg::Borrowed).collect(),
        }
    }

    /// Move a value into the next slot
    pub fn push_value<T: Any>(&mut self, value: T) {
        self.args.push(Arg::Owned {
            value: Box::new(value),
            ty: TypeDesc::of::<T>(),
        });
    }

    /// Borrow an object into the next slot
    pub fn push_ref(&mut self, handle: ObjectRef<'a>) {
        self.args.push(Arg::Borrowed(handle));
    }

    /// Builder form of [`push_value`](Self::push_value)
    pub fn with_value<T: Any>(mut self, value: T) -> Self {
        self.push_value(value);
        self
    }

    /// Builder form of [`push_ref`](Self::push_ref)
    pub fn with_ref(mut self, handle: ObjectRef<'a>) -> Self {
        self.push_ref(handle);
        self
    }

    /// Concatenate two lists, consuming both
    pub fn merge(mut self, other: ArgList<'a>) -> ArgList<'a> {
        self.args.extend(other.args);
        self
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Check if there are no arguments
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Per-slot descriptors, in order
    pub fn type_descs(&self) -> Vec<TypeDesc> {
        self.args.iter().map(Arg::type_desc).collect()
    }

    /// Borrowed views of every argument, valid while the list is borrowed
    pub fn to_object_wrappers(&self) -> Vec<ObjectRef<'_>> {
        self.args.iter().map(Arg::handle).collect()
    }

    /// Iterate over the slots
    pub fn iter(&self) -> std::slice::Iter<'_, Arg<'a>> {
        self.args.iter()
    }
}

impl<'a> From<Vec<ObjectRef<'a>>> for ArgList<'a> {
    fn from(handles: Vec<ObjectRef<'a>>) -> Self {
        ArgList::from_handles(handles)
    }
}

impl<'a> BitOr for ArgList<'a> {
    type Output = ArgList<'a>;

    fn bitor(self, rhs: ArgList<'a>) -> ArgList<'a> {
        self.merge(rhs)
    }
}

impl<'a> BitOr<ObjectRef<'a>> for ArgList<'a> {
    type Output = ArgList<'a>;

    fn bitor(self, rhs: ObjectRef<'a>) -> ArgList<'a> {
        self.with_ref(rhs)
    }
}

impl fmt::Debug for ArgList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.args.iter().map(|a| a.type_desc().name()))
            .finish()
    }
}

/// Build an [`ArgList`] that owns the given values
///
/// ```ignore
/// let list = args![1.0f32, 2.0f32, 3.0f32];
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::ArgList::new()
    };
    ($($value:expr),+ $(,)?) => {{
        let mut list = $crate::ArgList::new();
        $( list.push_value($value); )+
        list
    }};
}
