//! Reflex Engine
//!
//! Runtime reflection for Rust types: register a type once, then discover and
//! manipulate its fields and invoke its methods by name through type-erased
//! handles.
//!
//! This crate provides:
//! - A registry of type records, injectable or process-wide
//! - Member access by name, typed or erased, with inheritance fallback
//! - Overloaded method and function dispatch through argument lists
//! - Reference-counted return values and a lifetime-extension helper
//! - Per-type and per-member metadata for serializers
//!
//! # Usage
//!
//! ```ignore
//! use reflex_engine::{args, field, ObjectMut, Registry};
//!
//! let mut registry = Registry::new();
//! let record = registry
//!     .register::<Vector3>("Vector3")
//!     .member("x", field!(Vector3, x))
//!     .constructor(|x: f32, y: f32, z: f32| Vector3 { x, y, z })
//!     .method("fetch_add", Vector3::fetch_add)
//!     .publish()?;
//!
//! let mut v: Vector3 = record.construct(&args![1.0f32, 2.0f32, 3.0f32])?;
//! let ret = record.invoke_method(ObjectMut::new(&mut v), "fetch_add", &args![1.0f32, 2.0f32, 3.0f32])?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod args;
pub mod callable;
pub mod config;
pub mod convert;
pub mod error;
pub mod member;
pub mod metadata;
pub mod object;
pub mod record;
pub mod registry;
pub mod type_desc;
pub mod value;

pub use args::{Arg, ArgList};
pub use callable::{CallableWrapper, OverloadSet, Receiver};
pub use config::{OverloadPolicy, RegistryConfig};
pub use convert::ArgTuple;
pub use error::{ReflectError, ReflectResult};
pub use member::{Field, Member};
pub use metadata::{MetadataValue, SequenceAdapter, JSON_OBJECT_TYPE, SEQUENCE_ADAPTER};
pub use object::{ObjectMut, ObjectRef, SharedMut, SharedObject, SharedRef};
pub use record::{TypeBuilder, TypeRecord, CTOR};
pub use registry::{lookup_global, lookup_global_by_name, register_global, Registry};
pub use type_desc::TypeDesc;
pub use value::{KeepAlive, ReturnValue, SharedStorage};
