//! Reflex JSON
//!
//! Maps objects of types registered with `reflex-engine` to and from
//! `serde_json` values, driven entirely by the registry's member tables,
//! constructors and shape metadata.
//!
//! # Usage
//!
//! ```ignore
//! use reflex_engine::{field, ObjectRef, Registry};
//!
//! let mut registry = Registry::new();
//! registry
//!     .register::<Point>("Point")
//!     .member("x", field!(Point, x))
//!     .member("y", field!(Point, y))
//!     .constructor(Point::default)
//!     .publish()?;
//!
//! let text = reflex_json::to_string(&registry, ObjectRef::new(&point))?;
//! let back: Point = reflex_json::from_json_as(&registry, &serde_json::from_str(&text)?)?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod mapper;

pub use error::{JsonMapError, JsonMapResult};
pub use mapper::{
    from_json, from_json_as, from_str, to_json, to_string, to_string_pretty, ARRAY, OBJECT,
};
