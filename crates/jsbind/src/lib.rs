//! # jsbind
//!
//! Host bindings for the Boa JavaScript engine's object model.
//!
//! `jsbind` wraps engine values, objects and arrays in handles that host code
//! can keep, share and drop freely, and lets host closures back JavaScript
//! properties and functions.
//!
//! ## Model
//!
//! - [`Runtime`]: owns one reentrant lock that serializes every engine call
//!   made through any of its contexts.
//! - [`Context`]: one engine context with its own global object. Factories
//!   for values, objects and arrays, and the entry points for running scripts.
//! - [`Value`]: any JavaScript value. Short-lived and tied to its thread.
//! - [`Object`] and [`Array`]: rooted handles. The engine keeps the object
//!   alive until the handle (and every clone of it) is dropped or disposed.
//!
//! ## Example
//!
//! ```
//! use jsbind::{Accessors, PropertyAttrs, Runtime};
//!
//! let rt = Runtime::new();
//! let cx = rt.new_context();
//!
//! let config = cx.new_object();
//! config
//!     .define_property(
//!         "version",
//!         &cx.undefined(),
//!         Accessors::new().getter(|o| Some(o.context().int(3))),
//!         PropertyAttrs::ENUMERATE,
//!     )
//!     .unwrap();
//! cx.global().set_object("config", &config).unwrap();
//!
//! cx.define_function("double", |cx, args| {
//!     let n = args.first()?.to_int()?;
//!     Some(cx.int(n * 2))
//! })
//! .unwrap();
//!
//! let v = cx.eval("double(config.version)").unwrap();
//! assert_eq!(v.to_int(), Some(6));
//! ```
//!
//! ## Threads
//!
//! [`Runtime`] is `Send + Sync`. The engine's garbage collector keeps
//! per-thread state, so [`Context`], [`Object`], [`Array`] and [`Value`] stay
//! on the thread that created the context. Several threads may share one
//! runtime, each with contexts of its own; every engine call takes the
//! runtime lock. Use [`Runtime::with_lock`] to make several calls atomic.

pub mod accessors;
pub mod array;
pub mod config;
pub mod error;
pub mod object;
pub mod runtime;
pub mod value;

pub use accessors::{Accessors, Getter, HostFunction, Setter};
pub use array::Array;
pub use config::RuntimeConfig;
pub use error::{JsbindError, Result};
pub use object::{Object, PropertyAttrs};
pub use runtime::context::ErrorReporter;
pub use runtime::{Context, Runtime};
pub use value::Value;
