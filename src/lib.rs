//! # Singleton Index
//!
//! A process-wide, name-keyed registry that lets separately compiled and
//! separately loaded modules share exactly one instance of each "global"
//! object instead of every module building and destroying its own copy.
//!
//! ## Quick Start
//!
//! ```rust
//! use singleton_index::{get_or_create, shutdown};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Logger {
//!     lines: Mutex<Vec<String>>,
//! }
//!
//! let a: Arc<Logger> = get_or_create("app.logger").unwrap();
//! let b: Arc<Logger> = get_or_create("app.logger").unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//!
//! // At process or library teardown
//! shutdown();
//! ```
//!
//! ## Features
//!
//! - **One instance per name**: concurrent first calls construct exactly once
//! - **Type-checked retrieval**: reusing a name with another type is reported
//!   as [`RegistryError::TypeMismatch`]
//! - **Ordered teardown**: destructors run once, newest entry first
//! - **Shareable**: [`set_instance`] installs a host's registry in a plugin
//! - **Tracing support**: optional per-registry callback for registry operations
//!
//! ## Main Items
//!
//! - [`Registry`] - the store, with [`Registry::get_or_create`] as the lazy factory
//! - [`instance`] / [`set_instance`] / [`shutdown`] - the process-wide handle
//! - [`get_or_create`], [`get`], [`register`], [`lookup`] - free functions over [`instance`]

mod handle;
mod registry;
mod registry_entry;
mod registry_error;
mod registry_event;

pub use handle::{
    contains, get, get_or_create, get_or_create_with, get_or_create_with_destructor, instance,
    lookup, register, register_with_destructor, set_instance, shutdown, teardown,
};
pub use registry::{Registry, ReplacePolicy};
pub use registry_error::RegistryError;
pub use registry_event::{RegistryEvent, TraceCallback};
