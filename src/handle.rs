//! The swappable process-wide registry and free functions over it.
//!
//! Every compiled module (binary, `cdylib` plugin) gets its own copy of this
//! static. To make modules observe one store, the host passes its registry
//! (from [`instance`]) to each module, which installs it with
//! [`set_instance`] while it is being loaded and before it touches any global.
//!
//! # Examples
//!
//! ```
//! use singleton_index::{get_or_create, instance, set_instance};
//! use std::sync::Arc;
//!
//! // Host side
//! let host = instance();
//!
//! // Module side, during load
//! set_instance(Arc::clone(&host));
//! let counter: Arc<std::sync::atomic::AtomicU32> = get_or_create("doc.counter").unwrap();
//! # let _ = counter;
//! ```

use std::any::Any;
use std::sync::{Arc, RwLock};

use crate::{Registry, RegistryError};

/// The current process-wide registry, created on first use.
static INSTANCE: RwLock<Option<Arc<Registry>>> = RwLock::new(None);

/// Returns the process-wide registry, creating an empty one on first call.
pub fn instance() -> Arc<Registry> {
    {
        let guard = INSTANCE.read().unwrap_or_else(|p| p.into_inner());
        if let Some(registry) = guard.as_ref() {
            return Arc::clone(registry);
        }
    }

    let mut guard = INSTANCE.write().unwrap_or_else(|p| p.into_inner());
    Arc::clone(guard.get_or_insert_with(|| {
        log::debug!("creating process-wide registry");
        Arc::new(Registry::new())
    }))
}

/// Replaces the process-wide registry and returns the previous one.
///
/// The previous registry is not torn down here: it is released when its last
/// `Arc` is dropped, which may be the one returned from this call. Callers that
/// already obtained the previous registry keep using it, so install the shared
/// registry at module-load time, before any global is requested.
pub fn set_instance(registry: Arc<Registry>) -> Option<Arc<Registry>> {
    log::debug!("installing process-wide registry");
    INSTANCE
        .write()
        .unwrap_or_else(|p| p.into_inner())
        .replace(registry)
}

/// Detaches the process-wide registry and tears it down.
///
/// Returns the number of entries released, or 0 if no registry was created.
/// The next call to [`instance`] starts a fresh, empty registry.
pub fn shutdown() -> usize {
    let registry = INSTANCE.write().unwrap_or_else(|p| p.into_inner()).take();
    match registry {
        Some(registry) => registry.teardown(),
        None => 0,
    }
}

// -------------------------------------------------------------------------------------------------
// Free functions over the process-wide registry
// -------------------------------------------------------------------------------------------------

/// [`Registry::lookup`] on the process-wide registry.
pub fn lookup(name: &str) -> Option<Arc<dyn Any + Send + Sync>> {
    instance().lookup(name)
}

/// [`Registry::contains`] on the process-wide registry.
pub fn contains(name: &str) -> bool {
    instance().contains(name)
}

/// [`Registry::register`] on the process-wide registry.
pub fn register<T: Send + Sync + 'static>(name: &str, object: Arc<T>) -> Result<(), RegistryError> {
    instance().register(name, object)
}

/// [`Registry::register_with_destructor`] on the process-wide registry.
pub fn register_with_destructor<T: Send + Sync + 'static>(
    name: &str,
    object: Arc<T>,
    destructor: impl FnOnce() + Send + 'static,
) -> Result<(), RegistryError> {
    instance().register_with_destructor(name, object, destructor)
}

/// [`Registry::get`] on the process-wide registry.
pub fn get<T: Send + Sync + 'static>(name: &str) -> Result<Arc<T>, RegistryError> {
    instance().get(name)
}

/// [`Registry::get_or_create`] on the process-wide registry.
pub fn get_or_create<T: Default + Send + Sync + 'static>(
    name: &str,
) -> Result<Arc<T>, RegistryError> {
    instance().get_or_create(name)
}

/// [`Registry::get_or_create_with`] on the process-wide registry.
pub fn get_or_create_with<T, F>(name: &str, init: F) -> Result<Arc<T>, RegistryError>
where
    T: Send + Sync + 'static,
    F: FnOnce() -> T,
{
    instance().get_or_create_with(name, init)
}

/// [`Registry::get_or_create_with_destructor`] on the process-wide registry.
pub fn get_or_create_with_destructor<T, F>(
    name: &str,
    init: F,
    destructor: impl FnOnce() + Send + 'static,
) -> Result<Arc<T>, RegistryError>
where
    T: Send + Sync + 'static,
    F: FnOnce() -> T,
{
    instance().get_or_create_with_destructor(name, init, destructor)
}

/// [`Registry::teardown`] on the process-wide registry, which stays installed.
pub fn teardown() -> usize {
    instance().teardown()
}
