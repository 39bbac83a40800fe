//! Type-erased storage for a single registered global.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::RegistryError;

/// Zero-argument release hook run when the registry gives up an entry.
pub(crate) type Destructor = Box<dyn FnOnce() + Send + 'static>;

/// One registered global: the owning handle, its type tag and its release hook.
///
/// The registry's reference to the object is dropped together with the entry,
/// and the destructor runs exactly once, from `Drop`. Callers that still hold
/// an `Arc<T>` keep the object itself alive past that point.
pub(crate) struct RegistryEntry {
    object: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    seq: u64,
    destructor: Option<Destructor>,
}

impl RegistryEntry {
    pub(crate) fn new<T: Send + Sync + 'static>(
        object: Arc<T>,
        destructor: Option<Destructor>,
        seq: u64,
    ) -> Self {
        Self {
            object,
            type_name: std::any::type_name::<T>(),
            seq,
            destructor,
        }
    }

    /// The stored object, without type information.
    pub(crate) fn object(&self) -> Arc<dyn Any + Send + Sync> {
        Arc::clone(&self.object)
    }

    /// `std::any::type_name` of the stored object.
    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Registration order; later entries are released first.
    pub(crate) fn seq(&self) -> u64 {
        self.seq
    }

    /// Recovers the stored object as `T`, reporting `name` on mismatch.
    pub(crate) fn downcast<T: Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Arc<T>, RegistryError> {
        self.object()
            .downcast::<T>()
            .map_err(|_| RegistryError::TypeMismatch {
                name: name.to_string(),
                stored: self.type_name,
                requested: std::any::type_name::<T>(),
            })
    }
}

impl Drop for RegistryEntry {
    fn drop(&mut self) {
        if let Some(destructor) = self.destructor.take() {
            destructor();
        }
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("type_name", &self.type_name)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}
