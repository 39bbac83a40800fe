//! Name-keyed store of type-erased globals with deferred, ordered release.
//!
//! A [`Registry`] maps string names to [`RegistryEntry`] values. Each name can
//! hold at most one object; the lazy factory ([`Registry::get_or_create`])
//! guarantees that concurrent first calls for the same name construct exactly
//! one instance.
//!
//! # Examples
//!
//! ```
//! use singleton_index::Registry;
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Config {
//!     verbose: bool,
//! }
//!
//! let registry = Registry::new();
//! let a: Arc<Config> = registry.get_or_create("app.config").unwrap();
//! let b: Arc<Config> = registry.get_or_create("app.config").unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//! assert!(!a.verbose);
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::registry_entry::{Destructor, RegistryEntry};
use crate::registry_event::TraceCallback;
use crate::{RegistryError, RegistryEvent};

/// What [`Registry::register`] does when the name is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplacePolicy {
    /// Release the previous entry (running its destructor), then store the new one.
    #[default]
    ReleasePrevious,
    /// Refuse with [`RegistryError::AlreadyRegistered`] and keep the previous entry.
    Reject,
    /// Store the new entry and leak the previous one without running its destructor.
    LeakPrevious,
}

/// Per-name cell.
///
/// Lock order: map, then `building`, then `state`. `state` is only held for
/// short reads and writes; `building` is held across construction and
/// replacement so writers of one name are serialized.
#[derive(Default)]
struct Slot {
    building: Mutex<()>,
    state: Mutex<SlotState>,
}

#[derive(Default)]
struct SlotState {
    entry: Option<RegistryEntry>,
    // Set once teardown has detached the slot; waiters must look the name up again.
    retired: bool,
}

impl Slot {
    fn lock_building(&self) -> MutexGuard<'_, ()> {
        self.building.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_state(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn is_filled(&self) -> bool {
        self.lock_state().entry.is_some()
    }

    fn is_retired(&self) -> bool {
        self.lock_state().retired
    }

    fn with_entry<R>(&self, f: impl FnOnce(&RegistryEntry) -> R) -> Option<R> {
        self.lock_state().entry.as_ref().map(f)
    }
}

/// Process-wide store of named globals.
///
/// All methods take `&self` and are internally synchronized. Destructors and
/// trace callbacks never run while a registry lock is held, so both may call
/// back into the registry. The one exception is the name whose constructor is
/// running: registering, tearing down or re-creating that same name from
/// inside its own constructor deadlocks.
pub struct Registry {
    slots: Mutex<HashMap<String, Arc<Slot>>>,
    next_seq: AtomicU64,
    policy: ReplacePolicy,
    trace: Mutex<Option<Arc<TraceCallback>>>,
}

impl Registry {
    /// Empty registry with [`ReplacePolicy::ReleasePrevious`].
    pub fn new() -> Self {
        Self::with_policy(ReplacePolicy::default())
    }

    /// Empty registry with the given re-registration policy.
    pub fn with_policy(policy: ReplacePolicy) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            policy,
            trace: Mutex::new(None),
        }
    }

    /// The re-registration policy this registry was built with.
    pub fn policy(&self) -> ReplacePolicy {
        self.policy
    }

    // -------------------------------------------------------------------------------------------------
    // Tracing
    // -------------------------------------------------------------------------------------------------

    /// Set a tracing callback for operations on this registry.
    ///
    /// The callback runs after the operation completed, without any registry
    /// lock held.
    pub fn set_trace_callback(&self, callback: impl Fn(&RegistryEvent) + Send + Sync + 'static) {
        let mut guard = self.trace.lock().unwrap_or_else(|p| p.into_inner());
        *guard = Some(Arc::new(callback));
    }

    /// Clear the tracing callback.
    pub fn clear_trace_callback(&self) {
        let mut guard = self.trace.lock().unwrap_or_else(|p| p.into_inner());
        *guard = None;
    }

    fn emit_event(&self, event: RegistryEvent) {
        let callback = self
            .trace
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone();
        if let Some(callback) = callback {
            callback(&event);
        }
    }

    // -------------------------------------------------------------------------------------------------
    // Raw store
    // -------------------------------------------------------------------------------------------------

    // The map is never left half-updated, so a poisoned lock is safe to reuse.
    fn lock_slots(&self) -> MutexGuard<'_, HashMap<String, Arc<Slot>>> {
        self.slots.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Slot for `name`, inserting an empty one if the name is unknown.
    fn slot_for(&self, name: &str) -> Arc<Slot> {
        let mut slots = self.lock_slots();
        match slots.get(name) {
            Some(slot) => Arc::clone(slot),
            None => {
                let slot = Arc::new(Slot::default());
                slots.insert(name.to_string(), Arc::clone(&slot));
                slot
            }
        }
    }

    /// Applies `f` to the entry stored under `name`, emitting a lookup event.
    fn find<R>(&self, name: &str, f: impl FnOnce(&RegistryEntry) -> R) -> Option<R> {
        let slot = self.lock_slots().get(name).cloned();
        let result = slot.and_then(|slot| slot.with_entry(f));
        let found = result.is_some();

        log::trace!("lookup {name}: found={found}");
        self.emit_event(RegistryEvent::Lookup {
            name: name.to_string(),
            found,
        });

        result
    }

    /// Returns the object stored under `name`, or `None`.
    ///
    /// An object whose lazy construction is still running is reported as absent.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.find(name, RegistryEntry::object)
    }

    /// Whether an object is stored under `name`. Does not emit events.
    pub fn contains(&self, name: &str) -> bool {
        self.lock_slots().get(name).is_some_and(|slot| slot.is_filled())
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.lock_slots()
            .values()
            .filter(|slot| slot.is_filled())
            .count()
    }

    /// Whether no object is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of all stored objects, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .lock_slots()
            .iter()
            .filter(|(_, slot)| slot.is_filled())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Stores `object` under `name`; the registry takes its reference.
    ///
    /// An existing entry is handled according to the registry's [`ReplacePolicy`].
    /// If the name is being lazily constructed, this waits for the
    /// construction to finish and then treats its result as the existing entry.
    pub fn register<T: Send + Sync + 'static>(
        &self,
        name: &str,
        object: Arc<T>,
    ) -> Result<(), RegistryError> {
        self.register_entry(name, object, None)
    }

    /// Like [`register`](Self::register), with a hook that runs exactly once
    /// when the registry releases the entry.
    ///
    /// If the registration is rejected the hook is dropped without running.
    pub fn register_with_destructor<T: Send + Sync + 'static>(
        &self,
        name: &str,
        object: Arc<T>,
        destructor: impl FnOnce() + Send + 'static,
    ) -> Result<(), RegistryError> {
        self.register_entry(name, object, Some(Box::new(destructor)))
    }

    fn register_entry<T: Send + Sync + 'static>(
        &self,
        name: &str,
        object: Arc<T>,
        destructor: Option<Destructor>,
    ) -> Result<(), RegistryError> {
        let type_name = std::any::type_name::<T>();

        let mut slot = self.slot_for(name);
        loop {
            let building = slot.lock_building();
            if slot.is_retired() {
                drop(building);
                slot = self.slot_for(name);
                continue;
            }

            let previous = {
                let mut state = slot.lock_state();
                if state.entry.is_some() && self.policy == ReplacePolicy::Reject {
                    log::debug!("rejecting re-registration of {name} as {type_name}");
                    return Err(RegistryError::AlreadyRegistered {
                        name: name.to_string(),
                    });
                }

                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                state
                    .entry
                    .replace(RegistryEntry::new(object, destructor, seq))
            };
            drop(building);

            let replaced = previous.is_some();
            match (previous, self.policy) {
                (Some(previous), ReplacePolicy::LeakPrevious) => {
                    log::debug!("registered {name} as {type_name}, leaking previous entry");
                    std::mem::forget(previous);
                }
                (previous, _) => {
                    log::debug!("registered {name} as {type_name} (replaced={replaced})");
                    drop(previous);
                }
            }

            self.emit_event(RegistryEvent::Register {
                name: name.to_string(),
                type_name,
                replaced,
            });

            return Ok(());
        }
    }

    /// Releases every entry and returns how many were released.
    ///
    /// Entries are detached first, waiting for any lazy construction in
    /// progress so its result is released too. They are then released in
    /// reverse registration order on the calling thread, with no lock held,
    /// before this returns. Destructors may use the registry; anything they
    /// register survives this teardown.
    pub fn teardown(&self) -> usize {
        let slots = std::mem::take(&mut *self.lock_slots());

        let mut entries: Vec<(String, RegistryEntry)> = Vec::with_capacity(slots.len());
        for (name, slot) in slots {
            let _building = slot.lock_building();
            let mut state = slot.lock_state();
            state.retired = true;
            if let Some(entry) = state.entry.take() {
                entries.push((name, entry));
            }
        }
        entries.sort_unstable_by(|a, b| b.1.seq().cmp(&a.1.seq()));

        let released = entries.len();
        for (name, entry) in entries {
            log::trace!("releasing {name}");
            drop(entry);
        }

        log::debug!("registry teardown released {released} entries");
        self.emit_event(RegistryEvent::Teardown { released });

        released
    }

    // -------------------------------------------------------------------------------------------------
    // Typed accessors
    // -------------------------------------------------------------------------------------------------

    /// Retrieves the object stored under `name` as `T`.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotFound`] if nothing is stored under `name`
    /// - [`RegistryError::TypeMismatch`] if the stored object is not a `T`
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, RegistryError> {
        self.find(name, |entry| entry.downcast(name))
            .unwrap_or_else(|| {
                Err(RegistryError::NotFound {
                    name: name.to_string(),
                })
            })
    }

    /// Returns the `T` stored under `name`, creating it with `T::default()` on
    /// first use.
    ///
    /// # Errors
    ///
    /// [`RegistryError::TypeMismatch`] if `name` already holds another type.
    pub fn get_or_create<T: Default + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Arc<T>, RegistryError> {
        self.get_or_create_with(name, T::default)
    }

    /// Like [`get_or_create`](Self::get_or_create), keyed by `T`'s type name.
    pub fn get_or_create_for_type<T: Default + Send + Sync + 'static>(
        &self,
    ) -> Result<Arc<T>, RegistryError> {
        self.get_or_create(std::any::type_name::<T>())
    }

    /// Returns the `T` stored under `name`, creating it with `init` on first use.
    ///
    /// `init` runs at most once per name, outside the map lock, so it may use
    /// the registry for other names. Concurrent callers for the same name wait
    /// for it. If `init` panics, nothing is stored and the next call retries.
    /// Calling back into this method for the same name from `init` deadlocks.
    ///
    /// # Errors
    ///
    /// [`RegistryError::TypeMismatch`] if `name` already holds another type.
    pub fn get_or_create_with<T, F>(&self, name: &str, init: F) -> Result<Arc<T>, RegistryError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        self.get_or_create_entry(name, init, None)
    }

    /// Like [`get_or_create_with`](Self::get_or_create_with), attaching
    /// `destructor` to the entry when this call is the one that creates it.
    ///
    /// The hook runs exactly once when the registry releases the entry. If the
    /// name already holds an object, the hook is dropped without running.
    pub fn get_or_create_with_destructor<T, F>(
        &self,
        name: &str,
        init: F,
        destructor: impl FnOnce() + Send + 'static,
    ) -> Result<Arc<T>, RegistryError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        self.get_or_create_entry(name, init, Some(Box::new(destructor)))
    }

    fn get_or_create_entry<T, F>(
        &self,
        name: &str,
        init: F,
        destructor: Option<Destructor>,
    ) -> Result<Arc<T>, RegistryError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let mut slot = self.slot_for(name);
        loop {
            let building = slot.lock_building();
            if slot.is_retired() {
                drop(building);
                slot = self.slot_for(name);
                continue;
            }

            if let Some(existing) = slot.with_entry(|entry| entry.downcast(name)) {
                return existing;
            }

            let object = Arc::new(init());
            // Sequence taken after construction so dependencies created by
            // `init` are released after this object.
            let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
            let entry = RegistryEntry::new(object, destructor, seq);
            let type_name = entry.type_name();
            let created = entry.downcast(name);
            slot.lock_state().entry = Some(entry);
            drop(building);

            log::debug!("created {name} as {type_name}");
            self.emit_event(RegistryEvent::Create {
                name: name.to_string(),
                type_name,
            });

            return created;
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("policy", &self.policy)
            .field("names", &self.names())
            .finish()
    }
}

// -------------------------------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------------------------------
