//! Runtimes: per-conversation sessions.
//!
//! A [`Runtime`] is created for every top-level command and lives as long as the
//! conversation that started it. Components bound to it route back into the same
//! runtime, so handlers see the same controller instances and the same
//! [`KeyValueStore`] across the whole chain.
//!
//! Runtimes are owned by the [`RuntimeManager`](crate::manager::RuntimeManager); the
//! dispatcher holds an `Arc<Runtime>` only for the duration of one dispatch.

use std::any::Any;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use switchyard_core::RuntimeId;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use tracing::debug;

use crate::error::{DispatchError, DispatchResult};
use crate::handler::{Controller, InstanceProvider};

// =============================================================================
// State
// =============================================================================

/// Lifecycle state of a runtime. `Expired` and `Closed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeState {
    Created,
    Active,
    Expired,
    Closed,
}

impl RuntimeState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Active,
            2 => Self::Expired,
            _ => Self::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Active => 1,
            Self::Expired => 2,
            Self::Closed => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Expired | Self::Closed)
    }
}

// =============================================================================
// Instance scope
// =============================================================================

/// Controller instances of one runtime, keyed by handler class.
#[derive(Default)]
pub struct InstanceScope {
    instances: HashMap<String, Box<dyn Controller>>,
}

impl InstanceScope {
    /// Returns the instance for `class`, creating it on first use.
    pub fn get_or_create(
        &mut self,
        class: &str,
        provider: &dyn InstanceProvider,
    ) -> DispatchResult<&mut Box<dyn Controller>> {
        match self.instances.entry(class.to_string()) {
            Entry::Occupied(slot) => Ok(slot.into_mut()),
            Entry::Vacant(slot) => {
                let instance = provider
                    .instantiate(class)
                    .ok_or_else(|| DispatchError::UnknownController {
                        class: class.to_string(),
                    })?;
                debug!(class, "Instantiated controller");
                Ok(slot.insert(instance))
            }
        }
    }

    /// Drops one instance, e.g. after it panicked.
    pub fn evict(&mut self, class: &str) -> bool {
        self.instances.remove(class).is_some()
    }

    pub fn contains(&self, class: &str) -> bool {
        self.instances.contains_key(class)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }
}

impl fmt::Debug for InstanceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceScope")
            .field("classes", &self.instances.keys().collect::<Vec<_>>())
            .finish()
    }
}

// =============================================================================
// Key/value store
// =============================================================================

/// Type-erased properties shared by all handlers of one runtime.
#[derive(Default)]
pub struct KeyValueStore {
    values: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl KeyValueStore {
    pub fn put<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.values.write().insert(key.into(), Arc::new(value));
    }

    /// Clones the value stored under `key` if it has type `T`.
    pub fn get<T: Any + Send + Sync + Clone>(&self, key: &str) -> Option<T> {
        self.values
            .read()
            .get(key)
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    /// Returns the stored value, inserting `init()` first if the key is vacant or
    /// holds another type.
    pub fn get_or_insert_with<T, F>(&self, key: &str, init: F) -> T
    where
        T: Any + Send + Sync + Clone,
        F: FnOnce() -> T,
    {
        let mut values = self.values.write();
        if let Some(existing) = values.get(key).and_then(|value| value.downcast_ref::<T>()) {
            return existing.clone();
        }
        let value = init();
        values.insert(key.to_string(), Arc::new(value.clone()));
        value
    }

    pub fn remove(&self, key: &str) -> bool {
        self.values.write().remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    pub(crate) fn clear(&self) {
        self.values.write().clear();
    }
}

impl fmt::Debug for KeyValueStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyValueStore")
            .field("keys", &self.values.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

// =============================================================================
// Runtime
// =============================================================================

/// One conversation session.
pub struct Runtime {
    id: RuntimeId,
    created_at: DateTime<Utc>,
    last_active_at: Mutex<DateTime<Utc>>,
    state: AtomicU8,
    /// Also serializes dispatch: held for the whole middleware/handler run.
    scope: AsyncMutex<InstanceScope>,
    properties: KeyValueStore,
}

impl Runtime {
    pub(crate) fn new(id: RuntimeId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at: now,
            last_active_at: Mutex::new(now),
            state: AtomicU8::new(RuntimeState::Created.as_u8()),
            scope: AsyncMutex::new(InstanceScope::default()),
            properties: KeyValueStore::default(),
        }
    }

    pub fn id(&self) -> RuntimeId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_active_at(&self) -> DateTime<Utc> {
        *self.last_active_at.lock()
    }

    pub fn state(&self) -> RuntimeState {
        RuntimeState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_closed(&self) -> bool {
        self.state().is_terminal()
    }

    pub fn properties(&self) -> &KeyValueStore {
        &self.properties
    }

    pub(crate) fn activate(&self) {
        let _ = self.state.compare_exchange(
            RuntimeState::Created.as_u8(),
            RuntimeState::Active.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Advances `last_active_at`; never moves it backwards.
    pub(crate) fn touch(&self, now: DateTime<Utc>) {
        let mut last = self.last_active_at.lock();
        if now > *last {
            *last = now;
        }
    }

    /// Moves the runtime into a terminal state and releases what it holds.
    ///
    /// Returns `false` if it was already terminal. The instance scope is released
    /// right away when no dispatch holds it; otherwise the dispatch clears it when it
    /// finishes.
    pub(crate) fn terminate(&self, terminal: RuntimeState) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if RuntimeState::from_u8(current).is_terminal() {
                return false;
            }
            match self.state.compare_exchange(
                current,
                terminal.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        if let Ok(mut scope) = self.scope.try_lock() {
            scope.clear();
        }
        self.properties.clear();
        true
    }

    /// Waits for exclusive access to the instance scope.
    pub async fn lock_scope(&self) -> AsyncMutexGuard<'_, InstanceScope> {
        self.scope.lock().await
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("created_at", &self.created_at)
            .field("last_active_at", &self.last_active_at())
            .finish_non_exhaustive()
    }
}
