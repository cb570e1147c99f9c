//! Durable key-value store boundary
//!
//! This module defines the storage backend trait, the concrete file and
//! in-memory backends, and `SharedStore`, which adds change notification
//! between execution contexts that share the same backend. Values are
//! opaque serialized strings; typed (de)serialization lives in the cache
//! layer on top.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur when touching the durable store
///
/// These are never surfaced to cache callers; the cache layer logs them
/// and degrades to in-memory behavior.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying filesystem operation failed
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// No durable location could be resolved on this system
    #[error("durable store unavailable: {0}")]
    Unavailable(String),
}

/// Backend for one per-user string-keyed durable store
///
/// Implementations persist raw strings under string keys. A missing key
/// reads as `Ok(None)`, never as an error.
pub trait StorageBackend: Send + Sync {
    /// Reads the value stored under `key`, if any.
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Deletes `key`. Deleting a missing key is a no-op.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Change notification delivered to contexts other than the writer
///
/// Mirrors the shape of the store's native change event: the affected key
/// plus the serialized old and new values (`None` meaning absent/deleted).
#[derive(Debug, Clone)]
pub struct StoreEvent {
    /// The key that changed
    pub key: String,
    /// Serialized value before the change, if the writer knew it
    pub old_value: Option<String>,
    /// Serialized value after the change; `None` means the key was deleted
    pub new_value: Option<String>,
}

/// Identifies one registered execution context on a `SharedStore`
pub type ContextId = u64;

type Listener = Box<dyn Fn(&StoreEvent) + Send + Sync>;

/// A durable store shared by several execution contexts
///
/// Wraps a [`StorageBackend`] with a listener registry. Every mutation
/// persists first, then synchronously notifies all registered listeners
/// except the originating context, the way the platform store's change
/// event fires in every context but the writer. Contexts in a different
/// process share the persisted state but not the notifications; they
/// converge when they rehydrate.
pub struct SharedStore {
    /// Backend that actually persists values
    backend: Box<dyn StorageBackend>,
    /// Listeners for contexts attached to this store
    listeners: Mutex<Vec<(ContextId, Listener)>>,
    /// Source of unique context ids
    next_id: AtomicU64,
}

impl SharedStore {
    /// Creates a shared store over the given backend.
    pub fn new(backend: impl StorageBackend + 'static) -> Arc<Self> {
        Arc::new(Self {
            backend: Box::new(backend),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Registers a change listener and returns its context id.
    ///
    /// The listener is invoked synchronously for every mutation made by a
    /// *different* context.
    pub fn register(&self, listener: impl Fn(&StoreEvent) + Send + Sync + 'static) -> ContextId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, Box::new(listener)));
        id
    }

    /// Removes a previously registered listener.
    pub fn unregister(&self, id: ContextId) {
        self.listeners.lock().retain(|(lid, _)| *lid != id);
    }

    /// Reads the persisted value for `key`.
    pub fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.backend.load(key)
    }

    /// Persists (or, with `None`, deletes) the value for `key`, then
    /// notifies every context except `origin`.
    ///
    /// Notification happens even if a stale `old_value` was raced over;
    /// last write wins at the backend and observers converge on the value
    /// passed here.
    pub fn store(
        &self,
        origin: ContextId,
        key: &str,
        value: Option<&str>,
    ) -> Result<(), StoreError> {
        let old_value = self.backend.load(key).unwrap_or(None);
        match value {
            Some(v) => self.backend.save(key, v)?,
            None => self.backend.remove(key)?,
        }

        let event = StoreEvent {
            key: key.to_string(),
            old_value,
            new_value: value.map(str::to_string),
        };
        for (id, listener) in self.listeners.lock().iter() {
            if *id != origin {
                listener(&event);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for SharedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedStore")
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}
