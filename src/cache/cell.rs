//! Persistent keyed cache cell
//!
//! Provides `PersistentCell<T>`, a typed handle over one key in a
//! [`SharedStore`](crate::store::SharedStore). The cell keeps an in-memory
//! mirror that is always readable and writable, persists writes to the
//! durable store on a best-effort basis, and follows changes made to the
//! same key by other execution contexts.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

use crate::store::{SharedStore, StoreEvent};

/// Storage capability of the execution context owning a cell
///
/// Passed explicitly at construction instead of sniffing the runtime
/// environment: an `Interactive` context can reach the durable store, a
/// `Headless` one (e.g., non-interactive rendering) cannot and the cell
/// behaves as a pure in-memory value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// The durable store is reachable; writes persist and external changes
    /// are observed
    Interactive,
    /// No durable store; the cell is memory-only
    Headless,
}

/// Identifies one subscriber registered on a cell
pub type SubscriptionId = u64;

type Subscriber<T> = Box<dyn Fn(&T) + Send + Sync>;

/// Shared state behind a `PersistentCell` and its clones
struct CellInner<T> {
    /// Store key this cell manages
    key: String,
    /// Value used when the store has nothing usable for the key
    default: T,
    /// Storage capability of this context
    environment: Environment,
    /// The durable store shared with other contexts
    store: Arc<SharedStore>,
    /// This cell's context id on the store; 0 when never registered
    ctx_id: AtomicU64,
    /// In-memory mirror, the value `get` returns
    value: Mutex<T>,
    /// Observers notified after every mirror change
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber<T>)>>,
    /// Source of subscription ids
    next_sub_id: AtomicU64,
}

/// A typed, crash-tolerant handle to one named slot in the durable store
///
/// The mirror and the store converge after every successful write and after
/// any observed external change, but are not transactionally atomic: a
/// write updates the mirror synchronously and then persists best-effort.
/// Store failures are logged and swallowed; `get` and `set` never fail.
///
/// Cloning yields another handle to the same mirror. Subscriber callbacks
/// must not call back into the cell.
pub struct PersistentCell<T> {
    inner: Arc<CellInner<T>>,
}

impl<T> Clone for PersistentCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PersistentCell<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Creates a cell for `key`, seeded from the durable store when the
    /// environment allows it.
    ///
    /// A missing key, an unreadable store, or an unparseable stored value
    /// all degrade to `default`; the latter two are logged. A `Headless`
    /// cell never touches the store at all.
    pub fn new(
        store: Arc<SharedStore>,
        key: impl Into<String>,
        default: T,
        environment: Environment,
    ) -> Self {
        let key = key.into();
        let initial = match environment {
            Environment::Interactive => read_stored(&store, &key, &default),
            Environment::Headless => default.clone(),
        };

        let inner = Arc::new(CellInner {
            key,
            default,
            environment,
            store,
            ctx_id: AtomicU64::new(0),
            value: Mutex::new(initial),
            subscribers: Mutex::new(Vec::new()),
            next_sub_id: AtomicU64::new(1),
        });

        if environment == Environment::Interactive {
            let weak: Weak<CellInner<T>> = Arc::downgrade(&inner);
            let id = inner.store.register(move |event| {
                if let Some(inner) = weak.upgrade() {
                    inner.apply_external(event);
                }
            });
            inner.ctx_id.store(id, Ordering::Relaxed);
        }

        Self { inner }
    }

    /// Returns the last known in-memory value.
    ///
    /// Never consults the durable store; the store is only read at
    /// construction, on [`rehydrate`](Self::rehydrate), and when an
    /// external change is observed.
    pub fn get(&self) -> T {
        self.inner.value.lock().clone()
    }

    /// Replaces the value.
    ///
    /// The mirror is updated synchronously, so a `get` on return observes
    /// `value`; persistence is attempted afterwards and its failure is
    /// logged, never surfaced.
    pub fn set(&self, value: T) {
        self.update(|_| value);
    }

    /// Replaces the value with the result of `f` applied to the current
    /// value.
    ///
    /// Same durability semantics as [`set`](Self::set). `f` runs under the
    /// mirror lock, so writes from one context apply in call order.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let new_value = {
            let mut guard = self.inner.value.lock();
            let next = f(&*guard);
            *guard = next.clone();
            next
        };
        self.inner.notify(&new_value);
        self.inner.persist(&new_value);
    }

    /// Re-reads the durable store once, replacing the mirror with the
    /// stored value (or the default when nothing usable is stored).
    ///
    /// Intended for handles whose initial value was computed before the
    /// store was reachable, and for picking up writes made by other
    /// processes. No-op for `Headless` cells.
    pub fn rehydrate(&self) {
        if self.inner.environment == Environment::Headless {
            return;
        }
        let value = read_stored(&self.inner.store, &self.inner.key, &self.inner.default);
        *self.inner.value.lock() = value.clone();
        self.inner.notify(&value);
    }

    /// Registers an observer called after every mirror change, whether from
    /// a local write or an external store change.
    pub fn subscribe(&self, f: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.inner.next_sub_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.lock().push((id, Box::new(f)));
        id
    }

    /// Removes a previously registered observer.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.subscribers.lock().retain(|(sid, _)| *sid != id);
    }

    /// Returns the store key this cell manages.
    pub fn key(&self) -> &str {
        &self.inner.key
    }
}

/// Reads and parses the stored value for `key`, falling back to `default`
fn read_stored<T>(store: &SharedStore, key: &str, default: &T) -> T
where
    T: DeserializeOwned + Clone,
{
    match store.load(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "stored value is not valid JSON, using default");
                default.clone()
            }
        },
        Ok(None) => default.clone(),
        Err(e) => {
            warn!(key, error = %e, "durable store unreadable, using default");
            default.clone()
        }
    }
}

impl<T> CellInner<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Applies a change made by another context to the mirror
    fn apply_external(&self, event: &StoreEvent) {
        if event.key != self.key {
            return;
        }
        let value = match &event.new_value {
            Some(raw) => match serde_json::from_str::<T>(raw) {
                Ok(value) => value,
                Err(e) => {
                    // Keep the previous value; a broken payload from another
                    // context must not clobber this context's state.
                    warn!(key = %self.key, error = %e, "ignoring malformed external change");
                    return;
                }
            },
            None => self.default.clone(),
        };
        *self.value.lock() = value.clone();
        self.notify(&value);
    }

    /// Invokes every subscriber with the new value
    fn notify(&self, value: &T) {
        for (_, subscriber) in self.subscribers.lock().iter() {
            subscriber(value);
        }
    }

    /// Best-effort write of the mirror to the durable store
    fn persist(&self, value: &T) {
        if self.environment == Environment::Headless {
            debug!(key = %self.key, "headless context, skipping persistence");
            return;
        }
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %self.key, error = %e, "value not serializable, kept in memory only");
                return;
            }
        };
        let ctx = self.ctx_id.load(Ordering::Relaxed);
        if let Err(e) = self.store.store(ctx, &self.key, Some(&raw)) {
            warn!(key = %self.key, error = %e, "persist failed, kept in memory only");
        }
    }
}

impl<T> Drop for CellInner<T> {
    fn drop(&mut self) {
        let ctx = self.ctx_id.load(Ordering::Relaxed);
        if ctx != 0 {
            self.store.unregister(ctx);
        }
    }
}
