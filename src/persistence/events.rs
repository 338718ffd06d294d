use std::sync::{Arc, Mutex, PoisonError};

use event_emitter_rs::EventEmitter;
use serde::{Deserialize, Serialize};

const PERSISTED: &str = "cart.persisted";
const PERSIST_FAILED: &str = "cart.persist_failed";

/// A snapshot reached the durable store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedNotice {
    pub revision: u64,
    pub items: usize,
}

/// A snapshot could not be written. The in-memory cart is unaffected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureNotice {
    pub revision: u64,
    pub key: String,
    pub message: String,
}

/// Observability hook for the persistence pipeline.
///
/// Listeners are invoked on emitter threads, so a slow listener never holds
/// up the writer. Clones share the same listener table.
///
/// # Example
///
/// ```ignore
/// let events = PersistenceEvents::new();
/// events.on_failed(|notice| {
///     eprintln!("cart not saved: {}", notice.message);
/// });
/// ```
#[derive(Clone)]
pub struct PersistenceEvents {
    emitter: Arc<Mutex<EventEmitter>>,
}

impl Default for PersistenceEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistenceEvents {
    pub fn new() -> Self {
        Self {
            emitter: Arc::new(Mutex::new(EventEmitter::new())),
        }
    }

    /// Register a listener for successful writes. Returns the listener id.
    pub fn on_persisted<F>(&self, listener: F) -> String
    where
        F: Fn(PersistedNotice) + Send + Sync + 'static,
    {
        self.emitter().on(PERSISTED, listener)
    }

    /// Register a listener for failed writes. Returns the listener id.
    pub fn on_failed<F>(&self, listener: F) -> String
    where
        F: Fn(FailureNotice) + Send + Sync + 'static,
    {
        self.emitter().on(PERSIST_FAILED, listener)
    }

    /// Remove a listener by id. Returns true if it was registered.
    pub fn remove_listener(&self, id: &str) -> bool {
        self.emitter().remove_listener(id).is_some()
    }

    pub(crate) fn persisted(&self, notice: PersistedNotice) {
        self.emitter().emit(PERSISTED, notice);
    }

    pub(crate) fn failed(&self, notice: FailureNotice) {
        self.emitter().emit(PERSIST_FAILED, notice);
    }

    fn emitter(&self) -> std::sync::MutexGuard<'_, EventEmitter> {
        self.emitter.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
