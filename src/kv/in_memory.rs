//! InMemoryKeyValueStore - HashMap-backed store for testing and ephemeral carts.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{KeyValueStore, KvError};

/// In-memory key-value store backed by a HashMap.
///
/// Clone-friendly via Arc: clones share the same storage, which lets a test
/// keep a handle to the "disk" while a cart store writes through another.
#[derive(Clone, Default)]
pub struct InMemoryKeyValueStore {
    storage: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryKeyValueStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with a single entry.
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut storage = HashMap::new();
        storage.insert(key.into(), value.into());
        Self {
            storage: Arc::new(RwLock::new(storage)),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.storage.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| KvError::LockPoisoned("get"))?;
        Ok(storage.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| KvError::LockPoisoned("set"))?;
        storage.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, KvError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| KvError::LockPoisoned("remove"))?;
        Ok(storage.remove(key).is_some())
    }
}
