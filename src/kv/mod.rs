//! Key-value storage - the durable collaborator behind the cart.
//!
//! The cart only ever needs `get` and `set` on a single string key. Anything
//! that can offer atomic per-key reads and writes (browser storage, a mobile
//! async storage bridge, a config directory, an embedded database) can sit
//! behind [`KeyValueStore`].
//!
//! ## Example
//!
//! ```ignore
//! use cart_store::{InMemoryKeyValueStore, KeyValueStore};
//!
//! let store = InMemoryKeyValueStore::new();
//! store.set("@GoMarketplace:cartProducts", "[]")?;
//! assert_eq!(store.get("@GoMarketplace:cartProducts")?.as_deref(), Some("[]"));
//! ```

mod file;
mod in_memory;

use thiserror::Error;

/// Error type for key-value store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KvError {
    /// Underlying I/O failure (disk, quota, bridge).
    #[error("key-value I/O error: {0}")]
    Io(String),
    /// The backing file exists but is not a key-value document.
    #[error("key-value store is corrupt: {0}")]
    Corrupt(String),
    #[error("key-value store lock poisoned during {0}")]
    LockPoisoned(&'static str),
    /// The store refused the operation.
    #[error("key-value store unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for KvError {
    fn from(err: std::io::Error) -> Self {
        KvError::Io(err.to_string())
    }
}

/// Abstract string storage keyed by string.
///
/// Implementations must make each `get`/`set` atomic for its key. No
/// transactions or multi-key guarantees are required.
pub trait KeyValueStore: Send + Sync {
    /// Read the value at `key`. Returns `None` if the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Write `value` at `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), KvError>;

    /// Remove `key`. Returns true if it existed.
    fn remove(&self, key: &str) -> Result<bool, KvError>;
}

pub use file::FileKeyValueStore;
pub use in_memory::InMemoryKeyValueStore;
