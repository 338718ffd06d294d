use thiserror::Error;

use crate::kv::KvError;

/// Errors surfaced by the cart store, its persistence gateway, and provider wiring.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The persisted value exists but is not a valid cart.
    #[error("stored cart at {key} could not be decoded: {message}")]
    Deserialization { key: String, message: String },

    /// The in-memory cart could not be encoded for storage.
    #[error("cart could not be encoded: {0}")]
    Serialization(String),

    /// Reading the persisted value from the key-value store failed.
    #[error("reading cart from {key} failed: {source}")]
    PersistenceRead { key: String, source: KvError },

    /// Writing the persisted value to the key-value store failed.
    #[error("writing cart to {key} failed: {source}")]
    PersistenceWrite { key: String, source: KvError },

    /// A product passed to `add_to_cart` broke its preconditions.
    #[error("invalid product: {0}")]
    InvalidProduct(&'static str),

    /// The cart was requested from a context that never had one provided.
    #[error("use_cart must be used within a CartProvider")]
    NotInitialized,

    /// Configuration could not be extracted.
    #[error("invalid cart configuration: {0}")]
    Config(String),

    #[error("cart lock poisoned during {0}")]
    LockPoisoned(&'static str),
}

impl From<figment::Error> for CartError {
    fn from(err: figment::Error) -> Self {
        CartError::Config(err.to_string())
    }
}

pub type Result<T, E = CartError> = std::result::Result<T, E>;
