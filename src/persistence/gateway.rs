//! PersistenceGateway - reads and writes the whole cart under one key.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::RecoveryPolicy;
use crate::error::{CartError, Result};
use crate::item::Cart;
use crate::kv::KeyValueStore;

/// Thin adapter over a [`KeyValueStore`] that owns the serialized cart entry.
///
/// Every save is a full snapshot that overwrites the previous value.
#[derive(Clone)]
pub struct PersistenceGateway {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// The fixed key the cart lives under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the stored cart. An absent key yields an empty cart; a present but
    /// undecodable value is a [`CartError::Deserialization`].
    pub fn load(&self) -> Result<Cart> {
        let raw = self
            .store
            .get(&self.key)
            .map_err(|source| CartError::PersistenceRead {
                key: self.key.clone(),
                source,
            })?;

        let Some(raw) = raw else {
            debug!(key = %self.key, "no stored cart, starting empty");
            return Ok(Cart::new());
        };

        let cart: Cart =
            serde_json::from_str(&raw).map_err(|e| CartError::Deserialization {
                key: self.key.clone(),
                message: e.to_string(),
            })?;

        info!(key = %self.key, items = cart.len(), "loaded stored cart");
        Ok(cart)
    }

    /// Like [`load`](Self::load), but applies `policy` to corrupt data.
    ///
    /// Read failures from the store itself always propagate.
    pub fn load_with(&self, policy: RecoveryPolicy) -> Result<Cart> {
        match (self.load(), policy) {
            (Err(err @ CartError::Deserialization { .. }), RecoveryPolicy::ResetOnCorrupt) => {
                warn!(key = %self.key, error = %err, "discarding corrupt stored cart");
                Ok(Cart::new())
            }
            (result, _) => result,
        }
    }

    /// Serialize `cart` and overwrite the stored value.
    pub fn save(&self, cart: &Cart) -> Result<()> {
        let raw =
            serde_json::to_string(cart).map_err(|e| CartError::Serialization(e.to_string()))?;
        self.store
            .set(&self.key, &raw)
            .map_err(|source| CartError::PersistenceWrite {
                key: self.key.clone(),
                source,
            })
    }

    /// Delete the stored value. Returns true if something was stored.
    pub fn clear(&self) -> Result<bool> {
        self.store
            .remove(&self.key)
            .map_err(|source| CartError::PersistenceWrite {
                key: self.key.clone(),
                source,
            })
    }
}
