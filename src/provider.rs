//! Provider wiring - builds a ready cart and hands out access to it.
//!
//! The cart is never ambient global state. Whoever starts the application
//! opens a [`CartContext`] once and passes clones of it to the components
//! that need the cart. Asking an unprovided context for the cart is a
//! programming error and fails immediately.

use std::sync::Arc;

use tracing::info;

use crate::config::CartConfig;
use crate::error::{CartError, Result};
use crate::kv::{FileKeyValueStore, InMemoryKeyValueStore, KeyValueStore};
use crate::persistence::PersistenceGateway;
use crate::store::CartStore;

/// Builds [`CartContext`]s from configuration.
pub struct CartProvider;

impl CartProvider {
    /// Open the store named by `config`: a file store when `storage_path` is
    /// set, an in-memory store otherwise.
    pub fn open(config: &CartConfig) -> Result<CartContext> {
        let store: Arc<dyn KeyValueStore> = match &config.storage_path {
            Some(path) => Arc::new(FileKeyValueStore::open(path)),
            None => Arc::new(InMemoryKeyValueStore::new()),
        };
        Self::with_store(store, config)
    }

    /// Wire a cart over an externally supplied key-value store.
    pub fn with_store(store: Arc<dyn KeyValueStore>, config: &CartConfig) -> Result<CartContext> {
        config.validate()?;

        let gateway = PersistenceGateway::new(store, config.storage_key());
        let cart = CartStore::open(gateway, config.recovery)?;
        info!(
            key = %config.storage_key(),
            items = cart.len(),
            "cart provider ready"
        );

        Ok(CartContext::provide(Arc::new(cart)))
    }
}

/// Cloneable access to the application's cart.
///
/// `CartContext::default()` has no cart; [`use_cart`](Self::use_cart) on it
/// returns [`CartError::NotInitialized`].
#[derive(Clone, Default)]
pub struct CartContext {
    store: Option<Arc<CartStore>>,
}

impl CartContext {
    pub fn provide(store: Arc<CartStore>) -> Self {
        Self { store: Some(store) }
    }

    pub fn is_provided(&self) -> bool {
        self.store.is_some()
    }

    /// The cart store, or [`CartError::NotInitialized`] outside a provider.
    pub fn use_cart(&self) -> Result<Arc<CartStore>> {
        self.store.clone().ok_or(CartError::NotInitialized)
    }
}
