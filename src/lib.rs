mod config;
mod error;
mod item;
mod kv;
mod persistence;
mod provider;
mod store;

pub mod logging;

pub use config::{CartConfig, DEFAULT_NAMESPACE, ENV_PREFIX};
pub use error::{CartError, Result};
pub use item::{AddOutcome, Cart, CartInvariantError, CartItem, ProductRef};
pub use kv::{FileKeyValueStore, InMemoryKeyValueStore, KeyValueStore, KvError};
pub use persistence::{
    FailureNotice, PersistedNotice, PersistenceEvents, PersistenceGateway, PersistenceWriter,
    RecoveryPolicy, WriterStats,
};
pub use provider::{CartContext, CartProvider};
pub use store::{CartStore, SubscriptionId};
