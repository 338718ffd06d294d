//! Cart configuration.
//!
//! Sources are merged in this order (later sources override earlier):
//! 1. Defaults from `CartConfig::default()`
//! 2. A TOML file, when one is given and exists
//! 3. Environment variables prefixed with `CART_` (e.g. `CART_NAMESPACE`)

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CartError, Result};
use crate::persistence::RecoveryPolicy;

pub const ENV_PREFIX: &str = "CART_";
pub const DEFAULT_NAMESPACE: &str = "GoMarketplace";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartConfig {
    /// Application namespace used to build the storage key.
    pub namespace: String,
    /// File backing the durable store. `None` keeps the cart in memory only.
    pub storage_path: Option<PathBuf>,
    /// Handling of a stored cart that cannot be decoded.
    pub recovery: RecoveryPolicy,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            storage_path: None,
            recovery: RecoveryPolicy::default(),
        }
    }
}

impl CartConfig {
    /// Load from defaults and the environment.
    pub fn load() -> Result<Self> {
        Self::extract(Self::figment(None))
    }

    /// Load from defaults, the TOML file at `path` (skipped if missing), and
    /// the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::extract(Self::figment(Some(path.as_ref())))
    }

    /// The layered figment behind [`load`](Self::load) and [`load_from`](Self::load_from).
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(CartConfig::default()));

        if let Some(path) = path {
            if path.exists() {
                debug!(path = %path.display(), "loading cart config file");
                figment = figment.merge(Toml::file(path));
            } else {
                debug!(path = %path.display(), "cart config file not found, using defaults");
            }
        }

        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// The namespaced key the cart is stored under, e.g. `@GoMarketplace:cartProducts`.
    pub fn storage_key(&self) -> String {
        format!("@{}:cartProducts", self.namespace)
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(CartError::Config("namespace must not be empty".into()));
        }
        if self.namespace.contains(':') {
            return Err(CartError::Config(format!(
                "namespace {:?} must not contain ':'",
                self.namespace
            )));
        }
        Ok(())
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: CartConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }
}
