//! Persistence - the durable copy of the cart.
//!
//! [`PersistenceGateway`] reads and writes the serialized cart under one
//! fixed key. [`PersistenceWriter`] sits in front of it so mutations never
//! wait on I/O, and [`PersistenceEvents`] reports how writes went.

mod events;
mod gateway;
mod writer;

use serde::{Deserialize, Serialize};

pub use events::{FailureNotice, PersistedNotice, PersistenceEvents};
pub use gateway::PersistenceGateway;
pub use writer::{PersistenceWriter, WriterStats};

/// What to do when the stored cart cannot be decoded at startup.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPolicy {
    /// Propagate the deserialization error to the caller.
    #[default]
    Strict,
    /// Log the problem and start with an empty cart.
    ResetOnCorrupt,
}
