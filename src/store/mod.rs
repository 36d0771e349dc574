//! Persistent key-value stores backing the cache
//!
//! A store only promises single-key atomicity: each `set` replaces one value
//! wholesale, but nothing spans several keys. Values are JSON so that arrays
//! and objects round-trip without a string encoding step.

mod file;
mod memory;
mod retry;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use retry::{RetryPolicy, RetryingStore};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors raised by a store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading, writing or removing a key failed at the I/O layer
    #[error("Store I/O failed for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// A value exists but cannot be decoded
    #[error("Stored value for key '{key}' is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The key cannot be represented by this backend
    #[error("Invalid store key: '{0}'")]
    InvalidKey(String),

    /// The backend is disabled or otherwise unusable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Durable key-value storage shared by every cache namespace
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the value for `key`, or `None` when the key is absent
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Removes `key`. Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Whether `key` holds a value, decodable or not
    async fn contains(&self, key: &str) -> Result<bool, StoreError> {
        match self.get(key).await {
            Ok(value) => Ok(value.is_some()),
            Err(StoreError::Corrupt { .. }) => Ok(true),
            Err(e) => Err(e),
        }
    }
}
