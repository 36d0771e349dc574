//! Versioned, TTL-bounded cache over a persistent key-value store
//!
//! Each logical dataset lives under a namespace and is stored as three
//! independent keys (payload, write time, schema version). An entry is served
//! only when all three are present, the version matches the caller's and the
//! entry is younger than the TTL; anything else falls through to the origin.

mod clock;
mod coalesce;
mod config;
mod entry;
mod local;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coalesce::CoalescingCache;
pub use config::{CacheConfig, ConfigError, Namespace};
pub use entry::{CacheStatus, EntryState};
pub use local::{Cached, LocalCache};

use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by [`LocalCache::get`]
///
/// `E` is the origin fetcher's own error type, passed through untouched.
#[derive(Debug, Error)]
pub enum CacheError<E> {
    /// The origin fetcher failed; nothing was cached
    #[error("Origin fetch failed: {0}")]
    Origin(#[source] E),

    /// The backing store failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The dataset configuration is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The fetched payload could not be converted to JSON
    #[error("Failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),
}
