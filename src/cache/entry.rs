//! Physical layout and validity rules for one cache entry

use serde::Serialize;
use serde_json::Value;

use super::config::{CacheConfig, Namespace};
use crate::store::{KeyValueStore, StoreError};

/// Classification of whatever the store holds for a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// None of the three keys exist
    Empty,
    /// Complete, current version, younger than the TTL
    Valid,
    /// Complete and current version, but too old
    Expired,
    /// Complete, but written under another schema version
    VersionMismatch,
    /// One or two of the three keys are missing
    Partial,
    /// All keys present but a value has the wrong shape
    Corrupt,
}

impl EntryState {
    pub fn is_valid(self) -> bool {
        self == EntryState::Valid
    }
}

/// Read-only report on a namespace, as produced by [`super::LocalCache::status`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStatus {
    pub has_valid_entry: bool,
    pub expires_at_epoch_millis: Option<i64>,
    pub millis_remaining: Option<i64>,
    /// Length of the payload when it is an array
    pub record_count: Option<usize>,
    /// Diagnostic classification of the stored entry
    pub state: EntryState,
    pub stored_at_epoch_millis: Option<i64>,
}

/// The three raw values read for a namespace
#[derive(Debug, Default)]
pub(crate) struct Snapshot {
    pub payload: Option<Value>,
    pub stored_at: Option<Value>,
    pub version: Option<Value>,
}

impl Snapshot {
    pub async fn read(store: &dyn KeyValueStore, namespace: &Namespace) -> Result<Self, StoreError> {
        let keys = [
            namespace.payload_key(),
            namespace.stored_at_key(),
            namespace.version_key(),
        ];
        let (payload, stored_at, version) =
            futures::try_join!(store.get(&keys[0]), store.get(&keys[1]), store.get(&keys[2]))?;
        Ok(Self {
            payload,
            stored_at,
            version,
        })
    }

    fn stored_at_millis(&self) -> Option<i64> {
        self.stored_at.as_ref().and_then(Value::as_i64)
    }

    /// Applies the validity rule: completeness, shape, version, then age
    pub fn classify(&self, config: &CacheConfig, now_millis: i64) -> EntryState {
        let present = [&self.payload, &self.stored_at, &self.version]
            .iter()
            .filter(|v| v.is_some())
            .count();
        match present {
            0 => return EntryState::Empty,
            3 => {}
            _ => return EntryState::Partial,
        }

        let (Some(stored_at), Some(version)) = (
            self.stored_at_millis(),
            self.version.as_ref().and_then(Value::as_str),
        ) else {
            return EntryState::Corrupt;
        };

        if version != config.schema_version() {
            return EntryState::VersionMismatch;
        }

        // A clock that moved backwards yields a negative age, which reads as fresh.
        if now_millis.saturating_sub(stored_at) < config.ttl_millis() {
            EntryState::Valid
        } else {
            EntryState::Expired
        }
    }

    pub fn status(&self, config: &CacheConfig, now_millis: i64) -> CacheStatus {
        let state = self.classify(config, now_millis);
        let stored_at = self.stored_at_millis();

        if !state.is_valid() {
            return CacheStatus {
                has_valid_entry: false,
                expires_at_epoch_millis: None,
                millis_remaining: None,
                record_count: None,
                state,
                stored_at_epoch_millis: stored_at,
            };
        }

        let expires_at = stored_at.map(|t| t.saturating_add(config.ttl_millis()));
        CacheStatus {
            has_valid_entry: true,
            expires_at_epoch_millis: expires_at,
            millis_remaining: expires_at.map(|e| e.saturating_sub(now_millis).max(0)),
            record_count: self
                .payload
                .as_ref()
                .and_then(Value::as_array)
                .map(Vec::len),
            state,
            stored_at_epoch_millis: stored_at,
        }
    }
}
