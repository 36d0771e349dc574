//! Cache-then-fetch over a persistent store

use std::future::Future;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::clock::{Clock, SystemClock};
use super::config::{CacheConfig, Namespace};
use super::entry::{CacheStatus, EntryState, Snapshot};
use super::CacheError;
use crate::store::{KeyValueStore, StoreError};

/// A value returned by [`LocalCache::get`]
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub value: T,
    /// True when served from the store without calling the origin
    pub from_cache: bool,
}

impl<T> Cached<T> {
    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Serves datasets from a persistent store while they are fresh and
/// refills them from the caller's origin fetcher when they are not
///
/// The cache holds no state of its own beyond its store and clock, so clones
/// share everything. Concurrent `get` calls on a cold namespace each call the
/// origin; wrap in [`super::CoalescingCache`] when that matters.
#[derive(Clone)]
pub struct LocalCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCache").finish_non_exhaustive()
    }
}

impl LocalCache {
    /// Creates a cache over `store` using the system clock
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Returns the cached dataset when valid, otherwise fetches and stores it
    ///
    /// An invalid entry (expired, other schema version, partial or corrupt) is
    /// removed before the origin is called, so a failed fetch never leaves it
    /// behind. A valid entry is never touched on failure since it is returned
    /// before the origin runs.
    ///
    /// # Returns
    /// * `Ok(Cached)` with `from_cache = true` on a hit, `false` after a fetch
    /// * `Err(CacheError::Origin)` carrying the fetcher's error verbatim
    /// * `Err(CacheError::Store)` if the store cannot be read or written
    pub async fn get<T, E, F, Fut>(
        &self,
        config: &CacheConfig,
        origin: F,
    ) -> Result<Cached<T>, CacheError<E>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let namespace = config.namespace();
        let snapshot = Snapshot::read(self.store.as_ref(), namespace).await?;
        let mut state = snapshot.classify(config, self.clock.now_millis());

        if state.is_valid() {
            if let Some(payload) = snapshot.payload {
                match serde_json::from_value::<T>(payload) {
                    Ok(value) => {
                        tracing::debug!(%namespace, "cache hit");
                        return Ok(Cached {
                            value,
                            from_cache: true,
                        });
                    }
                    Err(e) => {
                        tracing::warn!(%namespace, error = %e, "cached payload does not decode");
                        state = EntryState::Corrupt;
                    }
                }
            }
        }

        match state {
            EntryState::Empty => tracing::debug!(%namespace, "cache miss"),
            EntryState::Expired => {
                tracing::info!(%namespace, "cache entry expired, purging");
                self.remove_keys(namespace).await?;
            }
            _ => {
                tracing::warn!(%namespace, ?state, "purging unusable cache entry");
                self.remove_keys(namespace).await?;
            }
        }

        let value = origin().await.map_err(CacheError::Origin)?;
        let payload = serde_json::to_value(&value).map_err(CacheError::Encode)?;
        self.write(config, payload).await?;

        tracing::info!(%namespace, version = config.schema_version(), "cache refreshed from origin");
        Ok(Cached {
            value,
            from_cache: false,
        })
    }

    /// Removes every key of `namespace`; a no-op when nothing is stored
    pub async fn invalidate(&self, namespace: &Namespace) -> Result<(), StoreError> {
        self.remove_keys(namespace).await?;
        tracing::info!(%namespace, "cache invalidated");
        Ok(())
    }

    /// Clears several namespaces, returning how many held any key
    ///
    /// This is the out-of-band entry point operators use to force a refetch.
    pub async fn invalidate_all<'a, I>(&self, namespaces: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = &'a Namespace>,
    {
        let mut cleared = 0;
        for namespace in namespaces {
            // Presence only: a value that no longer decodes must still be cleared.
            let had_keys = self.has_any_key(namespace).await?;
            self.invalidate(namespace).await?;
            if had_keys {
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    /// Reports on the stored entry without fetching or mutating anything
    pub async fn status(&self, config: &CacheConfig) -> Result<CacheStatus, StoreError> {
        let snapshot = Snapshot::read(self.store.as_ref(), config.namespace()).await?;
        Ok(snapshot.status(config, self.clock.now_millis()))
    }

    async fn has_any_key(&self, namespace: &Namespace) -> Result<bool, StoreError> {
        for key in [
            namespace.payload_key(),
            namespace.stored_at_key(),
            namespace.version_key(),
        ] {
            if self.store.contains(&key).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn remove_keys(&self, namespace: &Namespace) -> Result<(), StoreError> {
        let keys = [
            namespace.payload_key(),
            namespace.stored_at_key(),
            namespace.version_key(),
        ];
        futures::try_join!(
            self.store.remove(&keys[0]),
            self.store.remove(&keys[1]),
            self.store.remove(&keys[2]),
        )?;
        Ok(())
    }

    async fn write(&self, config: &CacheConfig, payload: Value) -> Result<(), StoreError> {
        let namespace = config.namespace();
        // Version goes last: an interrupted write leaves a partial entry, never a valid-looking one.
        self.store.set(&namespace.payload_key(), payload).await?;
        self.store
            .set(&namespace.stored_at_key(), Value::from(self.clock.now_millis()))
            .await?;
        self.store
            .set(&namespace.version_key(), Value::from(config.schema_version()))
            .await
    }
}
