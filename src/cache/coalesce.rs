//! Single-flight layer: at most one origin fetch per namespace at a time

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;

use super::config::{CacheConfig, Namespace};
use super::entry::CacheStatus;
use super::local::{Cached, LocalCache};
use super::CacheError;
use crate::store::StoreError;

/// Wraps a [`LocalCache`] so concurrent `get` calls on one namespace queue
/// behind each other instead of racing to the origin
///
/// Callers that waited re-check the store once the leader finishes and are
/// served from cache if the leader's fetch succeeded. If it failed, the next
/// caller in line tries the origin itself. Coordination is in-process only.
#[derive(Debug)]
pub struct CoalescingCache {
    cache: LocalCache,
    in_flight: Mutex<HashMap<Namespace, Arc<Mutex<()>>>>,
}

impl CoalescingCache {
    pub fn new(cache: LocalCache) -> Self {
        Self {
            cache,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

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
        let slot = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight.entry(namespace.clone()).or_default().clone()
        };

        let result = {
            let _turn = slot.lock().await;
            self.cache.get(config, origin).await
        };

        let mut in_flight = self.in_flight.lock().await;
        // Only the map and this caller hold the slot: nobody is queued behind us.
        if Arc::strong_count(&slot) == 2 {
            in_flight.remove(namespace);
        }
        result
    }

    pub async fn invalidate(&self, namespace: &Namespace) -> Result<(), StoreError> {
        self.cache.invalidate(namespace).await
    }

    pub async fn status(&self, config: &CacheConfig) -> Result<CacheStatus, StoreError> {
        self.cache.status(config).await
    }

    /// Number of namespaces with a caller currently inside `get`
    pub async fn in_flight(&self) -> usize {
        self.in_flight.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn cache() -> CoalescingCache {
        CoalescingCache::new(LocalCache::with_clock(
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::new(1_700_000_000_000)),
        ))
    }

    fn config() -> CacheConfig {
        CacheConfig::new("timetable_winter", Duration::from_secs(3_600), "gcsV1").unwrap()
    }

    #[tokio::test]
    async fn test_concurrent_cold_gets_share_one_fetch() {
        let cache = cache();
        let config = config();
        let calls = AtomicUsize::new(0);
        let calls_ref = &calls;
        let fetch = move || async move {
            calls_ref.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, std::io::Error>(vec!["COSC 101".to_string()])
        };

        let (a, b, c) = tokio::join!(
            cache.get(&config, fetch),
            cache.get(&config, fetch),
            cache.get(&config, fetch)
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let from_cache: Vec<bool> = [a, b, c].into_iter().map(|r| r.unwrap().from_cache).collect();
        assert_eq!(from_cache.iter().filter(|hit| !**hit).count(), 1);
        assert_eq!(cache.in_flight().await, 0, "slot should be dropped once settled");
    }

    #[tokio::test]
    async fn test_waiter_retries_after_leader_fails() {
        let cache = cache();
        let config = config();
        let calls = AtomicUsize::new(0);
        let calls_ref = &calls;
        let fetch = move || async move {
            let call = calls_ref.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            if call == 0 {
                Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "registrar timeout"))
            } else {
                Ok(vec!["COSC 101".to_string()])
            }
        };

        let (a, b) = tokio::join!(cache.get(&config, fetch), cache.get(&config, fetch));

        assert!(matches!(a, Err(CacheError::Origin(_))));
        assert!(!b.unwrap().from_cache);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.status(&config).await.unwrap().has_valid_entry);
    }

    #[tokio::test]
    async fn test_invalidate_passes_through() {
        let cache = cache();
        let config = config();
        cache
            .get(&config, || async { Ok::<_, std::io::Error>(vec![1, 2, 3]) })
            .await
            .unwrap();

        cache.invalidate(config.namespace()).await.unwrap();

        assert!(!cache.status(&config).await.unwrap().has_valid_entry);
    }
}
