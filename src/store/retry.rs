//! Bounded retry with exponential backoff around any store

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{KeyValueStore, StoreError};

/// How often and how patiently a failing store operation is retried
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles on each further attempt
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Decorates a store so transient failures are retried before surfacing
///
/// Only I/O and availability failures are retried. Corrupt values and
/// invalid keys fail immediately since another attempt reads the same bytes.
/// Once attempts are exhausted the last error is returned to the caller.
#[derive(Debug)]
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: KeyValueStore> RetryingStore<S> {
    pub fn new(inner: S) -> Self {
        Self::with_policy(inner, RetryPolicy::default())
    }

    pub fn with_policy(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn run<T, F, Fut>(&self, op: &str, key: &str, mut call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if is_transient(&e) && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_after(attempt);
                    tracing::debug!(op, key, attempt, ?delay, error = %e, "retrying store operation");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if attempt > 1 {
                        tracing::error!(op, key, attempts = attempt, error = %e, "store operation failed");
                    }
                    return Err(e);
                }
            }
        }
    }
}

fn is_transient(error: &StoreError) -> bool {
    matches!(error, StoreError::Io { .. } | StoreError::Unavailable(_))
}

#[async_trait]
impl<S: KeyValueStore> KeyValueStore for RetryingStore<S> {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.run("get", key, || self.inner.get(key)).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.run("set", key, || self.inner.set(key, value.clone())).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.run("remove", key, || self.inner.remove(key)).await
    }

    async fn contains(&self, key: &str) -> Result<bool, StoreError> {
        self.run("contains", key, || self.inner.contains(key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` calls of every operation
    struct FlakyStore {
        inner: MemoryStore,
        failures: u32,
        calls: AtomicU32,
        error: fn() -> StoreError,
    }

    impl FlakyStore {
        fn new(failures: u32, error: fn() -> StoreError) -> Self {
            Self {
                inner: MemoryStore::new(),
                failures,
                calls: AtomicU32::new(0),
                error,
            }
        }

        fn check(&self) -> Result<(), StoreError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err((self.error)())
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
            self.check()?;
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
            self.check()?;
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.check()?;
            self.inner.remove(key).await
        }
    }

    fn io_failure() -> StoreError {
        StoreError::Io {
            key: "k".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk busy"),
        }
    }

    fn invalid_key() -> StoreError {
        StoreError::InvalidKey("k".to_string())
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let store = RetryingStore::with_policy(FlakyStore::new(2, io_failure), fast_policy(3));

        store.set("k", json!("v")).await.expect("third attempt should succeed");

        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.inner().inner.get("k").await.unwrap(), Some(json!("v")));
    }

    #[tokio::test]
    async fn test_exhausted_retries_propagate_error() {
        let store = RetryingStore::with_policy(FlakyStore::new(5, io_failure), fast_policy(3));

        let err = store.get("k").await.unwrap_err();

        assert!(matches!(err, StoreError::Io { .. }));
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let store = RetryingStore::with_policy(FlakyStore::new(5, invalid_key), fast_policy(3));

        let err = store.remove("k").await.unwrap_err();

        assert!(matches!(err, StoreError::InvalidKey(_)));
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 1);
    }
}
