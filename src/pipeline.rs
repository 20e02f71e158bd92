//! Stale-while-revalidate fetch pipeline
//!
//! Serves the most recently cached value immediately, fetches on a miss
//! with a per-attempt timeout and one bounded retry for transient network
//! failures, and arms a focus-triggered background revalidation after a
//! cache hit so the cache refreshes when the application regains user
//! attention.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::attention::{AttentionHub, AttentionSubscription};
use crate::error::{FetchError, KeyError, Outcome};
use crate::key::{canonicalize, CanonicalKey};
use crate::store::{CacheEntry, CacheStore};

/// Wall-clock bound per fetch attempt.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Attempts per call: the first try plus one retry for transient failures.
pub const MAX_ATTEMPTS: u32 = 2;

/// Per-call options for [`SwrCache::fetch_with_cache`].
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Arm a focus-triggered background revalidation after a cache hit
    pub auto_refresh: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self { auto_refresh: true }
    }
}

/// Stale-tolerant fetch cache for asynchronous remote reads.
///
/// The store and the attention hub are optional collaborators, resolved
/// once at construction. Without a store the cache degrades to
/// always-fetch; without a hub, cache hits simply skip revalidation.
pub struct SwrCache {
    store: Option<Arc<dyn CacheStore>>,
    attention: Option<AttentionHub>,
    timeout: Duration,
    max_attempts: u32,
    /// At most one armed revalidation per canonical key
    revalidations: Mutex<HashMap<String, AttentionSubscription>>,
}

impl SwrCache {
    /// Create a cache with no store and no attention hub.
    pub fn new() -> Self {
        Self {
            store: None,
            attention: None,
            timeout: FETCH_TIMEOUT,
            max_attempts: MAX_ATTEMPTS,
            revalidations: Mutex::new(HashMap::new()),
        }
    }

    /// Attach a backing store.
    pub fn with_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Attach an attention hub for focus-triggered revalidation.
    pub fn with_attention(mut self, hub: AttentionHub) -> Self {
        self.attention = Some(hub);
        self
    }

    /// Override the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the attempt bound. Clamped to at least one attempt.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Fetch `key` through the cache.
    ///
    /// A stored entry is returned immediately without invoking the fetcher;
    /// when `options.auto_refresh` is set (the default) a background
    /// revalidation is armed so the entry refreshes on the next attention
    /// gain. On a miss, including an entry that no longer decodes as `T`
    /// or a store read failure, the fetcher runs via
    /// [`fetch_and_update`](Self::fetch_and_update).
    ///
    /// # Arguments
    /// * `key` - The structured key identifying the resource
    /// * `fetcher` - Loads the resource; receives the canonical key
    /// * `options` - Per-call behavior
    ///
    /// # Returns
    /// * `Ok(Outcome)` - The cached or fetched value, or a terminal error
    /// * `Err(KeyError)` - If the key cannot be canonicalized; no side effect
    pub async fn fetch_with_cache<K, T, F, Fut>(
        &self,
        key: &K,
        fetcher: F,
        options: FetchOptions,
    ) -> Result<Outcome<T>, KeyError>
    where
        K: Serialize + ?Sized,
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
        F: Fn(CanonicalKey) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let canonical = canonicalize(key)?;

        if let Some(store) = &self.store {
            match store.read(&canonical).await {
                Ok(Some(entry)) => {
                    if let Some(data) = entry.decode::<T>() {
                        if options.auto_refresh {
                            self.arm_revalidation(&canonical, fetcher);
                        }
                        return Ok(Outcome::Resolved(data));
                    }
                    // Stored shape no longer matches the requested type
                    debug!(key = canonical.as_str(), "cached entry failed to decode; refetching");
                }
                Ok(None) => {}
                Err(err) => {
                    debug!(
                        key = canonical.as_str(),
                        error = %err,
                        "store read failed; falling back to fetch"
                    );
                }
            }
        }

        Ok(run_fetch(
            self.store.clone(),
            self.timeout,
            self.max_attempts,
            canonical,
            fetcher,
        )
        .await)
    }

    /// Fetch `key` unconditionally and update the store on success.
    ///
    /// Runs up to the configured attempt bound; each attempt races the
    /// fetcher against the per-attempt timeout, and only a network-kind
    /// failure earns the single zero-delay retry.
    pub async fn fetch_and_update<K, T, F, Fut>(
        &self,
        key: &K,
        fetcher: F,
    ) -> Result<Outcome<T>, KeyError>
    where
        K: Serialize + ?Sized,
        T: Serialize,
        F: Fn(CanonicalKey) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let canonical = canonicalize(key)?;
        Ok(run_fetch(
            self.store.clone(),
            self.timeout,
            self.max_attempts,
            canonical,
            fetcher,
        )
        .await)
    }

    /// Number of keys with an armed background revalidation.
    pub fn armed_revalidations(&self) -> usize {
        self.lock_revalidations().len()
    }

    /// Arm one background revalidation for `key`, keyed for the lifetime
    /// of this cache. Repeated cache hits for the same key reuse the
    /// existing subscription instead of stacking new listeners.
    fn arm_revalidation<T, F, Fut>(&self, key: &CanonicalKey, fetcher: F)
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
        F: Fn(CanonicalKey) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let Some(hub) = &self.attention else {
            return;
        };

        let mut revalidations = self.lock_revalidations();
        if revalidations.contains_key(key.as_str()) {
            return;
        }

        let store = self.store.clone();
        let timeout = self.timeout;
        let max_attempts = self.max_attempts;
        let key_owned = key.clone();

        let subscription = hub.on_attention_regained(move |_signal| {
            let store = store.clone();
            let fetcher = fetcher.clone();
            let key = key_owned.clone();
            Box::pin(async move {
                // Background refresh: the result is discarded and failures
                // are dropped; the stale entry stays served either way.
                match run_fetch::<T, _, _>(store, timeout, max_attempts, key.clone(), fetcher).await
                {
                    Outcome::Resolved(_) => {
                        debug!(key = key.as_str(), "background revalidation refreshed entry");
                    }
                    Outcome::Failed(err) => {
                        debug!(
                            key = key.as_str(),
                            error = %err,
                            "background revalidation failed; dropped"
                        );
                    }
                    Outcome::Superseded => {}
                }
            })
        });

        revalidations.insert(key.as_str().to_owned(), subscription);
    }

    fn lock_revalidations(&self) -> MutexGuard<'_, HashMap<String, AttentionSubscription>> {
        self.revalidations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SwrCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Timeout-bounded fetch with one retry for transient failures, writing
/// the store on success. Shared by the foreground miss path and the
/// background revalidation path.
async fn run_fetch<T, F, Fut>(
    store: Option<Arc<dyn CacheStore>>,
    attempt_timeout: Duration,
    max_attempts: u32,
    key: CanonicalKey,
    fetcher: F,
) -> Outcome<T>
where
    T: Serialize,
    F: Fn(CanonicalKey) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;

        // The timer wins the race by dropping the fetcher's future; any
        // side effects it already had are not undone.
        let result = match tokio::time::timeout(attempt_timeout, fetcher(key.clone())).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(attempt_timeout)),
        };

        match result {
            Ok(data) => {
                if let Some(store) = &store {
                    write_through(store, &key, &data).await;
                }
                return Outcome::Resolved(data);
            }
            Err(err) => {
                if err.is_retryable() && attempt < max_attempts {
                    debug!(key = key.as_str(), attempt, error = %err, "transient failure; retrying");
                    // Zero-delay retry: one scheduling turn, no backoff
                    tokio::task::yield_now().await;
                    continue;
                }
                return Outcome::Failed(err);
            }
        }
    }
}

/// Write a fetched value through the store adapter. A write failure is
/// logged and dropped; the fetched value is still returned to the caller.
async fn write_through<T: Serialize>(store: &Arc<dyn CacheStore>, key: &CanonicalKey, data: &T) {
    match CacheEntry::new(data) {
        Ok(entry) => {
            if let Err(err) = store.write(key, entry).await {
                warn!(key = key.as_str(), error = %err, "cache write failed; value returned uncached");
            }
        }
        Err(err) => {
            warn!(key = key.as_str(), error = %err, "fetched value not cacheable");
        }
    }
}
