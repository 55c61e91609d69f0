//! TTL memoization for idempotent lookups, backed by [`moka`].
//!
//! Freshness is judged against the injected [`Clock`] rather than moka's own
//! timer, so entries expire lazily on read; there is no background sweep and
//! no capacity bound. Concurrent loads of one key are coalesced by moka, and
//! only successful payloads are stored, so a transient failure never poisons
//! later lookups.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use moka::ops::compute::Op;
use tracing::debug;

use crate::clock::{to_chrono, Clock};
use crate::models::FetchOutcome;

/// Default time-to-live for cached lookups (1 hour).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    stored_at: DateTime<Utc>,
    ttl: Duration,
}

impl<T> CacheEntry<T> {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now - self.stored_at < to_chrono(self.ttl)
    }
}

/// Keyed TTL cache with at most one fetch in flight per key.
pub struct ResultCache<T> {
    clock: Arc<dyn Clock>,
    entries: Cache<String, CacheEntry<T>>,
}

impl<T> ResultCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Cache::builder().name("openfda-results").build(),
        }
    }

    /// Live value for `key`, if any. An expired entry is dropped.
    pub async fn get(&self, key: &str) -> Option<T> {
        let entry = self.entries.get(key).await?;
        if entry.is_live(self.clock.now()) {
            Some(entry.value)
        } else {
            self.evict_if_stale(key).await;
            None
        }
    }

    /// Remove `key` only if it still holds an expired entry, so a value
    /// another caller just stored survives.
    async fn evict_if_stale(&self, key: &str) {
        let now = self.clock.now();
        self.entries
            .entry_by_ref(key)
            .and_compute_with(|current| {
                let stale = current.is_some_and(|entry| !entry.value().is_live(now));
                async move {
                    if stale {
                        Op::Remove
                    } else {
                        Op::Nop
                    }
                }
            })
            .await;
    }

    /// Return the cached value for `key`, or run `fetch` and cache its
    /// payload if it succeeds.
    ///
    /// A live entry short-circuits without calling `fetch`. Callers arriving
    /// while a fetch for the same key is running wait for it and share its
    /// outcome. Non-success outcomes are returned to every waiting caller
    /// and not stored.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> FetchOutcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchOutcome<T>>,
    {
        if let Some(value) = self.get(key).await {
            debug!("Result cache hit for '{}'", key);
            return FetchOutcome::Success(value);
        }

        let load = async {
            debug!("Result cache miss for '{}'", key);
            match fetch().await {
                FetchOutcome::Success(value) => Ok(CacheEntry {
                    value,
                    stored_at: self.clock.now(),
                    ttl,
                }),
                other => {
                    debug!("Not caching '{}': {}", key, other.kind());
                    Err(other)
                }
            }
        };

        match self.entries.entry_by_ref(key).or_try_insert_with(load).await {
            Ok(entry) => {
                if !entry.is_fresh() {
                    debug!("Result cache hit for '{}' after waiting", key);
                }
                FetchOutcome::Success(entry.into_value().value)
            }
            Err(shared) => Arc::try_unwrap(shared).unwrap_or_else(|shared| (*shared).clone()),
        }
    }

    /// Drop the entry for `key`.
    pub async fn invalidate(&self, key: &str) {
        self.entries.invalidate(key).await;
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Number of stored entries, expired ones included until next read.
    pub async fn len(&self) -> usize {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count() as usize
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
