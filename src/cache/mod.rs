//! Cache layer in front of the fetcher
//!
//! Successful page fetches are cached per URL with a time-to-live chosen
//! by hierarchy level: index-side pages change rarely and cache for hours,
//! card detail pages churn and cache briefly. A failed fetch never evicts
//! a previously cached payload.

mod disk;
mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use crate::config::{CacheConfig, CacheTtls};
use crate::fetch::FetchError;
use crate::model::Level;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Errors from the cache store itself
///
/// These indicate an unusable store and are fatal to the run, unlike fetch
/// errors which are recovered per node.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Error surface of `get_or_fetch`: the caller treats fetch errors as node
/// failures and store errors as fatal
#[derive(Debug, Error)]
pub enum GetOrFetchError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] CacheError),
}

/// One cached fetch result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: String,
    /// SHA-256 of the payload, used to notice upstream content changes on
    /// re-fetch
    pub checksum: String,
    /// Unix seconds at fetch time
    pub fetched_at: u64,
}

impl CacheEntry {
    pub fn new(payload: String, fetched_at: u64) -> Self {
        let checksum = payload_checksum(&payload);
        Self {
            payload,
            checksum,
            fetched_at,
        }
    }
}

/// Hex SHA-256 of a payload
pub fn payload_checksum(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

/// Pluggable key-value store behind the cache manager
///
/// Implementations must be safe for concurrent use; readers never observe
/// a partially written entry.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;
    fn put(&self, key: &str, entry: CacheEntry) -> Result<(), CacheError>;
    fn remove(&self, key: &str) -> Result<(), CacheError>;
    fn len(&self) -> Result<usize, CacheError>;
}

/// Content-addressed lookup in front of the fetcher
pub struct CacheManager {
    store: Box<dyn CacheStore>,
    ttls: CacheTtls,
    enabled: bool,
    hits: AtomicU64,
    lookups: AtomicU64,
}

impl CacheManager {
    /// Builds the manager from configuration, choosing the disk store when
    /// a directory is configured and the in-memory store otherwise
    pub fn from_config(config: &CacheConfig) -> Result<Self, CacheError> {
        let store: Box<dyn CacheStore> = match &config.directory {
            Some(dir) => Box::new(DiskStore::new(Path::new(dir))?),
            None => Box::new(MemoryStore::new()),
        };
        Ok(Self {
            store,
            ttls: config.ttl_secs.clone(),
            enabled: config.enabled,
            hits: AtomicU64::new(0),
            lookups: AtomicU64::new(0),
        })
    }

    /// Builds a manager around a specific store (used by tests)
    pub fn with_store(store: Box<dyn CacheStore>, ttls: CacheTtls, enabled: bool) -> Self {
        Self {
            store,
            ttls,
            enabled,
            hits: AtomicU64::new(0),
            lookups: AtomicU64::new(0),
        }
    }

    /// Returns the cached payload for `url` if fresh, otherwise runs
    /// `fetch_fn` and caches its result
    ///
    /// The boolean is true when the payload came from the cache. A fetch
    /// failure propagates unchanged and leaves any prior entry intact.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        url: &str,
        level: Level,
        fetch_fn: F,
    ) -> Result<(String, bool), GetOrFetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, FetchError>>,
    {
        if !self.enabled {
            let body = fetch_fn().await?;
            return Ok((body, false));
        }

        self.lookups.fetch_add(1, Ordering::Relaxed);
        let now = now_unix();
        let ttl = self.ttls.for_level(level).as_secs();

        let prior = self.store.get(url)?;
        if let Some(entry) = &prior {
            if now.saturating_sub(entry.fetched_at) <= ttl {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok((entry.payload.clone(), true));
            }
        }

        let body = fetch_fn().await?;
        let entry = CacheEntry::new(body, now);
        if let Some(old) = &prior {
            if old.checksum != entry.checksum {
                tracing::debug!(url, "cached payload superseded by changed content");
            }
        }
        self.store.put(url, entry.clone())?;
        Ok((entry.payload, false))
    }

    /// Fraction of lookups served from cache, in [0, 1]
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.lookups.load(Ordering::Relaxed);
        if lookups == 0 {
            return 0.0;
        }
        self.hits.load(Ordering::Relaxed) as f64 / lookups as f64
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn entry_count(&self) -> Result<usize, CacheError> {
        self.store.len()
    }
}

fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn manager(enabled: bool) -> CacheManager {
        CacheManager::with_store(Box::new(MemoryStore::new()), CacheTtls::default(), enabled)
    }

    #[tokio::test]
    async fn test_second_lookup_hits_cache() {
        let cache = manager(true);
        let calls = AtomicUsize::new(0);

        for expected_from_cache in [false, true] {
            let (body, from_cache) = cache
                .get_or_fetch("https://example.com/a", Level::Category, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("payload".to_string())
                })
                .await
                .unwrap();
            assert_eq!(body, "payload");
            assert_eq!(from_cache, expected_from_cache);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.hits(), 1);
        assert!((cache.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_fetches() {
        let cache = manager(false);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let (_, from_cache) = cache
                .get_or_fetch("https://example.com/a", Level::Category, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("payload".to_string())
                })
                .await
                .unwrap();
            assert!(!from_cache);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_refetched() {
        let store = MemoryStore::new();
        // Fetched far enough in the past to be expired at every TTL class
        let stale = CacheEntry {
            payload: "old".to_string(),
            checksum: payload_checksum("old"),
            fetched_at: 1,
        };
        store.put("https://example.com/a", stale).unwrap();

        let cache = CacheManager::with_store(Box::new(store), CacheTtls::default(), true);
        let (body, from_cache) = cache
            .get_or_fetch("https://example.com/a", Level::GradeRow, || async {
                Ok("fresh".to_string())
            })
            .await
            .unwrap();

        assert_eq!(body, "fresh");
        assert!(!from_cache);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_prior_entry_intact() {
        let store = MemoryStore::new();
        let stale = CacheEntry {
            payload: "old".to_string(),
            checksum: payload_checksum("old"),
            fetched_at: 1,
        };
        store.put("https://example.com/a", stale).unwrap();

        let cache = CacheManager::with_store(Box::new(store), CacheTtls::default(), true);
        let result = cache
            .get_or_fetch("https://example.com/a", Level::GradeRow, || async {
                Err(FetchError::Permanent {
                    url: "https://example.com/a".to_string(),
                    reason: "HTTP 404".to_string(),
                    status: Some(404),
                })
            })
            .await;

        assert!(matches!(result, Err(GetOrFetchError::Fetch(_))));
        assert_eq!(cache.entry_count().unwrap(), 1);
    }

    #[test]
    fn test_checksum_stable_and_sensitive() {
        assert_eq!(payload_checksum("abc"), payload_checksum("abc"));
        assert_ne!(payload_checksum("abc"), payload_checksum("abd"));
    }
}
