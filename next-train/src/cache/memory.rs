//! In-memory payload cache.
//!
//! Useful for tests and for running without a writable cache directory.
//! Entries never expire; the capacity bound only exists so a runaway caller
//! cannot grow the map without limit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use moka::future::Cache as MokaCache;

use super::{CacheEntry, CachedPayload, PayloadCache};

/// Configuration for the in-memory cache.
#[derive(Debug, Clone)]
pub struct MemoryCacheConfig {
    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self { max_capacity: 256 }
    }
}

/// In-memory cache for raw upstream payloads.
#[derive(Clone)]
pub struct MemoryCache {
    entries: MokaCache<String, Arc<CacheEntry>>,
}

impl MemoryCache {
    pub fn new(config: &MemoryCacheConfig) -> Self {
        let entries = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .build();

        Self { entries }
    }

    /// Number of stored entries (approximate until pending tasks run).
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// The raw entry under `key`, without aging it.
    pub async fn entry(&self, key: &str) -> Option<Arc<CacheEntry>> {
        self.entries.get(key).await
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(&MemoryCacheConfig::default())
    }
}

impl PayloadCache for MemoryCache {
    async fn put(&self, key: &str, payload: &[u8], stamped_at: DateTime<Utc>) {
        let entry = Arc::new(CacheEntry::new(payload, stamped_at));
        self.entries.insert(key.to_string(), entry).await;
    }

    async fn get(&self, key: &str, now: DateTime<Utc>) -> Option<CachedPayload> {
        let entry = self.entries.get(key).await?;
        Some(CacheEntry::clone(&entry).into_cached(now))
    }
}
