//! Caching of raw upstream payloads.
//!
//! Every successful network fetch stores its raw body here, keyed by the
//! logical query (`"stations"` or `"{from}_{to}"`). The store itself never
//! expires or refuses entries: it reports each entry's age and leaves the
//! freshness decision to [`is_fresh`] and its caller. That way the
//! orchestrator can still ask for "whatever is cached, however old" once
//! every network source has failed.

mod disk;
mod freshness;
mod memory;

use std::future::Future;

use chrono::{DateTime, Utc};

pub use disk::DiskCache;
pub use freshness::is_fresh;
pub use memory::{MemoryCache, MemoryCacheConfig};

/// Cache key for the station directory.
pub const STATIONS_KEY: &str = "stations";

/// A stored payload with the instant it was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub timestamp: DateTime<Utc>,
    pub payload: Vec<u8>,
}

impl CacheEntry {
    pub fn new(payload: &[u8], timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            payload: payload.to_vec(),
        }
    }

    /// Whole minutes since the entry was written, rounded down.
    ///
    /// An entry stamped in the future (clock moved backwards) reports 0.
    pub fn age_minutes(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.timestamp)
            .num_seconds()
            .div_euclid(60)
            .max(0)
    }

    fn into_cached(self, now: DateTime<Utc>) -> CachedPayload {
        CachedPayload {
            age_minutes: self.age_minutes(now),
            payload: self.payload,
        }
    }
}

/// A payload read back from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPayload {
    pub payload: Vec<u8>,
    pub age_minutes: i64,
}

/// Errors from cache persistence. Never surfaced past the cache itself.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache entry is corrupt: {0}")]
    Corrupt(String),
}

/// Key-value store for raw upstream payloads.
///
/// `put` is best-effort and replaces the whole entry in one step; `get`
/// returns `None` when nothing usable is stored. Neither ever fails the
/// caller.
pub trait PayloadCache: Send + Sync {
    /// Store `payload` under `key`, stamped with `stamped_at`.
    fn put(
        &self,
        key: &str,
        payload: &[u8],
        stamped_at: DateTime<Utc>,
    ) -> impl Future<Output = ()> + Send;

    /// Read the entry under `key`, aged relative to `now`.
    fn get(&self, key: &str, now: DateTime<Utc>) -> impl Future<Output = Option<CachedPayload>> + Send;
}
