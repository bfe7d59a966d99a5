//! Disk-backed payload cache.
//!
//! One JSON file per key under a cache directory. Writes go to a temporary
//! file that is renamed over the target, so a reader sees either the old
//! entry or the new one and never a half-written file.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CacheEntry, CacheError, CachedPayload, PayloadCache};

/// On-disk form of a cache entry.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    /// When the payload was fetched.
    cached_at: DateTime<Utc>,
    /// The raw payload, base64-encoded.
    payload: String,
}

/// Disk cache for raw upstream payloads.
#[derive(Debug)]
pub struct DiskCache {
    dir: PathBuf,
    tmp_counter: AtomicU64,
}

impl DiskCache {
    /// Create a cache rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            tmp_counter: AtomicU64::new(0),
        }
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`.
    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file}.json"))
    }

    /// Write an entry, replacing any existing one.
    ///
    /// Creates the cache directory if it doesn't exist.
    pub async fn store(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let stored = StoredEntry {
            cached_at: entry.timestamp,
            payload: STANDARD.encode(&entry.payload),
        };
        let json =
            serde_json::to_vec_pretty(&stored).map_err(|e| CacheError::Corrupt(e.to_string()))?;

        let target = self.path_for(key);
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp = target.with_extension(format!("json.{}.{n}.tmp", std::process::id()));

        tokio::fs::write(&tmp, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        Ok(())
    }

    /// Read an entry. `Ok(None)` if there is no file for `key`.
    pub async fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let contents = match tokio::fs::read(self.path_for(key)).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let stored: StoredEntry =
            serde_json::from_slice(&contents).map_err(|e| CacheError::Corrupt(e.to_string()))?;
        let payload = STANDARD
            .decode(stored.payload)
            .map_err(|e| CacheError::Corrupt(e.to_string()))?;

        Ok(Some(CacheEntry {
            timestamp: stored.cached_at,
            payload,
        }))
    }
}

impl PayloadCache for DiskCache {
    async fn put(&self, key: &str, payload: &[u8], stamped_at: DateTime<Utc>) {
        let entry = CacheEntry::new(payload, stamped_at);
        match self.store(key, &entry).await {
            Ok(()) => debug!(key, bytes = payload.len(), "cached payload"),
            Err(e) => warn!(key, error = %e, "failed to persist cache entry"),
        }
    }

    async fn get(&self, key: &str, now: DateTime<Utc>) -> Option<CachedPayload> {
        match self.load(key).await {
            Ok(entry) => entry.map(|e| e.into_cached(now)),
            Err(e) => {
                warn!(key, error = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }
}
