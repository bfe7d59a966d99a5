//! In-memory station directory.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::{Station, StationId, default_stations};

/// Thread-safe station directory.
///
/// Holds an immutable snapshot of the station list. A refresh installs a
/// whole new snapshot in one swap, so readers see either the old list or the
/// new one and never a mix. Clones share the same snapshot.
#[derive(Debug, Clone)]
pub struct StationDirectory {
    inner: Arc<RwLock<Arc<Vec<Station>>>>,
}

impl StationDirectory {
    /// Create a directory holding the built-in default pair.
    ///
    /// Used at cold start before any fetch has succeeded.
    pub fn new() -> Self {
        Self::with_stations(default_stations())
    }

    pub fn with_stations(stations: Vec<Station>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(stations))),
        }
    }

    /// The current station list.
    pub async fn snapshot(&self) -> Arc<Vec<Station>> {
        let guard = self.inner.read().await;
        Arc::clone(&guard)
    }

    /// Install a new station list.
    ///
    /// An empty list is ignored and the existing snapshot kept. Returns
    /// whether the snapshot was replaced.
    pub async fn replace(&self, stations: Vec<Station>) -> bool {
        if stations.is_empty() {
            return false;
        }

        let next = Arc::new(stations);
        let mut guard = self.inner.write().await;
        *guard = next;
        true
    }

    /// Look up a station name by identifier.
    pub async fn name_of(&self, id: &StationId) -> Option<String> {
        let guard = self.inner.read().await;
        guard.iter().find(|s| &s.id == id).map(|s| s.name.clone())
    }

    /// Stations whose name or identifier contains `query`, ignoring case.
    ///
    /// At most `limit` results, in directory order. A blank query matches
    /// every station.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<Station> {
        let needle = query.trim().to_lowercase();
        let snapshot = self.snapshot().await;

        snapshot
            .iter()
            .filter(|s| {
                needle.is_empty()
                    || s.name.to_lowercase().contains(&needle)
                    || s.id.as_str().to_lowercase().contains(&needle)
            })
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        let guard = self.inner.read().await;
        guard.len()
    }

    pub async fn is_empty(&self) -> bool {
        let guard = self.inner.read().await;
        guard.is_empty()
    }
}

impl Default for StationDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DEFAULT_FROM_STATION, DEFAULT_TO_STATION};

    fn sample() -> Vec<Station> {
        vec![
            Station::new("3700", "Tel Aviv Savidor"),
            Station::new("4600", "Tel Aviv HaShalom"),
            Station::new("2300", "Haifa Hof HaCarmel"),
            Station::new("4900", "Nahariya"),
        ]
    }

    #[tokio::test]
    async fn starts_with_default_pair() {
        let directory = StationDirectory::new();
        assert_eq!(directory.len().await, 2);
        assert!(
            directory
                .name_of(&StationId::new(DEFAULT_FROM_STATION))
                .await
                .is_some()
        );
        assert!(
            directory
                .name_of(&StationId::new(DEFAULT_TO_STATION))
                .await
                .is_some()
        );
    }

    #[tokio::test]
    async fn replace_swaps_whole_list() {
        let directory = StationDirectory::new();
        let before = directory.snapshot().await;

        assert!(directory.replace(sample()).await);
        assert_eq!(directory.len().await, 4);
        assert_eq!(
            directory.name_of(&StationId::new("4900")).await.as_deref(),
            Some("Nahariya")
        );

        // Readers holding the old snapshot are unaffected.
        assert_eq!(before.len(), 2);
    }

    #[tokio::test]
    async fn empty_replacement_is_ignored() {
        let directory = StationDirectory::with_stations(sample());
        assert!(!directory.replace(Vec::new()).await);
        assert_eq!(directory.len().await, 4);
    }

    #[tokio::test]
    async fn clones_share_the_snapshot() {
        let directory = StationDirectory::new();
        let other = directory.clone();
        directory.replace(sample()).await;
        assert_eq!(other.len().await, 4);
    }

    #[tokio::test]
    async fn search_matches_name_or_id() {
        let directory = StationDirectory::with_stations(sample());

        let hits = directory.search("tel aviv", 10).await;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id.as_str(), "3700");

        let hits = directory.search("49", 10).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Nahariya");

        assert_eq!(directory.search("TEL", 1).await.len(), 1);
        assert_eq!(directory.search("  ", 10).await.len(), 4);
        assert!(directory.search("eilat", 10).await.is_empty());
    }

    #[tokio::test]
    async fn unknown_station_has_no_name() {
        let directory = StationDirectory::with_stations(sample());
        assert!(directory.name_of(&StationId::new("9999")).await.is_none());
    }
}
