//! Fetching with fallback.
//!
//! Each request walks a fixed chain: a fresh enough cache entry, then the
//! primary source, then the proxy, then whatever the cache holds however
//! old. A source that answers with something that does not normalize counts
//! as failed. Only when the whole chain is spent does the caller see an
//! error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{PayloadCache, STATIONS_KEY, is_fresh};
use crate::domain::{Clock, DataSource, JourneyRecord, RouteQuery, Station, SystemClock};
use crate::planner;
use crate::preferences::Preferences;
use crate::rail::{
    ConversionError, FetchError, SourceFailure, SourceKind, Upstream, normalize_stations,
    normalize_timetable,
};
use crate::stations::StationDirectory;

/// Which payload a chain is fetching.
#[derive(Debug, Clone, Copy)]
enum Request<'a> {
    Timetable(&'a RouteQuery),
    Stations,
}

/// Result of a cold-start station load.
#[derive(Debug)]
pub struct ColdStart {
    /// Cached directory if there was one, else the built-in default pair.
    pub stations: Arc<Vec<Station>>,

    /// The network refresh running in the background. It installs its
    /// result in the directory itself; awaiting it is optional.
    pub refresh: JoinHandle<Result<Vec<Station>, FetchError>>,
}

/// Timetable and station directory service.
///
/// Cheap to clone; clones share the sources, the cache and the directory.
pub struct TimetableService<U, C> {
    primary: Arc<U>,
    proxy: Option<Arc<U>>,
    cache: Arc<C>,
    clock: Arc<dyn Clock>,
    directory: StationDirectory,
}

impl<U, C> Clone for TimetableService<U, C> {
    fn clone(&self) -> Self {
        Self {
            primary: Arc::clone(&self.primary),
            proxy: self.proxy.clone(),
            cache: Arc::clone(&self.cache),
            clock: Arc::clone(&self.clock),
            directory: self.directory.clone(),
        }
    }
}

impl<U, C> TimetableService<U, C>
where
    U: Upstream + 'static,
    C: PayloadCache + 'static,
{
    /// Create a service with no proxy, the system clock and a default
    /// directory.
    pub fn new(primary: U, cache: C) -> Self {
        Self {
            primary: Arc::new(primary),
            proxy: None,
            cache: Arc::new(cache),
            clock: Arc::new(SystemClock),
            directory: StationDirectory::new(),
        }
    }

    /// Add a proxy source, tried after the primary.
    pub fn with_proxy(mut self, proxy: U) -> Self {
        self.proxy = Some(Arc::new(proxy));
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share an existing directory instead of the default one.
    pub fn with_directory(mut self, directory: StationDirectory) -> Self {
        self.directory = directory;
        self
    }

    pub fn primary(&self) -> &U {
        &self.primary
    }

    pub fn proxy(&self) -> Option<&U> {
        self.proxy.as_deref()
    }

    pub fn directory(&self) -> &StationDirectory {
        &self.directory
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Upcoming journeys for the preferred route, filtered and sorted.
    ///
    /// A fresh cache entry is served without touching the network. An empty
    /// list is a successful result.
    pub async fn fetch_timetable(
        &self,
        prefs: &Preferences,
    ) -> Result<Vec<JourneyRecord>, FetchError> {
        let now = self.clock.now();
        let query = prefs.route_query(now);
        let key = query.cache_key();
        let filter = prefs.filter_config();
        let stations = self.directory.snapshot().await;
        let normalize = |body: &[u8]| normalize_timetable(body, &query, &stations);

        if let Some(cached) = self.cache.get(&key, now).await {
            if is_fresh(cached.age_minutes, prefs.refresh_interval_secs) {
                match normalize(&cached.payload) {
                    Ok(records) => {
                        debug!(key = %key, age_minutes = cached.age_minutes, "serving fresh cache entry");
                        let source = DataSource::Cached {
                            age_minutes: cached.age_minutes,
                        };
                        return Ok(finish(records, source, now, &filter));
                    }
                    Err(e) => warn!(key = %key, error = %e, "fresh cache entry failed to normalize"),
                }
            } else {
                debug!(key = %key, age_minutes = cached.age_minutes, "cache entry is stale");
            }
        } else {
            debug!(key = %key, "cache miss");
        }

        let (records, source) = self
            .run_chain(Request::Timetable(&query), &key, normalize)
            .await?;
        Ok(finish(records, source, now, &filter))
    }

    /// The station directory, always trying the network first.
    ///
    /// Whatever succeeds, network or cache, replaces the in-memory directory.
    pub async fn fetch_stations(&self) -> Result<Vec<Station>, FetchError> {
        let (stations, source) = self
            .run_chain(Request::Stations, STATIONS_KEY, normalize_stations)
            .await?;

        if self.directory.replace(stations.clone()).await {
            info!(count = stations.len(), ?source, "station directory updated");
        } else {
            warn!(?source, "station directory payload was empty; keeping previous");
        }
        Ok(stations)
    }

    /// Load the directory without waiting for the network.
    ///
    /// Installs the cached directory if there is one, returns the current
    /// snapshot, and starts a network refresh in the background.
    pub async fn fetch_stations_cold_start(&self) -> ColdStart {
        let now = self.clock.now();

        if let Some(cached) = self.cache.get(STATIONS_KEY, now).await {
            match normalize_stations(&cached.payload) {
                Ok(stations) => {
                    if self.directory.replace(stations).await {
                        debug!(age_minutes = cached.age_minutes, "loaded cached station directory");
                    }
                }
                Err(e) => warn!(error = %e, "cached station directory failed to normalize"),
            }
        }

        let stations = self.directory.snapshot().await;
        let service = self.clone();
        let refresh = tokio::spawn(async move {
            let result = service.fetch_stations().await;
            if let Err(e) = &result {
                warn!(error = %e, "background station refresh failed");
            }
            result
        });

        ColdStart { stations, refresh }
    }

    /// Run [`fetch_timetable`](Self::fetch_timetable) on a task and hand
    /// the result to `callback`.
    pub fn fetch_timetable_with<F>(&self, prefs: Preferences, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<Vec<JourneyRecord>, FetchError>) + Send + 'static,
    {
        let service = self.clone();
        tokio::spawn(async move { callback(service.fetch_timetable(&prefs).await) })
    }

    /// Run [`fetch_stations`](Self::fetch_stations) on a task and hand the
    /// result to `callback`.
    pub fn fetch_stations_with<F>(&self, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<Vec<Station>, FetchError>) + Send + 'static,
    {
        let service = self.clone();
        tokio::spawn(async move { callback(service.fetch_stations().await) })
    }

    /// Primary, proxy, then the cache regardless of age.
    ///
    /// Cache writes and ages use the clock at the moment they happen, not
    /// when the chain started.
    async fn run_chain<T>(
        &self,
        request: Request<'_>,
        key: &str,
        normalize: impl Fn(&[u8]) -> Result<T, ConversionError>,
    ) -> Result<(T, DataSource), FetchError> {
        let mut attempts = Vec::new();

        for (kind, source) in self.sources() {
            let body = match fetch_raw(source, request).await {
                Ok(body) => body,
                Err(error) => {
                    warn!(key, source = %kind, error = %error, "source failed");
                    attempts.push(SourceFailure {
                        source: kind,
                        error,
                    });
                    continue;
                }
            };

            match normalize(&body) {
                Ok(value) => {
                    self.cache.put(key, &body, self.clock.now()).await;
                    info!(key, source = %kind, bytes = body.len(), "fetched");
                    return Ok((value, DataSource::Live));
                }
                Err(e) => {
                    warn!(key, source = %kind, error = %e, "response failed to normalize");
                    attempts.push(SourceFailure {
                        source: kind,
                        error: FetchError::decoding(e.to_string(), &body),
                    });
                }
            }
        }

        let Some(cached) = self.cache.get(key, self.clock.now()).await else {
            return Err(FetchError::CacheUnavailable {
                key: key.to_string(),
                reason: "no cached entry".to_string(),
                attempts,
            });
        };

        match normalize(&cached.payload) {
            Ok(value) => {
                info!(key, age_minutes = cached.age_minutes, "serving stale cache entry");
                Ok((
                    value,
                    DataSource::Cached {
                        age_minutes: cached.age_minutes,
                    },
                ))
            }
            Err(e) => Err(FetchError::CacheUnavailable {
                key: key.to_string(),
                reason: format!("cached entry failed to normalize: {e}"),
                attempts,
            }),
        }
    }

    fn sources(&self) -> impl Iterator<Item = (SourceKind, &U)> {
        std::iter::once((SourceKind::Primary, self.primary.as_ref()))
            .chain(self.proxy.as_deref().map(|p| (SourceKind::Proxy, p)))
    }
}

async fn fetch_raw<U: Upstream>(source: &U, request: Request<'_>) -> Result<Vec<u8>, FetchError> {
    match request {
        Request::Timetable(query) => source.fetch_timetable(query).await,
        Request::Stations => source.fetch_stations().await,
    }
}

/// Tag records with their source, then filter and sort them.
fn finish(
    records: Vec<JourneyRecord>,
    source: DataSource,
    now: DateTime<Utc>,
    filter: &planner::FilterConfig,
) -> Vec<JourneyRecord> {
    let tagged = records.into_iter().map(|r| r.with_source(source)).collect();
    planner::apply(tagged, now, filter)
}
