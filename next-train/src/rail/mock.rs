//! Mock upstream for testing and offline development.
//!
//! Serves scripted responses as if they came from a live source, and counts
//! calls so tests can assert which links of the fallback chain were tried.

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::RouteQuery;

use super::client::Upstream;
use super::error::FetchError;

/// What a mock source does when asked for a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// 200 with this body
    Body(Vec<u8>),
    /// Non-2xx status
    Status(u16),
    /// Connection-level failure
    Transport(String),
    /// 200 with an empty body
    Empty,
}

impl MockResponse {
    pub fn body(body: impl AsRef<[u8]>) -> Self {
        MockResponse::Body(body.as_ref().to_vec())
    }

    fn to_result(&self) -> Result<Vec<u8>, FetchError> {
        match self {
            MockResponse::Body(body) => Ok(body.clone()),
            MockResponse::Status(status) => Err(FetchError::HttpStatus {
                status: *status,
                message: "mock status".to_string(),
            }),
            MockResponse::Transport(message) => Err(FetchError::Transport(message.clone())),
            MockResponse::Empty => Err(FetchError::NoData),
        }
    }
}

/// Mock upstream source with scripted responses.
#[derive(Debug)]
pub struct MockUpstream {
    timetable: Mutex<MockResponse>,
    stations: Mutex<MockResponse>,
    timetable_calls: AtomicUsize,
    stations_calls: AtomicUsize,
    last_query: Mutex<Option<RouteQuery>>,
}

impl MockUpstream {
    /// A source that fails every request with a transport error.
    pub fn unreachable() -> Self {
        let down = MockResponse::Transport("connection refused".to_string());
        Self::new(down.clone(), down)
    }

    pub fn new(timetable: MockResponse, stations: MockResponse) -> Self {
        Self {
            timetable: Mutex::new(timetable),
            stations: Mutex::new(stations),
            timetable_calls: AtomicUsize::new(0),
            stations_calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }

    /// Load `timetable.json` and `stations.json` from a directory.
    ///
    /// A missing file makes that endpoint answer 404.
    pub fn from_dir(data_dir: impl AsRef<Path>) -> Result<Self, FetchError> {
        let data_dir = data_dir.as_ref();
        if !data_dir.is_dir() {
            return Err(FetchError::InvalidQuery(format!(
                "mock data directory {} does not exist",
                data_dir.display()
            )));
        }

        let load = |name: &str| match std::fs::read(data_dir.join(name)) {
            Ok(body) => MockResponse::Body(body),
            Err(_) => MockResponse::Status(404),
        };

        Ok(Self::new(load("timetable.json"), load("stations.json")))
    }

    /// Change the timetable response for subsequent calls.
    pub fn set_timetable(&self, response: MockResponse) {
        *self.timetable.lock().unwrap_or_else(|e| e.into_inner()) = response;
    }

    /// Change the station directory response for subsequent calls.
    pub fn set_stations(&self, response: MockResponse) {
        *self.stations.lock().unwrap_or_else(|e| e.into_inner()) = response;
    }

    pub fn timetable_calls(&self) -> usize {
        self.timetable_calls.load(Ordering::SeqCst)
    }

    pub fn stations_calls(&self) -> usize {
        self.stations_calls.load(Ordering::SeqCst)
    }

    /// The most recent timetable query received.
    pub fn last_query(&self) -> Option<RouteQuery> {
        self.last_query
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Upstream for MockUpstream {
    async fn fetch_timetable(&self, query: &RouteQuery) -> Result<Vec<u8>, FetchError> {
        self.timetable_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap_or_else(|e| e.into_inner()) = Some(query.clone());

        let response = self
            .timetable
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        response.to_result()
    }

    async fn fetch_stations(&self) -> Result<Vec<u8>, FetchError> {
        self.stations_calls.fetch_add(1, Ordering::SeqCst);

        let response = self
            .stations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        response.to_result()
    }
}
