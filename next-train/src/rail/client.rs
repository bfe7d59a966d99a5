//! Timetable API HTTP client.
//!
//! One `RailClient` talks to one source. The primary source is the
//! operator's API gateway and needs a subscription key; the proxy source
//! mirrors the same endpoints without one. Both identify themselves with
//! the same client marker.

use std::future::Future;

use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::Deserialize;

use crate::domain::RouteQuery;

use super::error::FetchError;

/// Default base URL of the operator's API gateway.
pub const DEFAULT_PRIMARY_BASE_URL: &str = "https://israelrail.azurefd.net/rjpa-prod/api/v1";

/// Path of the timetable search endpoint, relative to the base URL.
pub const DEFAULT_TIMETABLE_PATH: &str = "timetable/searchTrainLuzForDateTime";

/// Path of the station directory endpoint, relative to the base URL.
pub const DEFAULT_STATIONS_PATH: &str = "stations/GetStations";

/// Client marker sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "next-train/",
    env!("CARGO_PKG_VERSION"),
    " (menu bar departures board)"
);

/// Header carrying the primary source's subscription key.
const API_KEY_HEADER: &str = "ocp-apim-subscription-key";

const SCHEDULE_TYPE: &str = "1";
const SYSTEM_TYPE: &str = "2";
const LANGUAGE_ID: &str = "Hebrew";

/// Configuration for one upstream source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Subscription key. Only the primary source has one.
    pub api_key: Option<String>,
    pub timetable_path: String,
    pub stations_path: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Client marker header value
    pub user_agent: String,
}

impl SourceConfig {
    /// Config for the primary source with the given subscription key.
    pub fn primary(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Config for a keyless proxy at `base_url`.
    pub fn proxy(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            ..Self::default()
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the client marker.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PRIMARY_BASE_URL.to_string(),
            api_key: None,
            timetable_path: DEFAULT_TIMETABLE_PATH.to_string(),
            stations_path: DEFAULT_STATIONS_PATH.to_string(),
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// A source of raw timetable and station payloads.
///
/// This abstraction allows the orchestrator to be tested with scripted
/// sources. Implementations return the raw body so it can be cached as-is.
pub trait Upstream: Send + Sync {
    /// Fetch the raw timetable payload for `query`.
    fn fetch_timetable(
        &self,
        query: &RouteQuery,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;

    /// Fetch the raw station directory payload.
    fn fetch_stations(&self) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// HTTP client for one timetable API source.
#[derive(Debug, Clone)]
pub struct RailClient {
    state: ClientState,
}

#[derive(Debug, Clone)]
enum ClientState {
    Ready {
        http: reqwest::Client,
        timetable_url: Url,
        stations_url: Url,
    },
    /// The config could not produce a client. Every request fails with
    /// this message as an invalid query.
    Misconfigured(String),
}

#[derive(Debug, Clone, Copy)]
enum Endpoint {
    Timetable,
    Stations,
}

impl RailClient {
    /// Create a new client with the given configuration.
    pub fn new(config: SourceConfig) -> Result<Self, FetchError> {
        let (http, timetable_url, stations_url) = build(&config)?;
        Ok(Self {
            state: ClientState::Ready {
                http,
                timetable_url,
                stations_url,
            },
        })
    }

    /// Like [`new`](Self::new), but a bad config yields a client whose
    /// requests all fail with [`FetchError::InvalidQuery`], so callers can
    /// still fall back to other sources.
    pub fn new_or_misconfigured(config: SourceConfig) -> Self {
        match Self::new(config) {
            Ok(client) => client,
            Err(FetchError::InvalidQuery(reason)) => Self {
                state: ClientState::Misconfigured(reason),
            },
            Err(e) => Self {
                state: ClientState::Misconfigured(e.to_string()),
            },
        }
    }

    pub fn is_misconfigured(&self) -> bool {
        matches!(self.state, ClientState::Misconfigured(_))
    }

    pub fn timetable_url(&self) -> Option<&Url> {
        match &self.state {
            ClientState::Ready { timetable_url, .. } => Some(timetable_url),
            ClientState::Misconfigured(_) => None,
        }
    }

    pub fn stations_url(&self) -> Option<&Url> {
        match &self.state {
            ClientState::Ready { stations_url, .. } => Some(stations_url),
            ClientState::Misconfigured(_) => None,
        }
    }

    /// GET the timetable or station endpoint and return the body of a
    /// successful, non-empty response.
    async fn get(
        &self,
        endpoint: Endpoint,
        params: &[(&str, String)],
    ) -> Result<Vec<u8>, FetchError> {
        let (http, url) = match &self.state {
            ClientState::Ready {
                http,
                timetable_url,
                stations_url,
            } => match endpoint {
                Endpoint::Timetable => (http, timetable_url),
                Endpoint::Stations => (http, stations_url),
            },
            ClientState::Misconfigured(reason) => {
                return Err(FetchError::InvalidQuery(reason.clone()));
            }
        };

        let response = http.get(url.clone()).query(params).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(FetchError::NoData);
        }

        Ok(body.to_vec())
    }
}

/// Build the HTTP client and endpoint URLs for `config`.
fn build(config: &SourceConfig) -> Result<(reqwest::Client, Url, Url), FetchError> {
    let mut headers = HeaderMap::new();

    let user_agent = HeaderValue::from_str(&config.user_agent)
        .map_err(|_| FetchError::InvalidQuery("invalid user agent".to_string()))?;
    headers.insert(USER_AGENT, user_agent);

    if let Some(key) = &config.api_key {
        let key = HeaderValue::from_str(key)
            .map_err(|_| FetchError::InvalidQuery("invalid API key format".to_string()))?;
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);
    }

    let http = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(std::time::Duration::from_secs(config.timeout_secs))
        .build()?;

    Ok((
        http,
        endpoint(&config.base_url, &config.timetable_path)?,
        endpoint(&config.base_url, &config.stations_path)?,
    ))
}

impl Upstream for RailClient {
    async fn fetch_timetable(&self, query: &RouteQuery) -> Result<Vec<u8>, FetchError> {
        query.validate()?;
        self.get(Endpoint::Timetable, &timetable_params(query)).await
    }

    async fn fetch_stations(&self) -> Result<Vec<u8>, FetchError> {
        self.get(Endpoint::Stations, &stations_params()).await
    }
}

/// Join a base URL and a relative path.
fn endpoint(base_url: &str, path: &str) -> Result<Url, FetchError> {
    let joined = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| FetchError::InvalidQuery(format!("{joined}: {e}")))
}

/// Query parameters for a timetable search.
fn timetable_params(query: &RouteQuery) -> Vec<(&'static str, String)> {
    vec![
        ("fromStation", query.from.to_string()),
        ("toStation", query.to.to_string()),
        ("date", query.date_param()),
        ("hour", query.hour_param()),
        ("scheduleType", SCHEDULE_TYPE.to_string()),
        ("systemType", SYSTEM_TYPE.to_string()),
        ("languageId", LANGUAGE_ID.to_string()),
    ]
}

/// Query parameters for the station directory.
fn stations_params() -> Vec<(&'static str, String)> {
    vec![
        ("languageId", LANGUAGE_ID.to_string()),
        ("systemType", SYSTEM_TYPE.to_string()),
    ]
}
