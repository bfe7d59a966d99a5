//! Fetch error types.

use std::fmt;

use crate::domain::DomainError;

use super::convert::ConversionError;

/// Which link of the fallback chain produced a result or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Primary,
    Proxy,
    Cache,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Primary => f.write_str("primary"),
            SourceKind::Proxy => f.write_str("proxy"),
            SourceKind::Cache => f.write_str("cache"),
        }
    }
}

/// A failed attempt against one source.
#[derive(Debug)]
pub struct SourceFailure {
    pub source: SourceKind,
    pub error: FetchError,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.error)
    }
}

/// Errors from fetching timetable or station data.
///
/// Every variant except [`FetchError::CacheUnavailable`] is absorbed by the
/// orchestrator and moves it on to the next source.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Request could not be sent or no response arrived
    #[error("transport error: {0}")]
    Transport(String),

    /// Response status outside 200-299
    #[error("HTTP status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// Body did not match the expected shape, or a date failed to parse
    #[error("decoding error: {message}")]
    Decoding {
        message: String,
        body: Option<String>,
    },

    /// Successful response with an empty body
    #[error("empty response body")]
    NoData,

    /// Station pair or request URL could not be built
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Every source failed and the cache had nothing usable. Terminal.
    #[error("no usable cached data for {key} ({reason}) after {} failed source(s)", .attempts.len())]
    CacheUnavailable {
        key: String,
        reason: String,
        attempts: Vec<SourceFailure>,
    },
}

impl FetchError {
    /// Whether the orchestrator should move on to the next source.
    pub fn is_fallback_trigger(&self) -> bool {
        !matches!(self, FetchError::CacheUnavailable { .. })
    }

    /// The network attempts that preceded a terminal failure.
    pub fn attempts(&self) -> &[SourceFailure] {
        match self {
            FetchError::CacheUnavailable { attempts, .. } => attempts,
            _ => &[],
        }
    }

    /// Build a decoding error, keeping a prefix of the offending body.
    pub fn decoding(message: impl Into<String>, body: &[u8]) -> Self {
        FetchError::Decoding {
            message: message.into(),
            body: Some(String::from_utf8_lossy(body).chars().take(500).collect()),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

impl From<ConversionError> for FetchError {
    fn from(err: ConversionError) -> Self {
        FetchError::Decoding {
            message: err.to_string(),
            body: None,
        }
    }
}

impl From<DomainError> for FetchError {
    fn from(err: DomainError) -> Self {
        FetchError::InvalidQuery(err.to_string())
    }
}
