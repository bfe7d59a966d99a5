//! Timetable API client.
//!
//! This module provides the HTTP client for the rail operator's timetable
//! API, the DTOs its responses decode into, and the normalizer that turns
//! those into journey records.
//!
//! Key characteristics of the API:
//! - Train numbers, platforms and station identifiers arrive as either JSON
//!   numbers or strings
//! - Date-times are usually bare local times in the network's timezone
//! - A journey with train changes is one "travel" holding several legs
//! - Field names have drifted between API versions

mod client;
mod convert;
mod error;
mod mock;
mod types;

pub use client::{
    DEFAULT_PRIMARY_BASE_URL, DEFAULT_STATIONS_PATH, DEFAULT_TIMETABLE_PATH, DEFAULT_USER_AGENT,
    RailClient, SourceConfig, Upstream,
};
pub use convert::{
    ConversionError, convert_timetable, convert_travel, decode_timetable, normalize_stations,
    normalize_timetable,
};
pub use error::{FetchError, SourceFailure, SourceKind};
pub use mock::{MockResponse, MockUpstream};
pub use types::{StationDto, StationsEnvelope, TimetableEnvelope, TimetableResult, TrainLeg, Travel};
