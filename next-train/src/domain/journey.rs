//! Journey types.
//!
//! A `JourneyRecord` is one complete door-to-door option between the
//! requested stations, flattened from however many train legs the upstream
//! returned for it.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::time::{NETWORK_TZ, format_clock, format_duration};
use super::{DomainError, StationId};

/// A timetable query for one station pair at one moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteQuery {
    pub from: StationId,
    pub to: StationId,
    pub date_time: DateTime<Utc>,
}

impl RouteQuery {
    pub fn new(from: StationId, to: StationId, date_time: DateTime<Utc>) -> Self {
        Self {
            from,
            to,
            date_time,
        }
    }

    /// Key under which this query's raw payload is cached.
    ///
    /// Only the station pair participates; the time does not.
    pub fn cache_key(&self) -> String {
        format!("{}_{}", self.from, self.to)
    }

    /// Check the query can be turned into an upstream request.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.from.is_empty() {
            return Err(DomainError::EmptyStation("from"));
        }
        if self.to.is_empty() {
            return Err(DomainError::EmptyStation("to"));
        }
        if self.from == self.to {
            return Err(DomainError::SameStation(self.from.clone()));
        }
        Ok(())
    }

    /// The `date` request parameter (`YYYY-MM-DD`, network local).
    pub fn date_param(&self) -> String {
        self.date_time
            .with_timezone(&NETWORK_TZ)
            .format("%Y-%m-%d")
            .to_string()
    }

    /// The `hour` request parameter (`HH:MM`, network local).
    pub fn hour_param(&self) -> String {
        format_clock(self.date_time)
    }
}

/// Where a batch of journey records came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    /// Fetched from an upstream source during this call.
    Live,
    /// Served from the cache, fetched `age_minutes` ago.
    Cached { age_minutes: i64 },
}

/// A normalized journey between the requested stations.
///
/// Invariant: `change_count + 1 == all_train_numbers.len() == all_platforms.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JourneyRecord {
    /// Train number of the first leg.
    pub primary_train_number: String,
    /// Departure of the first leg.
    pub departure_time: DateTime<Utc>,
    /// Arrival of the last leg.
    pub arrival_time: DateTime<Utc>,
    /// Origin platform of the first leg.
    pub origin_platform: String,
    pub from_station_name: String,
    pub to_station_name: String,
    /// Number of train changes; 0 for a direct train.
    pub change_count: usize,
    pub all_train_numbers: Vec<String>,
    /// Origin platform of each leg, in order.
    pub all_platforms: Vec<String>,
    pub source: DataSource,
}

impl JourneyRecord {
    /// Returns true if no train change is needed.
    pub fn is_direct(&self) -> bool {
        self.change_count == 0
    }

    pub fn is_from_cache(&self) -> bool {
        matches!(self.source, DataSource::Cached { .. })
    }

    /// Age of the cached payload this record came from, if any.
    pub fn cache_age_minutes(&self) -> Option<i64> {
        match self.source {
            DataSource::Cached { age_minutes } => Some(age_minutes),
            DataSource::Live => None,
        }
    }

    /// Travel time label, e.g. `"1h 15m"`.
    pub fn duration_label(&self) -> String {
        format_duration(self.departure_time, self.arrival_time)
    }

    /// Departure as `HH:MM` network local time.
    pub fn departure_clock(&self) -> String {
        format_clock(self.departure_time)
    }

    /// Arrival as `HH:MM` network local time.
    pub fn arrival_clock(&self) -> String {
        format_clock(self.arrival_time)
    }

    /// Return this record re-tagged with `source`.
    pub fn with_source(mut self, source: DataSource) -> Self {
        self.source = source;
        self
    }
}
