//! Filtering and ordering of journey records.
//!
//! Applied after normalization on every path, whether the records came from
//! a live source or the cache.

use chrono::{DateTime, Duration, Utc};

use crate::domain::JourneyRecord;

use super::config::FilterConfig;

/// How many seconds in the past a departure may be and still be shown when
/// no walking buffer is set. Absorbs small clock skew.
pub const CLOCK_SKEW_TOLERANCE_SECS: i64 = 60;

/// Drop journeys the user cannot or does not want to take, then order the
/// rest by departure time.
///
/// The sort is stable, so journeys departing at the same instant keep their
/// upstream order.
pub fn apply(
    records: Vec<JourneyRecord>,
    now: DateTime<Utc>,
    config: &FilterConfig,
) -> Vec<JourneyRecord> {
    let mut kept: Vec<JourneyRecord> = records
        .into_iter()
        .filter(|r| passes(r, now, config))
        .collect();
    kept.sort_by_key(|r| r.departure_time);
    kept
}

/// Whether a single journey survives the filter.
pub fn passes(record: &JourneyRecord, now: DateTime<Utc>, config: &FilterConfig) -> bool {
    if !config.max_changes.allows(record.change_count) {
        return false;
    }

    let until_departure = record.departure_time - now;
    if config.walk_buffer_mins > 0 {
        until_departure > config.walk_buffer()
    } else {
        until_departure > Duration::seconds(-CLOCK_SKEW_TOLERANCE_SECS)
    }
}
