//! Time handling for the timetable API.
//!
//! The upstream API is inconsistent about how it encodes instants. Some
//! responses carry a full RFC 3339 timestamp with an offset, most carry a
//! bare local date-time in the station network's timezone, and older
//! deployments used a space instead of the `T` separator. This module turns
//! all of those into a `DateTime<Utc>` and provides the display helpers the
//! presentation layer needs.

use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Timezone of the station network. Bare upstream timestamps are local to it.
pub const NETWORK_TZ: Tz = chrono_tz::Asia::Jerusalem;

/// Local date-time patterns tried after strict RFC 3339, in order.
const LOCAL_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Error returned when an upstream date-time matches none of the known formats.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised date-time: {input:?}")]
pub struct TimeParseError {
    input: String,
}

impl TimeParseError {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
        }
    }

    /// The string that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// Parse an upstream date-time string into an absolute instant.
///
/// Tries strict RFC 3339 first, then the network-local patterns in
/// [`LOCAL_FORMATS`]. The first successful parse wins.
///
/// # Examples
///
/// ```
/// use next_train::domain::parse_upstream_instant;
///
/// // No offset: interpreted as Israel local time (UTC+3 in June)
/// let t = parse_upstream_instant("2025-06-01T08:00:00").unwrap();
/// assert_eq!(t.to_rfc3339(), "2025-06-01T05:00:00+00:00");
///
/// assert!(parse_upstream_instant("tomorrow morning").is_err());
/// ```
pub fn parse_upstream_instant(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let trimmed = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in LOCAL_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return local_to_utc(naive).ok_or_else(|| TimeParseError::new(s));
        }
    }

    Err(TimeParseError::new(s))
}

/// Resolve a network-local wall-clock time to UTC.
///
/// Ambiguous times (the repeated hour when DST ends) resolve to the earlier
/// instant. Times inside the spring-forward gap are shifted forward an hour.
fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    NETWORK_TZ
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            NETWORK_TZ
                .from_local_datetime(&(naive + Duration::hours(1)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format the whole-minute gap between two instants.
///
/// `"{m}m"` under an hour, otherwise `"{h}h"` or `"{h}h {m}m"`. Negative
/// gaps are reported as `"0m"`.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use next_train::domain::format_duration;
///
/// let t = Utc::now();
/// assert_eq!(format_duration(t, t + Duration::minutes(45)), "45m");
/// assert_eq!(format_duration(t, t + Duration::minutes(120)), "2h");
/// assert_eq!(format_duration(t, t + Duration::minutes(75)), "1h 15m");
/// ```
pub fn format_duration(from: DateTime<Utc>, to: DateTime<Utc>) -> String {
    let minutes = to.signed_duration_since(from).num_minutes().max(0);

    if minutes >= 60 {
        let hours = minutes / 60;
        let rest = minutes % 60;
        if rest == 0 {
            format!("{hours}h")
        } else {
            format!("{hours}h {rest}m")
        }
    } else {
        format!("{minutes}m")
    }
}

/// Format an instant as `HH:MM` in network local time.
pub fn format_clock(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&NETWORK_TZ).format("%H:%M").to_string()
}

/// Whole minutes from `now` until `target`. Negative once `target` has passed.
pub fn minutes_until(target: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    target.signed_duration_since(now).num_minutes()
}

/// Source of wall-clock time.
///
/// Injected wherever "now" matters so tests can control cache ages and
/// departure cutoffs.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }

    /// Jump the clock to `to`.
    pub fn set(&self, to: DateTime<Utc>) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard = to;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
