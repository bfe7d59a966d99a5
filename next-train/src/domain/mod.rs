//! Domain types for the departures core.
//!
//! Everything downstream of the response normalizer works in these types:
//! station identifiers are opaque strings, instants are UTC, and journeys
//! are already flattened to one record per door-to-door option.

mod error;
mod journey;
mod station;
mod time;

pub use error::DomainError;
pub use journey::{DataSource, JourneyRecord, RouteQuery};
pub use station::{DEFAULT_FROM_STATION, DEFAULT_TO_STATION, Station, StationId, default_stations};
pub use time::{
    Clock, FixedClock, NETWORK_TZ, SystemClock, TimeParseError, format_clock, format_duration,
    minutes_until, parse_upstream_instant,
};
