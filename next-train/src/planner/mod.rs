//! Departure filtering.
//!
//! Turns the normalized journeys for a route into the list the user sees:
//! journeys they cannot reach in time or that need too many changes are
//! dropped, and the rest are ordered by departure.

mod config;
mod filter;

pub use config::{FilterConfig, MaxChanges};
pub use filter::{CLOCK_SKEW_TOLERANCE_SECS, apply, passes};
