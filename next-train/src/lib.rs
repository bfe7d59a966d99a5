//! Next-departures core for a menu bar train board.
//!
//! Answers "when is the next train from here to there?" by polling the
//! rail operator's timetable API, falling back to a keyless proxy and then
//! to cached responses when the API is unreachable.

pub mod cache;
pub mod config;
pub mod domain;
pub mod planner;
pub mod preferences;
pub mod rail;
pub mod stations;
pub mod timetable;
