//! Timetable and station directory service.
//!
//! The entry point the front end calls. Requests are plain async functions
//! (with callback wrappers for timer-driven callers) that never fail while
//! any source, live or cached, can still answer.

mod service;

#[cfg(test)]
mod service_tests;

pub use service::{ColdStart, TimetableService};
