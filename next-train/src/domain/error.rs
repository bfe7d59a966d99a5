//! Domain error types.
//!
//! These errors represent validation failures in the domain layer. They are
//! distinct from transport and decoding errors.

use super::StationId;

/// Domain-level validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// A station identifier is blank
    #[error("{0} station is empty")]
    EmptyStation(&'static str),

    /// Origin and destination are the same station
    #[error("origin and destination are both {0}")]
    SameStation(StationId),
}
