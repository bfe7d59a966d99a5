//! Filter configuration for the departures list.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Limit on the number of train changes a journey may have.
///
/// Stored in preferences as an integer where `-1` means unlimited. Any other
/// negative value is also read as unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum MaxChanges {
    #[default]
    Unlimited,
    AtMost(u32),
}

impl MaxChanges {
    /// Whether a journey with `change_count` changes is allowed.
    pub fn allows(self, change_count: usize) -> bool {
        match self {
            MaxChanges::Unlimited => true,
            MaxChanges::AtMost(max) => change_count <= max as usize,
        }
    }
}

impl From<i32> for MaxChanges {
    fn from(raw: i32) -> Self {
        u32::try_from(raw).map_or(MaxChanges::Unlimited, MaxChanges::AtMost)
    }
}

impl From<MaxChanges> for i32 {
    fn from(max: MaxChanges) -> Self {
        match max {
            MaxChanges::Unlimited => -1,
            MaxChanges::AtMost(n) => i32::try_from(n).unwrap_or(i32::MAX),
        }
    }
}

/// Parameters for filtering journeys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterConfig {
    /// Minutes needed to walk to the platform. Trains leaving sooner are
    /// dropped. Zero disables the buffer.
    pub walk_buffer_mins: i64,

    /// Maximum number of train changes.
    pub max_changes: MaxChanges,
}

impl FilterConfig {
    pub fn new(walk_buffer_mins: i64, max_changes: impl Into<MaxChanges>) -> Self {
        Self {
            walk_buffer_mins,
            max_changes: max_changes.into(),
        }
    }

    /// Returns the walking buffer as a Duration, saturating at
    /// [`Duration::MAX`] for buffers too large to represent.
    pub fn walk_buffer(&self) -> Duration {
        Duration::try_minutes(self.walk_buffer_mins.max(0)).unwrap_or(Duration::MAX)
    }
}
