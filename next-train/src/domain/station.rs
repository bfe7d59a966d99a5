//! Station identity types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An upstream station identifier.
///
/// The API sends these as integers in some responses and strings in others,
/// so we keep them as opaque string tokens. Surrounding whitespace is
/// stripped on construction; nothing else is validated.
///
/// # Examples
///
/// ```
/// use next_train::domain::StationId;
///
/// let id = StationId::new(" 3700 ");
/// assert_eq!(id.as_str(), "3700");
/// assert!(!id.is_empty());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(String);

impl StationId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationId({})", self.0)
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StationId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A station in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub name: String,
}

impl Station {
    pub fn new(id: impl Into<StationId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Tel Aviv Savidor Center.
pub const DEFAULT_FROM_STATION: &str = "3700";

/// Haifa Hof HaCarmel.
pub const DEFAULT_TO_STATION: &str = "2300";

/// The built-in station pair used before any directory fetch succeeds.
pub fn default_stations() -> Vec<Station> {
    vec![
        Station::new(DEFAULT_FROM_STATION, "תל אביב - סבידור מרכז"),
        Station::new(DEFAULT_TO_STATION, "חיפה - חוף הכרמל"),
    ]
}
