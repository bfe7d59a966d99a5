//! User preferences.
//!
//! The departures core only reads preferences: each fetch takes a snapshot
//! and works from that. Editing belongs to whatever front end owns the
//! preferences file, which writes it back through [`PreferencesStore`].

use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DEFAULT_FROM_STATION, DEFAULT_TO_STATION, NETWORK_TZ, RouteQuery, StationId};
use crate::planner::{FilterConfig, MaxChanges};

/// A snapshot of the user's preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub from_station: StationId,
    pub to_station: StationId,

    /// Travel in the opposite direction without swapping the stored pair.
    pub reversed: bool,

    /// Seconds between refreshes. Also bounds how old a cached payload may
    /// be and still be served without a network call.
    pub refresh_interval_secs: u64,

    /// Minutes needed to reach the platform.
    pub walk_buffer_mins: i64,

    /// Maximum train changes; `-1` for unlimited.
    pub max_changes: MaxChanges,

    pub alert_thresholds: AlertThresholds,

    /// ISO weekday numbers (Monday = 1) on which refreshes run. Empty means
    /// every day.
    pub active_days: Vec<u32>,

    /// Hours of the day during which refreshes run. `None` means all day.
    pub active_hours: Option<ActiveHours>,

    pub favorites: Vec<FavoriteRoute>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            from_station: StationId::new(DEFAULT_FROM_STATION),
            to_station: StationId::new(DEFAULT_TO_STATION),
            reversed: false,
            refresh_interval_secs: 300,
            walk_buffer_mins: 0,
            max_changes: MaxChanges::Unlimited,
            alert_thresholds: AlertThresholds::default(),
            active_days: Vec::new(),
            active_hours: None,
            favorites: Vec::new(),
        }
    }
}

impl Preferences {
    /// The station pair to query, honoring `reversed`.
    pub fn effective_route(&self) -> (StationId, StationId) {
        if self.reversed {
            (self.to_station.clone(), self.from_station.clone())
        } else {
            (self.from_station.clone(), self.to_station.clone())
        }
    }

    /// A timetable query for the effective route at `now`.
    pub fn route_query(&self, now: DateTime<Utc>) -> RouteQuery {
        let (from, to) = self.effective_route();
        RouteQuery::new(from, to, now)
    }

    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            walk_buffer_mins: self.walk_buffer_mins,
            max_changes: self.max_changes,
        }
    }

    /// Refresh period for timers. Never shorter than one second.
    pub fn refresh_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.refresh_interval_secs.max(1))
    }

    /// Whether scheduled refreshes should run at `at`, in network local time.
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        let local = at.with_timezone(&NETWORK_TZ);

        if !self.active_days.is_empty()
            && !self
                .active_days
                .contains(&local.weekday().number_from_monday())
        {
            return false;
        }

        self.active_hours
            .is_none_or(|hours| hours.contains(local.hour()))
    }

    /// Visual cue for a train leaving in `minutes_until` minutes.
    pub fn urgency(&self, minutes_until: i64) -> Urgency {
        self.alert_thresholds.classify(minutes_until)
    }

    /// Make the named favorite the current route.
    pub fn apply_favorite(&mut self, name: &str) -> Result<(), PreferencesError> {
        let favorite = self
            .favorites
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| PreferencesError::UnknownFavorite(name.to_string()))?;

        self.from_station = favorite.from_station.clone();
        self.to_station = favorite.to_station.clone();
        self.reversed = false;
        Ok(())
    }
}

/// Minutes-until-departure thresholds for urgency cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    pub red_mins: i64,
    pub yellow_mins: i64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            red_mins: 5,
            yellow_mins: 15,
        }
    }
}

impl AlertThresholds {
    pub fn classify(&self, minutes_until: i64) -> Urgency {
        if minutes_until <= self.red_mins {
            Urgency::Red
        } else if minutes_until <= self.yellow_mins {
            Urgency::Yellow
        } else {
            Urgency::Normal
        }
    }
}

/// How soon a departure is, relative to the alert thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Red,
    Yellow,
    Normal,
}

/// A daily window of whole hours, `[start_hour, end_hour)`.
///
/// A window whose end is before its start wraps past midnight. Equal start
/// and end cover the whole day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl ActiveHours {
    pub fn contains(&self, hour: u32) -> bool {
        use std::cmp::Ordering::*;
        match self.start_hour.cmp(&self.end_hour) {
            Less => (self.start_hour..self.end_hour).contains(&hour),
            Greater => hour >= self.start_hour || hour < self.end_hour,
            Equal => true,
        }
    }
}

/// A named station pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRoute {
    pub name: String,
    pub from_station: StationId,
    pub to_station: StationId,
}

/// Errors from loading, saving or editing preferences.
#[derive(Debug, thiserror::Error)]
pub enum PreferencesError {
    #[error("preferences I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid preferences file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no favorite named {0:?}")]
    UnknownFavorite(String),
}

/// JSON file holding the preferences.
#[derive(Debug, Clone)]
pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current snapshot. A missing file yields the defaults.
    pub async fn load(&self) -> Result<Preferences, PreferencesError> {
        match tokio::fs::read(&self.path).await {
            Ok(contents) => Ok(serde_json::from_slice(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Preferences::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write `prefs`, replacing the file in one rename.
    pub async fn save(&self, prefs: &Preferences) -> Result<(), PreferencesError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(prefs)?;
        let tmp = self
            .path
            .with_extension(format!("json.{}.tmp", std::process::id()));

        tokio::fs::write(&tmp, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}
