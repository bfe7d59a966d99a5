//! Application configuration.
//!
//! Loaded once at startup from a YAML file. Every field has a default, so
//! an empty file (or none at all) gives a working setup that talks to the
//! operator's API with no proxy.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::rail::{DEFAULT_STATIONS_PATH, DEFAULT_TIMETABLE_PATH, SourceConfig};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// The operator's API gateway.
    pub primary: SourceConfig,

    /// Keyless mirror tried when the primary fails. There is no public
    /// default mirror, so no proxy is used unless one is configured.
    pub proxy: Option<ProxyConfig>,

    /// Directory holding cached payloads.
    pub cache_dir: PathBuf,

    /// Path of the preferences JSON file.
    pub preferences_path: PathBuf,

    /// Overrides the client marker sent to both sources.
    pub user_agent: Option<String>,

    /// Serve payloads from `timetable.json` and `stations.json` in this
    /// directory instead of the network.
    pub mock_data_dir: Option<PathBuf>,
}

/// A keyless mirror of the timetable API.
///
/// Unlike the primary, the base URL has no default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProxyConfig {
    pub base_url: String,
    #[serde(default = "ProxyConfig::default_timetable_path")]
    pub timetable_path: String,
    #[serde(default = "ProxyConfig::default_stations_path")]
    pub stations_path: String,
    #[serde(default = "ProxyConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProxyConfig {
    fn default_timetable_path() -> String {
        DEFAULT_TIMETABLE_PATH.to_string()
    }
    fn default_stations_path() -> String {
        DEFAULT_STATIONS_PATH.to_string()
    }
    fn default_timeout_secs() -> u64 {
        SourceConfig::default().timeout_secs
    }

    fn to_source(&self) -> SourceConfig {
        SourceConfig {
            timetable_path: self.timetable_path.clone(),
            stations_path: self.stations_path.clone(),
            ..SourceConfig::proxy(self.base_url.trim())
        }
        .with_timeout(self.timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            primary: SourceConfig::default(),
            proxy: None,
            cache_dir: PathBuf::from(".cache/next-train"),
            preferences_path: PathBuf::from("preferences.json"),
            user_agent: None,
            mock_data_dir: None,
        }
    }
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if config
            .proxy
            .as_ref()
            .is_some_and(|proxy| proxy.base_url.trim().is_empty())
        {
            return Err(ConfigError::ParseError(
                "proxy.base_url must not be empty".to_string(),
            ));
        }
        Ok(config)
    }

    /// Primary source config with the user agent override applied.
    pub fn primary_source(&self) -> SourceConfig {
        self.apply_user_agent(self.primary.clone())
    }

    /// Proxy source config with the user agent override applied. The proxy
    /// never carries the subscription key.
    pub fn proxy_source(&self) -> Option<SourceConfig> {
        self.proxy
            .as_ref()
            .map(|proxy| self.apply_user_agent(proxy.to_source()))
    }

    fn apply_user_agent(&self, source: SourceConfig) -> SourceConfig {
        match &self.user_agent {
            Some(ua) => source.with_user_agent(ua.clone()),
            None => source,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
}
