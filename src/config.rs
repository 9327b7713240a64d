//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! departure-board.toml file. It covers the feed endpoint and poll interval,
//! the board's visual options and the optional side panel.

use crate::blink::BlinkMode;
use crate::grid::MAX_ROWS;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "departure-board.toml";

/// VRS departure monitor for Köln Wiener Platz
pub const DEFAULT_FEED_URL: &str =
    "https://www.vrs.de/index.php?eID=tx_vrsinfo_departuremonitor&i=d8f44641a2626fa3ff5a75dd50ca2560";

pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;

pub const DEFAULT_MAX_ROWS: usize = 20;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Read(#[from] io::Error),

    #[error("invalid config format: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Application configuration loaded from departure-board.toml
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Feed endpoint and polling
    pub feed: FeedConfig,
    /// Board appearance and pacing
    pub display: DisplayConfig,
    /// Supplementary panel next to the table
    pub panel: PanelConfig,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
    /// Seconds between refreshes. Accepts an integer or a numeric string;
    /// anything else falls back to 30.
    #[serde(deserialize_with = "interval_or_default")]
    pub refresh_interval: u64,
    /// Upper bound for a single fetch
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Title shown inside the header box
    pub title: String,
    /// Animated stars or a static bracketed header
    pub blink: BlinkMode,
    /// Pause between row slots while the grid updates (0 disables)
    pub row_pacing_ms: u64,
    /// Duration of one half-cycle of the refresh flash
    pub flash_half_cycle_ms: u64,
    /// Upper bound for the number of table rows, clamped to `1..=MAX_ROWS`
    #[serde(deserialize_with = "rows_within_limit")]
    pub max_rows: usize,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Text lines for the side panel; empty disables it
    pub lines: Vec<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            url: DEFAULT_FEED_URL.to_string(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL_SECS,
            timeout_secs: 10,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            title: "WIENER PLATZ DEPARTURES".to_string(),
            blink: BlinkMode::Stars,
            row_pacing_ms: 40,
            flash_half_cycle_ms: 100,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DisplayConfig {
    pub fn row_pacing(&self) -> Duration {
        Duration::from_millis(self.row_pacing_ms)
    }

    pub fn flash_half_cycle(&self) -> Duration {
        Duration::from_millis(self.flash_half_cycle_ms)
    }
}

impl Config {
    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::from_path(path) {
            Ok(config) => {
                info!(path = %path.display(), "loaded configuration");
                config
            }
            Err(ConfigError::Read(e)) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no config file found, using defaults");
                Self::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "using default configuration");
                Self::default()
            }
        }
    }

    /// Strict variant of [`Config::load_from_path`]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save current configuration to the given path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

fn interval_or_default<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match toml::Value::deserialize(deserializer)? {
        toml::Value::Integer(n) => u64::try_from(n).ok(),
        toml::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(parsed
        .filter(|&secs| secs > 0)
        .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS))
}

fn rows_within_limit<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match toml::Value::deserialize(deserializer)? {
        toml::Value::Integer(n) if n < 1 => 1,
        toml::Value::Integer(n) => usize::try_from(n).map_or(MAX_ROWS, |rows| rows.min(MAX_ROWS)),
        _ => DEFAULT_MAX_ROWS,
    })
}
