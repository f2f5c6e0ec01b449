//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! tide-config.toml file: which station to analyse, where it is, which
//! timezone to report in, and the default thresholds and span of an analysis.
//!
//! ## Example File
//! ```toml
//! [station]
//! id = "07735"
//! name = "Vancouver"
//! latitude = 49.2875
//! longitude = -123.1208
//! timezone = "America/Vancouver"
//! series_code = "wlp"
//!
//! [analysis]
//! thresholds = [1.0, 1.5, 2.0]
//! span_days = 7
//! ```
//!
//! A missing or malformed file is not fatal: the defaults (Vancouver) are used
//! and the reason is logged.

use crate::error::parse_timezone;
use crate::stations::WATER_LEVEL_PREDICTIONS;
use crate::{StationContext, TideError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "tide-config.toml";

/// Application configuration loaded from tide-config.toml
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Station identity and location
    pub station: StationConfig,
    /// Analysis defaults
    pub analysis: AnalysisConfig,
}

/// Tide station configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StationConfig {
    /// Station code (e.g. "07735" for Vancouver)
    pub id: String,
    /// Human-readable station name, also used for registry lookups
    pub name: String,
    /// Degrees north
    pub latitude: f64,
    /// Degrees east (negative west)
    pub longitude: f64,
    /// IANA timezone events are reported in
    pub timezone: String,
    /// Measurement series the analysis requires
    #[serde(default = "default_series_code")]
    pub series_code: String,
}

/// Analysis defaults, overridable from the command line
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnalysisConfig {
    /// Heights in metres to find low-water windows for
    pub thresholds: Vec<f64>,
    /// Length of the analysed range when no end date is given
    pub span_days: i64,
}

fn default_series_code() -> String {
    WATER_LEVEL_PREDICTIONS.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            station: StationConfig {
                id: "07735".to_string(),
                name: "Vancouver".to_string(),
                latitude: 49.2875,
                longitude: -123.1208,
                timezone: "America/Vancouver".to_string(),
                series_code: default_series_code(),
            },
            analysis: AnalysisConfig {
                thresholds: vec![1.0, 1.5, 2.0],
                span_days: 7,
            },
        }
    }
}

impl Config {
    /// Load configuration from tide-config.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(station = %config.station.name, "loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "invalid config file, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "no config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Save current configuration to tide-config.toml
    pub fn save(&self) -> Result<(), TideError> {
        self.save_to_path(CONFIG_FILE)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), TideError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        info!(path = %path.as_ref().display(), "configuration saved");
        Ok(())
    }

    /// Station context for the configured station.
    ///
    /// Fails if the configured timezone is not a known IANA name.
    pub fn context(&self) -> Result<StationContext, TideError> {
        Ok(StationContext {
            latitude: self.station.latitude,
            longitude: self.station.longitude,
            timezone: parse_timezone(&self.station.timezone)?,
        })
    }
}
