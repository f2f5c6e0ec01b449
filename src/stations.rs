//! # Station Registry
//!
//! Resolves a station name to its static attributes. The registry is loaded
//! from a station list in the public water-level API's JSON shape and keeps
//! only operating stations that publish water-level predictions.
//!
//! ## Lookup Rules
//! 1. Exact name match
//! 2. Otherwise the first station whose name starts with the query,
//!    ignoring case
//!
//! Lookups return `Option`; callers decide whether a miss is an error.

use crate::error::parse_timezone;
use crate::{StationContext, TideError};
use chrono_tz::Tz;
use serde::Deserialize;
use std::{fs, path::Path};
use tracing::{debug, info};

/// Series code of water-level predictions.
pub const WATER_LEVEL_PREDICTIONS: &str = "wlp";

/// One measurement series a station publishes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeriesInfo {
    pub code: String,
    #[serde(default, rename = "nameEn")]
    pub name: Option<String>,
}

/// Static station attributes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Station {
    pub id: String,
    #[serde(default)]
    pub code: String,
    #[serde(alias = "officialName")]
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, rename = "timeSeries")]
    pub series: Vec<SeriesInfo>,
    /// IANA timezone of the station, when the station list carries one
    #[serde(default, alias = "timeZone")]
    pub timezone: Option<String>,
}

impl Station {
    pub fn has_series(&self, code: &str) -> bool {
        self.series.iter().any(|s| s.code == code)
    }

    /// Fail with [`TideError::MissingSeries`] unless the station publishes
    /// `code`.
    pub fn require_series(&self, code: &str) -> Result<(), TideError> {
        if self.has_series(code) {
            Ok(())
        } else {
            Err(TideError::MissingSeries {
                station: self.name.clone(),
                code: code.to_string(),
            })
        }
    }

    /// Timezone to report in: `preferred` when given, else the station's own.
    ///
    /// Fails with [`TideError::MissingTimezone`] when neither is known.
    pub fn resolve_timezone(&self, preferred: Option<&str>) -> Result<Tz, TideError> {
        match preferred.or(self.timezone.as_deref()) {
            Some(name) => parse_timezone(name),
            None => Err(TideError::MissingTimezone(self.name.clone())),
        }
    }

    /// Analysis context for this station in `timezone`.
    pub fn context(&self, timezone: Tz) -> StationContext {
        StationContext {
            latitude: self.latitude,
            longitude: self.longitude,
            timezone,
        }
    }

    fn is_discontinued(&self) -> bool {
        self.kind
            .as_deref()
            .is_some_and(|k| k.eq_ignore_ascii_case("DISCONTINUED"))
    }
}

/// Name-sorted list of usable stations.
#[derive(Debug, Clone, Default)]
pub struct StationRegistry {
    stations: Vec<Station>,
}

impl StationRegistry {
    /// Build a registry, dropping discontinued stations and those without
    /// water-level predictions.
    pub fn new(stations: Vec<Station>) -> Self {
        let total = stations.len();
        let mut stations: Vec<Station> = stations
            .into_iter()
            .filter(|s| !s.is_discontinued() && s.has_series(WATER_LEVEL_PREDICTIONS))
            .collect();
        stations.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(total, kept = stations.len(), "filtered station list");
        Self { stations }
    }

    pub fn from_json(json: &str) -> Result<Self, TideError> {
        let stations: Vec<Station> = serde_json::from_str(json)?;
        Ok(Self::new(stations))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TideError> {
        let registry = Self::from_json(&fs::read_to_string(&path)?)?;
        info!(
            stations = registry.len(),
            path = %path.as_ref().display(),
            "loaded station registry"
        );
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn find(&self, name: &str) -> Option<&Station> {
        if let Some(exact) = self.stations.iter().find(|s| s.name == name) {
            return Some(exact);
        }
        let wanted = name.to_lowercase();
        self.stations
            .iter()
            .find(|s| s.name.to_lowercase().starts_with(&wanted))
    }

    /// Like [`find`](Self::find) but a miss is [`TideError::UnknownStation`].
    pub fn get(&self, name: &str) -> Result<&Station, TideError> {
        self.find(name)
            .ok_or_else(|| TideError::UnknownStation(name.to_string()))
    }
}
