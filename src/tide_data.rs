//! # Water-Level Data Loading
//!
//! This module turns raw water-level measurements into a [`TideSeries`] the
//! analysis can trust. Fetching from the remote service (chunking, retries,
//! rate limiting) happens elsewhere; this is the last step before analysis.
//!
//! ## Input Format
//!
//! A JSON array of measurement records as returned by the public water-level
//! API, one per 15-minute prediction:
//! ```json
//! [
//!   {"eventDate": "2024-08-01T07:00:00Z", "value": 3.21, "qcFlagCode": "1"},
//!   {"eventDate": "2024-08-01T07:15:00Z", "value": 3.18, "qcFlagCode": "1"}
//! ]
//! ```
//! `time`/`height` are accepted as field names too, and any other fields are
//! ignored.
//!
//! ## Processing Pipeline
//! 1. **Parse**: deserialize records with serde
//! 2. **Normalise**: convert every instant into the station timezone
//! 3. **Order**: sort by time and drop repeated timestamps (first one wins),
//!    since overlapping request chunks return the boundary sample twice
//! 4. **Validate**: confirm the strictly-increasing invariant

use crate::{Sample, TideError, TideSeries};
use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use serde::Deserialize;
use std::{fs, path::Path};
use tracing::{debug, info};

/// One raw water-level measurement.
#[derive(Debug, Clone, Deserialize)]
pub struct Measurement {
    #[serde(alias = "eventDate")]
    pub time: DateTime<FixedOffset>,
    #[serde(alias = "value")]
    pub height: f64,
}

/// Build a validated series from raw measurements.
pub fn series_from_measurements(
    mut measurements: Vec<Measurement>,
    tz: &Tz,
) -> Result<TideSeries, TideError> {
    let received = measurements.len();
    measurements.sort_by_key(|m| m.time);
    measurements.dedup_by_key(|m| m.time);

    let samples: Vec<Sample> = measurements
        .into_iter()
        .filter(|m| m.height.is_finite())
        .map(|m| Sample {
            time: m.time.with_timezone(tz),
            height: m.height,
        })
        .collect();

    if samples.len() != received {
        debug!(
            received,
            kept = samples.len(),
            "dropped duplicate or non-finite measurements"
        );
    }

    let series = TideSeries::new(samples);
    series.validate()?;
    Ok(series)
}

/// Parse measurement JSON into a series in `tz`.
///
/// # Example
/// ```
/// use chrono_tz::Tz;
/// use tide_windows_lib::tide_data::parse_series;
///
/// let json = r#"[
///     {"eventDate": "2024-08-01T07:15:00Z", "value": 3.18},
///     {"eventDate": "2024-08-01T07:00:00Z", "value": 3.21}
/// ]"#;
/// let tz: Tz = "America/Vancouver".parse().unwrap();
/// let series = parse_series(json, &tz).unwrap();
///
/// assert_eq!(series.heights(), vec![3.21, 3.18]);
/// assert_eq!(series.samples[0].time.to_rfc3339(), "2024-08-01T00:00:00-07:00");
/// ```
pub fn parse_series(json: &str, tz: &Tz) -> Result<TideSeries, TideError> {
    let measurements: Vec<Measurement> = serde_json::from_str(json)?;
    series_from_measurements(measurements, tz)
}

/// Load a measurement file into a series in `tz`.
pub fn load_series<P: AsRef<Path>>(path: P, tz: &Tz) -> Result<TideSeries, TideError> {
    let json = fs::read_to_string(&path)?;
    let series = parse_series(&json, tz)?;
    info!(
        samples = series.len(),
        path = %path.as_ref().display(),
        "loaded water-level series"
    );
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MEASUREMENTS: &str = r#"[
        {"eventDate": "2024-08-01T07:30:00Z", "value": 3.0, "qcFlagCode": "1", "timeSeriesId": "a"},
        {"eventDate": "2024-08-01T07:00:00Z", "value": 2.0, "qcFlagCode": "1", "timeSeriesId": "a"},
        {"eventDate": "2024-08-01T07:15:00Z", "value": 2.5, "qcFlagCode": "1", "timeSeriesId": "a"},
        {"eventDate": "2024-08-01T07:30:00Z", "value": 9.9, "qcFlagCode": "1", "timeSeriesId": "a"}
    ]"#;

    fn vancouver() -> Tz {
        "America/Vancouver".parse().unwrap()
    }

    #[test]
    fn test_sorts_and_deduplicates() {
        let series = parse_series(MEASUREMENTS, &vancouver()).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.heights(), vec![2.0, 2.5, 3.0]);
        assert!(series.validate().is_ok());
    }

    #[test]
    fn test_normalises_timezone() {
        let series = parse_series(MEASUREMENTS, &vancouver()).unwrap();
        for sample in &series.samples {
            assert_eq!(sample.time.timezone(), vancouver());
        }
        assert_eq!(
            series.samples[0].time.to_rfc3339(),
            "2024-08-01T00:00:00-07:00"
        );
    }

    #[test]
    fn test_accepts_plain_field_names() {
        let json = r#"[{"time": "2024-08-01T00:00:00+00:00", "height": 1.25}]"#;
        let series = parse_series(json, &Tz::UTC).unwrap();
        assert_eq!(series.heights(), vec![1.25]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(MEASUREMENTS.as_bytes()).unwrap();
        let series = load_series(file.path(), &Tz::UTC).unwrap();
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            load_series("/nonexistent/tides.json", &Tz::UTC),
            Err(TideError::Io(_))
        ));
    }

    #[test]
    fn test_bad_record_is_json_error() {
        let json = r#"[{"eventDate": "yesterday", "value": 1.0}]"#;
        assert!(matches!(
            parse_series(json, &Tz::UTC),
            Err(TideError::Json(_))
        ));
    }
}
