//! # Error Types
//!
//! Every failure the analysis can report is local and synchronous; nothing
//! here is retried by the library. Degraded results (too few samples for
//! extrema, nearest-sample fallback for point queries) are not errors and are
//! logged instead.

use chrono::DateTime;
use chrono_tz::Tz;
use std::io;
use thiserror::Error;

/// Errors that can occur while loading a series or analysing it.
#[derive(Error, Debug)]
pub enum TideError {
    /// Requested range is empty or reversed; rejected before any fitting
    #[error("end time {end} must be after start time {start}")]
    InvalidRange {
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    },

    /// Fewer samples than an operation needs to produce any answer
    #[error("insufficient data: need at least {needed} samples, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Point query outside the loaded series; extrapolation is not supported
    #[error("time {time} is outside the series span {first} .. {last}")]
    OutOfRange {
        time: DateTime<Tz>,
        first: DateTime<Tz>,
        last: DateTime<Tz>,
    },

    /// Station does not publish the measurement series the analysis needs
    #[error("station {station} has no '{code}' series")]
    MissingSeries { station: String, code: String },

    /// Series violates the strictly-increasing time invariant
    #[error("series is not strictly increasing at sample {index}")]
    UnorderedSeries { index: usize },

    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("unknown station: {0}")]
    UnknownStation(String),

    /// Station record carries no timezone and none was supplied
    #[error("station {0} has no timezone; pass one explicitly")]
    MissingTimezone(String),

    /// Input file could not be read
    #[error("IO: {0}")]
    Io(#[from] io::Error),

    /// Measurement or station JSON was malformed
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Parse an IANA timezone name such as `America/Vancouver`.
pub fn parse_timezone(name: &str) -> Result<Tz, TideError> {
    name.parse::<Tz>()
        .map_err(|_| TideError::UnknownTimezone(name.to_string()))
}
