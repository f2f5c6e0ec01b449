//! # Point-in-Time Height Query
//!
//! Answers "how high is the water at time `t`?" from the raw samples. Queries
//! inside the series span are interpolated with a cubic spline; very short
//! series fall back to the nearest sample; queries outside the span fail,
//! since the curve is never extrapolated for callers.

use crate::spline::Spline;
use crate::{epoch_seconds, to_epoch, Sample, TideError};
use chrono::DateTime;
use chrono_tz::Tz;
use tracing::warn;

/// Spline degree used for point queries (reduced for short series).
pub const QUERY_DEGREE: usize = 3;

/// Series shorter than this answer with the nearest sample instead of a fit.
pub const MIN_INTERPOLATION_SAMPLES: usize = 4;

/// Interpolated height at `time`.
///
/// # Errors
/// - [`TideError::InsufficientData`] for an empty series
/// - [`TideError::OutOfRange`] when `time` lies outside the first..last sample
///
/// # Example
/// ```
/// use chrono::{Duration, TimeZone};
/// use chrono_tz::Tz;
/// use tide_windows_lib::{query, Sample};
///
/// let start = Tz::UTC.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap();
/// let samples: Vec<Sample> = (0..8)
///     .map(|i| Sample { time: start + Duration::minutes(15 * i), height: 0.1 * i as f64 })
///     .collect();
///
/// let h = query::height_at(&samples, start + Duration::minutes(20)).unwrap();
/// assert!((h - 0.1333).abs() < 1e-3);
/// assert!(query::height_at(&samples, start - Duration::seconds(1)).is_err());
/// ```
pub fn height_at(samples: &[Sample], time: DateTime<Tz>) -> Result<f64, TideError> {
    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return Err(TideError::InsufficientData { needed: 1, got: 0 });
    };
    if time < first.time || time > last.time {
        return Err(TideError::OutOfRange {
            time,
            first: first.time,
            last: last.time,
        });
    }

    let target = to_epoch(&time);
    if samples.len() < MIN_INTERPOLATION_SAMPLES {
        warn!(
            samples = samples.len(),
            "too few samples to interpolate; using nearest sample"
        );
        return Ok(nearest(samples, target));
    }

    let timestamps = epoch_seconds(samples);
    let heights: Vec<f64> = samples.iter().map(|s| s.height).collect();
    let degree = QUERY_DEGREE.min(samples.len() - 1);
    match Spline::interpolate(&timestamps, &heights, degree) {
        Some(curve) => Ok(curve.eval(target)),
        None => Ok(nearest(samples, target)),
    }
}

/// Height of the sample closest in time to `target`; earliest wins ties.
fn nearest(samples: &[Sample], target: f64) -> f64 {
    samples
        .iter()
        .map(|s| ((to_epoch(&s.time) - target).abs(), s.height))
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map_or(f64::NAN, |(_, height)| height)
}
