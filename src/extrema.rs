//! # High and Low Tide Detection
//!
//! High and low tides are never sampled directly; they sit wherever the
//! fitted tide curve turns around. This module fits a quartic spline (so its
//! derivative is a smooth cubic), finds every root of the derivative, and keeps
//! the roots where the slope genuinely changes sign.
//!
//! ## Classification
//! Each candidate root `t` is checked a quarter hour either side:
//! - slope falling → rising (`f'(t-15m) < 0 < f'(t+15m)`): **low tide**
//! - slope rising → falling (`f'(t-15m) > 0 > f'(t+15m)`): **high tide**
//! - anything else is an inflection or noise and is dropped
//!
//! Series shorter than [`MIN_SAMPLES`] yield no extrema at all. That is a
//! valid outcome for short or noisy ranges, not an error.

use crate::spline::Spline;
use crate::{epoch_seconds, from_epoch, Extrema, Extremum, Sample, TideKind};
use tracing::debug;

/// Spline degree used for extrema detection (reduced for short series).
pub const EXTREMA_DEGREE: usize = 4;

/// Fewest samples for which extrema are attempted.
pub const MIN_SAMPLES: usize = 5;

/// Offset either side of a candidate root at which the slope is sampled.
pub const CLASSIFY_OFFSET_SECS: f64 = 15.0 * 60.0;

/// Find and classify the high and low tides of `samples`.
///
/// Both lists come back in ascending time order; times are reported in the
/// timezone of the first sample.
///
/// # Example
/// ```
/// use chrono::{Duration, TimeZone};
/// use chrono_tz::Tz;
/// use tide_windows_lib::{extrema, Sample};
///
/// let start = Tz::UTC.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap();
/// let samples: Vec<Sample> = (0..4)
///     .map(|i| Sample { time: start + Duration::minutes(15 * i), height: 1.0 })
///     .collect();
///
/// // Too short to fit: empty, not an error.
/// assert!(extrema::detect(&samples).is_empty());
/// ```
pub fn detect(samples: &[Sample]) -> Extrema {
    if samples.len() < MIN_SAMPLES {
        return Extrema::default();
    }
    let tz = samples[0].time.timezone();

    let timestamps = epoch_seconds(samples);
    let heights: Vec<f64> = samples.iter().map(|s| s.height).collect();
    let degree = EXTREMA_DEGREE.min(samples.len() - 1);

    let Some(curve) = Spline::interpolate(&timestamps, &heights, degree) else {
        return Extrema::default();
    };
    let slope = curve.derivative();
    let candidates = slope.roots();

    let mut extrema = Extrema::default();
    for root in &candidates {
        let Some(kind) = classify(&slope, *root) else {
            continue;
        };
        let Some(time) = from_epoch(*root, &tz) else {
            continue;
        };
        let extremum = Extremum {
            time,
            height: curve.eval(*root),
            kind,
        };
        match kind {
            TideKind::High => extrema.high.push(extremum),
            TideKind::Low => extrema.low.push(extremum),
        }
    }

    debug!(
        samples = samples.len(),
        candidates = candidates.len(),
        high = extrema.high.len(),
        low = extrema.low.len(),
        "classified extrema"
    );
    extrema
}

/// Decide whether a root of the slope is a high, a low, or neither.
fn classify(slope: &Spline, root: f64) -> Option<TideKind> {
    let before = slope.eval(root - CLASSIFY_OFFSET_SECS);
    let after = slope.eval(root + CLASSIFY_OFFSET_SECS);
    if before < 0.0 && 0.0 < after {
        Some(TideKind::Low)
    } else if before > 0.0 && 0.0 > after {
        Some(TideKind::High)
    } else {
        None
    }
}
