//! # Series Partitioning
//!
//! Cuts a sample series into contiguous runs bounded by high tides, so that
//! each run holds (at most) one low tide and its surrounding ebb and flood.

use crate::Sample;
use chrono::DateTime;
use chrono_tz::Tz;

/// Split `samples` at each boundary instant.
///
/// A cut is made before the first sample strictly later than the boundary.
/// Boundaries that would produce an empty run (no sample after the previous
/// cut) are skipped. The final run holds everything after the last cut and is
/// always emitted, so the result has one more entry than the number of
/// effective boundaries.
///
/// # Example
/// ```
/// use chrono::{Duration, TimeZone};
/// use chrono_tz::Tz;
/// use tide_windows_lib::{partition, Sample};
///
/// let start = Tz::UTC.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap();
/// let samples: Vec<Sample> = (0..6)
///     .map(|i| Sample { time: start + Duration::minutes(15 * i), height: 0.0 })
///     .collect();
///
/// let parts = partition::split_at(&samples, &[start + Duration::minutes(20)]);
/// assert_eq!(parts.iter().map(|p| p.len()).collect::<Vec<_>>(), vec![2, 4]);
/// ```
pub fn split_at<'a>(samples: &'a [Sample], boundaries: &[DateTime<Tz>]) -> Vec<&'a [Sample]> {
    let mut partitions = Vec::with_capacity(boundaries.len() + 1);
    let mut prev = 0;
    for boundary in boundaries {
        let idx = samples.partition_point(|s| s.time <= *boundary);
        if idx <= prev {
            continue;
        }
        partitions.push(&samples[prev..idx]);
        prev = idx;
    }
    partitions.push(&samples[prev..]);
    partitions
}
