//! # Low-Water Window Detection
//!
//! A window is the stretch of one partition during which the interpolated
//! water level is at or below a threshold. Partitions are bounded by high
//! tides, so each holds at most one dip below any sensible threshold.
//!
//! ## Resolution
//! The partition is refit as `g(t) = f(t) - h` with a cubic spline and the
//! roots of `g` are classified by probing one minute earlier: a root with the
//! curve above the threshold just before it opens the window, otherwise it
//! closes one.
//!
//! | roots | result                                  |
//! |-------|-----------------------------------------|
//! | 2     | `start` = earlier, `end` = later        |
//! | 1     | open-ended on whichever side is missing |
//! | other | neither end resolved                    |
//!
//! ## Alignment Across Thresholds
//! Callers usually want one window per low tide. When the first high tide of
//! the range comes before the first low tide, the first partition has no low
//! tide of its own, so [`windows_by_threshold`] drops that partition's window
//! from every threshold's list.

use crate::partition;
use crate::spline::Spline;
use crate::{epoch_seconds, from_epoch, Extrema, Sample, TideWindow};
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;
use tracing::debug;

/// Spline degree used for threshold crossings (reduced for short partitions).
pub const WINDOW_DEGREE: usize = 3;

/// Partitions with this many samples or fewer are left unresolved.
pub const MAX_UNRESOLVED_SAMPLES: usize = 3;

/// How far before a crossing the curve is sampled to tell starts from ends.
pub const DIRECTION_OFFSET_SECS: f64 = 60.0;

/// Windows per threshold, keyed by the threshold height in metres.
pub type WindowsByThreshold = BTreeMap<OrderedFloat<f64>, Vec<TideWindow>>;

/// Find the under-threshold window of one partition.
///
/// # Example
/// ```
/// use chrono::{Duration, TimeZone};
/// use chrono_tz::Tz;
/// use tide_windows_lib::{windows, Sample};
///
/// let start = Tz::UTC.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap();
/// let partition: Vec<Sample> = (0..3)
///     .map(|i| Sample { time: start + Duration::minutes(15 * i), height: 1.0 })
///     .collect();
///
/// // Three samples cannot resolve a crossing.
/// let window = windows::detect(&partition, 2.0);
/// assert!(window.start.is_none() && window.end.is_none());
/// ```
pub fn detect(partition: &[Sample], threshold: f64) -> TideWindow {
    if partition.len() <= MAX_UNRESOLVED_SAMPLES {
        return TideWindow::unresolved();
    }
    let tz = partition[0].time.timezone();

    let timestamps = epoch_seconds(partition);
    let offsets: Vec<f64> = partition.iter().map(|s| s.height - threshold).collect();
    let degree = WINDOW_DEGREE.min(partition.len() - 1);

    let Some(curve) = Spline::interpolate(&timestamps, &offsets, degree) else {
        return TideWindow::unresolved();
    };
    let roots = curve.roots();
    let at = |root: f64| from_epoch(root, &tz);

    match roots.as_slice() {
        [first, second] => TideWindow {
            start: at(*first),
            end: at(*second),
        },
        [only] if curve.eval(only - DIRECTION_OFFSET_SECS) > 0.0 => TideWindow {
            start: at(*only),
            end: None,
        },
        [only] => TideWindow {
            start: None,
            end: at(*only),
        },
        _ => TideWindow::unresolved(),
    }
}

/// One window per high-tide partition of `samples`.
pub fn detect_all(samples: &[Sample], extrema: &Extrema, threshold: f64) -> Vec<TideWindow> {
    let boundaries: Vec<_> = extrema.high.iter().map(|e| e.time).collect();
    partition::split_at(samples, &boundaries)
        .into_iter()
        .map(|part| detect(part, threshold))
        .collect()
}

/// Windows for every threshold, aligned so index `i` belongs to low tide `i`.
///
/// When the first high tide precedes the first low tide, the first
/// partition's window is dropped from every list.
pub fn windows_by_threshold(
    samples: &[Sample],
    extrema: &Extrema,
    thresholds: &[f64],
) -> WindowsByThreshold {
    let drop_first = first_low_missing(extrema);
    if drop_first {
        debug!("first high tide precedes first low tide; dropping leading partition");
    }

    thresholds
        .iter()
        .map(|&threshold| {
            let mut windows = detect_all(samples, extrema, threshold);
            if drop_first && !windows.is_empty() {
                windows.remove(0);
            }
            (OrderedFloat(threshold), windows)
        })
        .collect()
}

fn first_low_missing(extrema: &Extrema) -> bool {
    match (extrema.high.first(), extrema.low.first()) {
        (Some(high), Some(low)) => high.time < low.time,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Extremum, TideKind};
    use approx::assert_abs_diff_eq;
    use chrono::{DateTime, Duration, TimeZone};
    use chrono_tz::Tz;

    fn start() -> DateTime<Tz> {
        Tz::UTC.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap()
    }

    fn series(n: i64, height: impl Fn(f64) -> f64) -> Vec<Sample> {
        (0..n)
            .map(|i| Sample {
                time: start() + Duration::minutes(15 * i),
                height: height(i as f64 * 900.0),
            })
            .collect()
    }

    fn hours(t: Option<DateTime<Tz>>) -> f64 {
        (t.unwrap() - start()).num_milliseconds() as f64 / 3_600_000.0
    }

    /// Parabolic trough bottoming out at 0 m after 3h, 6h long.
    fn trough() -> Vec<Sample> {
        series(25, |t| ((t - 10_800.0) / 3600.0).powi(2))
    }

    #[test]
    fn test_tiny_partitions_are_unresolved() {
        for n in 0..=3 {
            let window = detect(&series(n, |_| 0.0), 1.0);
            assert_eq!(window, TideWindow::unresolved(), "n = {n}");
        }
    }

    #[test]
    fn test_two_crossings_give_full_window() {
        let window = detect(&trough(), 4.0);
        assert_abs_diff_eq!(hours(window.start), 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(hours(window.end), 5.0, epsilon = 1e-4);
        assert_abs_diff_eq!(window.duration_hours().unwrap(), 4.0, epsilon = 1e-4);
    }

    #[test]
    fn test_falling_crossing_opens_window() {
        // Falls through 4 m at 1h and is still falling at the right edge.
        let samples = series(13, |t| ((t - 10_800.0) / 3600.0).powi(2));
        let window = detect(&samples, 4.0);
        assert_abs_diff_eq!(hours(window.start), 1.0, epsilon = 1e-4);
        assert!(window.end.is_none());
    }

    #[test]
    fn test_rising_crossing_closes_window() {
        let samples: Vec<Sample> = trough().into_iter().skip(12).collect();
        let window = detect(&samples, 4.0);
        assert!(window.start.is_none());
        assert_abs_diff_eq!(hours(window.end), 5.0, epsilon = 1e-4);
    }

    #[test]
    fn test_no_crossing_is_unresolved() {
        assert_eq!(detect(&trough(), -1.0), TideWindow::unresolved());
        assert_eq!(detect(&trough(), 100.0), TideWindow::unresolved());
    }

    #[test]
    fn test_many_crossings_are_unresolved() {
        // Crosses zero near 6.3h, 13.1h and 19.6h inside a single run.
        let samples = series(97, |t| (t / 7200.0).sin());
        assert_eq!(detect(&samples, 0.0), TideWindow::unresolved());
        assert_eq!(detect(&samples, 0.5), TideWindow::unresolved());
    }

    #[test]
    fn test_windows_nest_by_threshold() {
        let low = detect(&trough(), 1.0);
        let high = detect(&trough(), 4.0);
        assert!(high.start.unwrap() <= low.start.unwrap());
        assert!(low.end.unwrap() <= high.end.unwrap());
    }

    fn extremum(hours: i64, kind: TideKind) -> Extremum {
        Extremum {
            time: start() + Duration::hours(hours),
            height: 0.0,
            kind,
        }
    }

    #[test]
    fn test_leading_partition_dropped_when_first_low_missing() {
        let samples = series(97, |t| (t / 7200.0).sin());
        let extrema = Extrema {
            high: vec![extremum(3, TideKind::High), extremum(15, TideKind::High)],
            low: vec![extremum(9, TideKind::Low), extremum(21, TideKind::Low)],
        };
        let by_threshold = windows_by_threshold(&samples, &extrema, &[0.5, 1.5]);
        assert_eq!(by_threshold.len(), 2);
        for windows in by_threshold.values() {
            assert_eq!(windows.len(), 2);
        }
    }

    #[test]
    fn test_leading_partition_kept_when_low_comes_first() {
        let samples = series(97, |t| (t / 7200.0).sin());
        let extrema = Extrema {
            high: vec![extremum(9, TideKind::High)],
            low: vec![extremum(3, TideKind::Low), extremum(15, TideKind::Low)],
        };
        let by_threshold = windows_by_threshold(&samples, &extrema, &[0.5]);
        assert_eq!(by_threshold[&OrderedFloat(0.5)].len(), 2);
    }

    #[test]
    fn test_no_thresholds_no_windows() {
        let samples = series(20, |_| 1.0);
        assert!(windows_by_threshold(&samples, &Extrema::default(), &[]).is_empty());
    }
}
