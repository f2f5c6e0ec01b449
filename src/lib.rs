//! # Tide Windows Core Library
//!
//! This library turns a sparse, irregularly available series of water-level
//! samples for a tide station into the continuous structure of the tide:
//! high/low extrema, and the time windows during which the water stays at or
//! below a chosen height.
//!
//! ## Design Philosophy
//!
//! ### Pure Analysis
//! - **No hidden state**: every analysis is a function of an immutable
//!   [`TideSeries`]; results are computed eagerly into plain structs
//! - **No I/O in the core**: fetching, station lookup and rendering are
//!   collaborators that hand the core a validated series
//! - **Deterministic**: the same series and threshold always give bit-identical
//!   results, so callers may run independent analyses concurrently
//!
//! ### Data Flow
//! 1. **Fit**: [`spline`] builds an interpolating spline through the samples
//! 2. **Extrema**: [`extrema`] finds roots of the spline's derivative and
//!    classifies them as high or low tide
//! 3. **Partition**: [`partition`] cuts the series at every high tide
//! 4. **Windows**: [`windows`] finds where each partition crosses a threshold
//! 5. **Query**: [`query`] answers "height at time t" from the raw samples
//!
//! [`analysis`] runs steps 1-4 over a date range and pairs every low tide
//! with sunrise, solar noon and sunset from [`solar`].
//!
//! ## Core Types
//! - [`Sample`]: a single water-level observation
//! - [`TideSeries`]: an ordered, de-duplicated run of samples
//! - [`Extremum`]: a derived high or low tide
//! - [`TideWindow`]: an under-threshold interval inside one partition
//! - [`StationContext`]: static station attributes passed through to
//!   collaborators

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

// Module declarations
pub mod analysis;
pub mod config;
pub mod error;
pub mod extrema;
pub mod partition;
pub mod query;
pub mod renderer;
pub mod solar;
pub mod spline;
pub mod stations;
pub mod synthetic;
pub mod tide_data;
pub mod windows;

pub use error::TideError;

/// A single water-level observation.
///
/// Heights are metres above chart datum. The timestamp carries the station's
/// timezone so derived events can be reported in local time without a
/// separate conversion step.
///
/// # Example
/// ```
/// use chrono::TimeZone;
/// use chrono_tz::Tz;
/// use tide_windows_lib::Sample;
///
/// let sample = Sample {
///     time: Tz::UTC.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap(),
///     height: 2.0,
/// };
/// assert_eq!(sample.height, 2.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Observation instant in the station timezone
    pub time: DateTime<Tz>,
    /// Water level in metres
    pub height: f64,
}

/// An ordered run of samples for one station.
///
/// Samples are strictly increasing in time with no duplicate timestamps.
/// The analysis modules assume this invariant; [`TideSeries::validate`] is
/// available to collaborators that build series from untrusted input.
///
/// # Example
/// ```
/// use chrono::{Duration, TimeZone};
/// use chrono_tz::Tz;
/// use tide_windows_lib::{Sample, TideSeries};
///
/// let start = Tz::UTC.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap();
/// let series = TideSeries::new(vec![
///     Sample { time: start, height: 1.0 },
///     Sample { time: start + Duration::minutes(15), height: 1.2 },
/// ]);
///
/// assert_eq!(series.len(), 2);
/// assert!(series.validate().is_ok());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TideSeries {
    /// Samples in ascending time order
    pub samples: Vec<Sample>,
}

impl TideSeries {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn heights(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.height).collect()
    }

    /// First and last sample instants, or `None` for an empty series.
    pub fn span(&self) -> Option<(DateTime<Tz>, DateTime<Tz>)> {
        Some((self.samples.first()?.time, self.samples.last()?.time))
    }

    /// Samples inside the inclusive range `[start, end]`.
    pub fn within(&self, start: DateTime<Tz>, end: DateTime<Tz>) -> TideSeries {
        let samples = self
            .samples
            .iter()
            .filter(|s| s.time >= start && s.time <= end)
            .copied()
            .collect();
        TideSeries { samples }
    }

    /// Check the ordering invariant the analysis relies on.
    ///
    /// Returns the index of the first sample that does not come strictly
    /// after its predecessor.
    pub fn validate(&self) -> Result<(), TideError> {
        match self
            .samples
            .windows(2)
            .position(|pair| pair[1].time <= pair[0].time)
        {
            Some(index) => Err(TideError::UnorderedSeries { index: index + 1 }),
            None => Ok(()),
        }
    }
}

/// Whether an extremum is a local maximum or minimum of the tide curve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TideKind {
    High,
    Low,
}

/// A high or low tide derived from the fitted curve.
///
/// Extrema are never observed directly; `time` is a root of the curve's
/// derivative and `height` the curve's value there.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extremum {
    pub time: DateTime<Tz>,
    pub height: f64,
    pub kind: TideKind,
}

/// High and low tides found in one series, each in ascending time order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extrema {
    pub high: Vec<Extremum>,
    pub low: Vec<Extremum>,
}

impl Extrema {
    pub fn is_empty(&self) -> bool {
        self.high.is_empty() && self.low.is_empty()
    }

    /// All extrema merged in time order.
    pub fn chronological(&self) -> Vec<Extremum> {
        let mut all: Vec<Extremum> = self.high.iter().chain(&self.low).copied().collect();
        all.sort_by_key(|e| e.time);
        all
    }
}

/// The interval within one partition during which the interpolated height
/// stays at or below a threshold.
///
/// Either end may be missing: a window that is still open at the partition's
/// right edge has no `end`, one already open at the left edge has no `start`,
/// and a partition that never crosses the threshold has neither.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TideWindow {
    pub start: Option<DateTime<Tz>>,
    pub end: Option<DateTime<Tz>>,
}

impl TideWindow {
    /// A window with neither end resolved.
    pub fn unresolved() -> Self {
        Self::default()
    }

    /// Window length in hours, when both ends are known.
    pub fn duration_hours(&self) -> Option<f64> {
        let (start, end) = (self.start?, self.end?);
        Some((end - start).num_milliseconds() as f64 / 3_600_000.0)
    }
}

/// Static station attributes supplied by the caller.
///
/// The core never mutates this; it only forwards the coordinates to the
/// astronomical collaborator and uses the timezone for reporting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StationContext {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Tz,
}

/// Convert sample instants to seconds since the Unix epoch.
pub(crate) fn epoch_seconds(samples: &[Sample]) -> Vec<f64> {
    samples.iter().map(|s| to_epoch(&s.time)).collect()
}

pub(crate) fn to_epoch(time: &DateTime<Tz>) -> f64 {
    time.timestamp_millis() as f64 / 1000.0
}

/// Convert epoch seconds back to an instant in `tz`, rounded to the
/// millisecond.
pub(crate) fn from_epoch(seconds: f64, tz: &Tz) -> Option<DateTime<Tz>> {
    if !seconds.is_finite() {
        return None;
    }
    let millis = (seconds * 1000.0).round() as i64;
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|t| t.with_timezone(tz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn start() -> DateTime<Tz> {
        Tz::UTC.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_window_duration() {
        let window = TideWindow {
            start: Some(start()),
            end: Some(start() + Duration::minutes(90)),
        };
        assert_eq!(window.duration_hours(), Some(1.5));

        let open = TideWindow {
            start: Some(start()),
            end: None,
        };
        assert_eq!(open.duration_hours(), None);
        assert_eq!(TideWindow::unresolved().duration_hours(), None);
    }

    #[test]
    fn test_window_duration_spans_days() {
        let window = TideWindow {
            start: Some(start()),
            end: Some(start() + Duration::hours(30)),
        };
        assert_eq!(window.duration_hours(), Some(30.0));
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let series = TideSeries::new(vec![
            Sample { time: start(), height: 1.0 },
            Sample { time: start(), height: 1.1 },
        ]);
        match series.validate() {
            Err(TideError::UnorderedSeries { index }) => assert_eq!(index, 1),
            other => panic!("expected unordered error, got {other:?}"),
        }
    }

    #[test]
    fn test_within_is_inclusive() {
        let series = TideSeries::new(
            (0..5)
                .map(|i| Sample {
                    time: start() + Duration::minutes(15 * i),
                    height: i as f64,
                })
                .collect(),
        );
        let sub = series.within(start() + Duration::minutes(15), start() + Duration::minutes(45));
        assert_eq!(sub.heights(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_epoch_roundtrip_keeps_timezone() {
        let tz: Tz = "America/Vancouver".parse().unwrap();
        let t = start().with_timezone(&tz);
        let back = from_epoch(to_epoch(&t), &tz).unwrap();
        assert_eq!(back, t);
        assert_eq!(back.timezone(), tz);
        assert!(from_epoch(f64::NAN, &tz).is_none());
    }
}
