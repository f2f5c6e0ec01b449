//! # Tide Analysis Pipeline
//!
//! Ties the core modules together into one eagerly computed result for a
//! station and date range.
//!
//! ## Flow
//! 1. **Validate**: reject an empty or reversed range before any fitting
//! 2. **Restrict**: keep only samples inside `[start, end]`
//! 3. **Extrema**: high and low tides of the restricted series
//! 4. **Windows**: per-threshold windows, aligned with the low tides
//! 5. **Events**: one row per low tide with solar context and its windows
//!
//! Nothing is cached between calls. A [`TideAnalysis`] owns its series and
//! the extrema computed from it, so repeated queries against the same value
//! never refit the extrema curve and independent analyses share no state.

use crate::extrema;
use crate::query;
use crate::solar::SolarEvents;
use crate::windows::{self, WindowsByThreshold};
use crate::{Extrema, Extremum, StationContext, TideError, TideSeries, TideWindow};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A series together with its high and low tides.
#[derive(Debug, Clone, PartialEq)]
pub struct TideAnalysis {
    series: TideSeries,
    extrema: Extrema,
}

impl TideAnalysis {
    /// Analyse `series`, computing its extrema up front.
    ///
    /// # Example
    /// ```
    /// use chrono::{Duration, TimeZone};
    /// use chrono_tz::Tz;
    /// use tide_windows_lib::analysis::TideAnalysis;
    /// use tide_windows_lib::synthetic::HarmonicTide;
    ///
    /// let start = Tz::UTC.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap();
    /// let series = HarmonicTide::sine(2.0, 1.5, 44_712.0)
    ///     .sample(start, Duration::hours(48), Duration::minutes(15));
    ///
    /// let analysis = TideAnalysis::new(series);
    /// assert_eq!(analysis.extrema().high.len(), 4);
    /// assert_eq!(analysis.extrema().low.len(), 4);
    /// ```
    pub fn new(series: TideSeries) -> Self {
        if series.len() < extrema::MIN_SAMPLES {
            warn!(
                samples = series.len(),
                needed = extrema::MIN_SAMPLES,
                "series too short to detect high and low tides"
            );
        }
        let extrema = extrema::detect(&series.samples);
        debug!(
            high = extrema.high.len(),
            low = extrema.low.len(),
            "detected extrema"
        );
        Self { series, extrema }
    }

    pub fn series(&self) -> &TideSeries {
        &self.series
    }

    pub fn extrema(&self) -> &Extrema {
        &self.extrema
    }

    pub fn high(&self) -> &[Extremum] {
        &self.extrema.high
    }

    pub fn low(&self) -> &[Extremum] {
        &self.extrema.low
    }

    /// Windows under `threshold`, one per low tide.
    pub fn windows(&self, threshold: f64) -> Vec<TideWindow> {
        self.windows_by_threshold(&[threshold])
            .into_values()
            .next()
            .unwrap_or_default()
    }

    pub fn windows_by_threshold(&self, thresholds: &[f64]) -> WindowsByThreshold {
        windows::windows_by_threshold(&self.series.samples, &self.extrema, thresholds)
    }

    /// Interpolated height at `time`; see [`query::height_at`].
    pub fn height_at(&self, time: DateTime<Tz>) -> Result<f64, TideError> {
        query::height_at(&self.series.samples, time)
    }
}

/// One low tide with its solar context and windows.
#[derive(Debug, Clone, PartialEq)]
pub struct LowTideEvent {
    /// Calendar date of the low tide in the station timezone
    pub date: NaiveDate,
    pub time: DateTime<Tz>,
    pub height: f64,
    pub sunrise: Option<DateTime<Tz>>,
    pub noon: Option<DateTime<Tz>>,
    pub sunset: Option<DateTime<Tz>>,
    /// Window around this low tide for every requested threshold
    pub windows: BTreeMap<OrderedFloat<f64>, TideWindow>,
}

/// Everything derived for one station and range.
#[derive(Debug, Clone, PartialEq)]
pub struct TideReport {
    pub context: StationContext,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    /// Requested thresholds in ascending order, duplicates removed
    pub thresholds: Vec<f64>,
    pub analysis: TideAnalysis,
    pub windows: WindowsByThreshold,
    pub events: Vec<LowTideEvent>,
}

/// Run the full pipeline over `series` for `[start, end]`.
///
/// # Errors
/// [`TideError::InvalidRange`] when `end` is not after `start`. Short series
/// are not an error; they yield empty extrema and a logged warning.
pub fn analyze(
    series: &TideSeries,
    context: &StationContext,
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    thresholds: &[f64],
    solar: &impl SolarEvents,
) -> Result<TideReport, TideError> {
    if end <= start {
        return Err(TideError::InvalidRange { start, end });
    }

    let restricted = series.within(start, end);
    debug!(
        total = series.len(),
        kept = restricted.len(),
        %start,
        %end,
        "restricted series to range"
    );

    let analysis = TideAnalysis::new(restricted);
    let windows = analysis.windows_by_threshold(thresholds);
    let events = low_tide_events(analysis.low(), &windows, context, solar);

    Ok(TideReport {
        context: *context,
        start,
        end,
        thresholds: windows.keys().map(|h| h.into_inner()).collect(),
        analysis,
        windows,
        events,
    })
}

/// Pair each low tide with its solar day and the window at the same index.
pub fn low_tide_events(
    lows: &[Extremum],
    windows: &WindowsByThreshold,
    context: &StationContext,
    solar: &impl SolarEvents,
) -> Vec<LowTideEvent> {
    let tz = context.timezone;
    let local = |t: Option<DateTime<Utc>>| t.map(|t| t.with_timezone(&tz));

    lows.iter()
        .enumerate()
        .map(|(index, low)| {
            let time = low.time.with_timezone(&tz);
            let date = time.date_naive();
            let day = solar.solar_day(date, context.latitude, context.longitude);
            let windows = windows
                .iter()
                .map(|(threshold, list)| {
                    let window = list.get(index).copied().unwrap_or_default();
                    (*threshold, window)
                })
                .collect();

            LowTideEvent {
                date,
                time,
                height: low.height,
                sunrise: local(day.sunrise),
                noon: local(day.noon),
                sunset: local(day.sunset),
                windows,
            }
        })
        .collect()
}
