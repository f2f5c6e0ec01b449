//! # Synthetic Harmonic Tides
//!
//! Generates water-level series from a sum of sinusoidal constituents. Used
//! by the CLI's demo mode and by tests that need a tide with known extrema.
//!
//! ## Model
//!
//! `height(t) = mean + Σ amplitude·sin(2π·(t - start)/period + phase)`
//!
//! ### Default Demo Tide
//! Two constituents give a realistic spring–neap flavoured curve:
//! - **M2** (principal lunar, 12.42 h): dominant semidiurnal term
//! - **S2** (principal solar, 12.00 h): beats against M2
//!
//! Samples are laid on a fixed cadence from the start instant, inclusive of
//! both ends when the span is a multiple of the cadence.

use crate::{Sample, TideSeries};
use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use std::f64::consts::TAU;

/// Nominal cadence of water-level predictions.
pub const DEFAULT_CADENCE_MINUTES: i64 = 15;

/// One sinusoidal tidal constituent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constituent {
    /// Half the peak-to-trough range, in metres
    pub amplitude: f64,
    /// Period in seconds
    pub period_secs: f64,
    /// Phase at the series start, in radians
    pub phase: f64,
}

/// A mean water level plus a set of constituents.
#[derive(Debug, Clone, PartialEq)]
pub struct HarmonicTide {
    pub mean: f64,
    pub constituents: Vec<Constituent>,
}

impl HarmonicTide {
    /// A single pure sine around `mean`.
    pub fn sine(mean: f64, amplitude: f64, period_secs: f64) -> Self {
        Self {
            mean,
            constituents: vec![Constituent {
                amplitude,
                period_secs,
                phase: 0.0,
            }],
        }
    }

    /// Two-constituent M2 + S2 demo tide with a 2.4 m mean level.
    pub fn m2_s2() -> Self {
        Self {
            mean: 2.4,
            constituents: vec![
                Constituent {
                    amplitude: 1.4,
                    period_secs: 12.42 * 3600.0,
                    phase: 0.0,
                },
                Constituent {
                    amplitude: 0.3,
                    period_secs: 12.0 * 3600.0,
                    phase: 1.1,
                },
            ],
        }
    }

    /// Height `elapsed_secs` after the series start.
    pub fn height(&self, elapsed_secs: f64) -> f64 {
        self.mean
            + self
                .constituents
                .iter()
                .map(|c| c.amplitude * (TAU * elapsed_secs / c.period_secs + c.phase).sin())
                .sum::<f64>()
    }

    /// Sample the tide every `cadence` from `start` through `start + span`.
    pub fn sample(&self, start: DateTime<Tz>, span: Duration, cadence: Duration) -> TideSeries {
        let step = cadence.num_seconds().max(1);
        let steps = span.num_seconds().max(0) / step;
        let mut samples = Vec::with_capacity(steps as usize + 1);
        for i in 0..=steps {
            let elapsed = i * step;
            samples.push(Sample {
                time: start + Duration::seconds(elapsed),
                height: self.height(elapsed as f64),
            });
        }
        TideSeries::new(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Tz> {
        Tz::UTC.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_sine_sampling_cadence_and_count() {
        let tide = HarmonicTide::sine(2.0, 1.5, 44_712.0);
        let series = tide.sample(start(), Duration::hours(48), Duration::minutes(15));

        assert_eq!(series.len(), 193);
        assert!(series.validate().is_ok());
        for pair in series.samples.windows(2) {
            assert_eq!(pair[1].time - pair[0].time, Duration::minutes(15));
        }
        assert_eq!(series.samples[0].height, 2.0);
    }

    #[test]
    fn test_sine_range() {
        let tide = HarmonicTide::sine(2.0, 1.5, 44_712.0);
        let heights = tide
            .sample(start(), Duration::hours(24), Duration::minutes(15))
            .heights();
        let max = heights.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = heights.iter().cloned().fold(f64::INFINITY, f64::min);
        assert!(max <= 3.5 && max > 3.49, "max {max}");
        assert!(min >= 0.5 && min < 0.51, "min {min}");
    }

    #[test]
    fn test_demo_tide_is_realistic() {
        let series = HarmonicTide::m2_s2().sample(start(), Duration::hours(24), Duration::minutes(15));
        let heights = series.heights();
        let max = heights.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = heights.iter().cloned().fold(f64::INFINITY, f64::min);
        let range = max - min;
        assert!((2.0..=3.5).contains(&range), "range {range}");
        assert!(min > 0.0, "demo tide should stay above datum, min {min}");
    }

    #[test]
    fn test_empty_span_gives_single_sample() {
        let series = HarmonicTide::m2_s2().sample(start(), Duration::zero(), Duration::minutes(15));
        assert_eq!(series.len(), 1);
    }
}
