//! Sunrise, solar noon & sunset (NOAA low-precision solar calculator)
//!
//! Follows the NOAA Global Monitoring Laboratory spreadsheet algorithm.
//! Accuracy: about a minute for latitudes within ±72°; degrades towards the
//! poles, where the sun may not cross the horizon at all (reported as `None`).
//!
//! The tide analysis only consumes these instants, it never derives anything
//! from them, so the calculation sits behind the [`SolarEvents`] trait and can
//! be swapped for another source.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Zenith of the sun's centre at apparent sunrise/sunset: 90° plus refraction
/// and the solar semi-diameter.
const HORIZON_ZENITH_DEG: f64 = 90.833;

/// Sunrise, solar noon and sunset for one date and place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarDay {
    pub sunrise: Option<DateTime<Utc>>,
    pub noon: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
}

/// Source of daily solar events for a location.
///
/// `longitude` is degrees east (negative west), `latitude` degrees north.
pub trait SolarEvents {
    fn solar_day(&self, date: NaiveDate, latitude: f64, longitude: f64) -> SolarDay;
}

/// Default solar event source backed by [`solar_day`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoaaSolarCalculator;

impl SolarEvents for NoaaSolarCalculator {
    fn solar_day(&self, date: NaiveDate, latitude: f64, longitude: f64) -> SolarDay {
        solar_day(date, latitude, longitude)
    }
}

/// Compute the solar day for a civil date at a given place.
///
/// Events are those of the local solar day nearest `date` at `longitude`, so
/// for far-western stations sunset may fall on the next UTC date.
pub fn solar_day(date: NaiveDate, latitude: f64, longitude: f64) -> SolarDay {
    // ---------- 1. Julian century at approximate local noon -----------------
    let days = (date - NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()).num_days() as f64;
    let jd = 2_440_587.5 + days + 0.5 - longitude / 360.0;
    let jc = (jd - 2_451_545.0) / 36_525.0;

    // ---------- 2. Sun's mean elements --------------------------------------
    let mean_long = (280.466_46 + jc * (36_000.769_83 + jc * 0.000_303_2)).rem_euclid(360.0);
    let mean_anom = 357.529_11 + jc * (35_999.050_29 - 0.000_153_7 * jc);
    let eccentricity = 0.016_708_634 - jc * (0.000_042_037 + 0.000_000_126_7 * jc);

    // ---------- 3. Apparent longitude & obliquity ---------------------------
    let m = mean_anom.to_radians();
    let centre = m.sin() * (1.914_602 - jc * (0.004_817 + 0.000_014 * jc))
        + (2.0 * m).sin() * (0.019_993 - 0.000_101 * jc)
        + (3.0 * m).sin() * 0.000_289;
    let omega = (125.04 - 1_934.136 * jc).to_radians();
    let apparent_long = mean_long + centre - 0.005_69 - 0.004_78 * omega.sin();

    let mean_obliquity =
        23.0 + (26.0 + (21.448 - jc * (46.815 + jc * (0.000_59 - jc * 0.001_813))) / 60.0) / 60.0;
    let obliquity = (mean_obliquity + 0.002_56 * omega.cos()).to_radians();

    let declination = (obliquity.sin() * apparent_long.to_radians().sin()).asin();

    // ---------- 4. Equation of time (minutes) -------------------------------
    let y = (obliquity / 2.0).tan().powi(2);
    let l0 = mean_long.to_radians();
    let eq_time = 4.0
        * (y * (2.0 * l0).sin() - 2.0 * eccentricity * m.sin()
            + 4.0 * eccentricity * y * m.sin() * (2.0 * l0).cos()
            - 0.5 * y * y * (4.0 * l0).sin()
            - 1.25 * eccentricity * eccentricity * (2.0 * m).sin())
        .to_degrees();

    // ---------- 5. Hour angle of the horizon crossing -----------------------
    let noon_min = 720.0 - 4.0 * longitude - eq_time;
    let lat = latitude.to_radians();
    let cos_ha = HORIZON_ZENITH_DEG.to_radians().cos() / (lat.cos() * declination.cos())
        - lat.tan() * declination.tan();

    let midnight = date.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
    let at = |minutes: f64| {
        midnight.map(|m| m + Duration::milliseconds((minutes * 60_000.0).round() as i64))
    };

    // Polar day or night: the sun never reaches the horizon.
    if !(-1.0..=1.0).contains(&cos_ha) {
        return SolarDay {
            sunrise: None,
            noon: at(noon_min),
            sunset: None,
        };
    }
    let ha_min = 4.0 * cos_ha.acos().to_degrees();

    SolarDay {
        sunrise: at(noon_min - ha_min),
        noon: at(noon_min),
        sunset: at(noon_min + ha_min),
    }
}
