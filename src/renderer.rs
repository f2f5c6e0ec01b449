//! # Tide Report Rendering
//!
//! Presentation of a [`TideReport`] for terminals and for other programs.
//! Nothing here feeds back into the analysis; rounding and labelling happen
//! only at this edge.
//!
//! ## Outputs
//! - **ASCII chart**: the sampled curve with high (`H`) and low (`L`) tides
//! - **Events table**: one line per low tide with sun times and windows
//! - **CSV**: the events table flattened to one column per threshold field
//! - **JSON**: extrema, windows and events, with per-threshold lists in
//!   ascending threshold order and tagged with a `"<h>m"` label
//!
//! Timestamps are RFC 3339 with seconds, in the station timezone. Heights and
//! durations are rounded to two decimals.

use crate::analysis::{LowTideEvent, TideReport};
use crate::{to_epoch, Extrema, Extremum, TideError, TideKind, TideSeries, TideWindow};
use chrono::{DateTime, SecondsFormat};
use chrono_tz::Tz;
use serde::Serialize;
use std::fmt::Write as _;
use std::io;

const ROWS: usize = 20;
const Y_AXIS_WIDTH: usize = 5; // Space for Y-axis labels
const MAX_COLUMNS: usize = 96;
const EMPTY_CELL: &str = "--";

/// Label used for a threshold in column names and JSON keys, e.g. `1.5m`.
pub fn threshold_label(threshold: f64) -> String {
    format!("{threshold}m")
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn timestamp(time: &DateTime<Tz>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn clock(time: Option<DateTime<Tz>>) -> String {
    time.map_or_else(|| EMPTY_CELL.to_string(), |t| t.format("%H:%M").to_string())
}

/// Format an axis label in metres: `+1`, `+1.5`, ` 0 `, `-0.5`.
fn format_height(metres: f64) -> String {
    if metres == 0.0 {
        " 0 ".to_string()
    } else if metres > 0.0 {
        if metres.fract() == 0.0 {
            format!("+{:.0}", metres)
        } else {
            format!("+{:.1}", metres)
        }
    } else if metres.fract() == 0.0 {
        format!("{:.0}", metres)
    } else {
        format!("{:.1}", metres)
    }
}

/// Draw the series as an ASCII chart with high and low tides marked.
///
/// Long series are thinned to at most 96 columns by taking every n-th sample.
pub fn draw_ascii(series: &TideSeries, extrema: &Extrema) -> String {
    let (Some(first), Some(last)) = (series.samples.first(), series.samples.last()) else {
        return "(no samples)\n".to_string();
    };

    let stride = series.len().div_ceil(MAX_COLUMNS).max(1);
    let columns: Vec<_> = series.samples.iter().step_by(stride).collect();
    let column_count = columns.len();

    let (min_height, max_height) = series
        .samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), sample| {
            (min.min(sample.height), max.max(sample.height))
        });
    let range = max_height - min_height;

    let height_to_row = |height: f64| {
        let normalized = if range > 0.0 {
            (height - min_height) / range
        } else {
            0.5
        };
        // Casts saturate, so heights above the maximum land on row 0.
        (((1.0 - normalized) * (ROWS as f64 - 1.0)).round() as usize).min(ROWS - 1)
    };

    let mut grid = vec![vec![' '; column_count + Y_AXIS_WIDTH]; ROWS];

    // Y-axis labels on whole or half metres
    let step = if range > 4.0 { 1.0 } else { 0.5 };
    let mut label_height = (min_height / step).ceil() * step;
    while label_height <= max_height {
        let row = height_to_row(label_height);
        let label = format!("{:<width$}", format_height(label_height), width = Y_AXIS_WIDTH - 1);
        for (i, ch) in label.chars().take(Y_AXIS_WIDTH - 1).enumerate() {
            grid[row][i] = ch;
        }
        grid[row][Y_AXIS_WIDTH - 1] = '│';
        label_height += step;
    }

    for (column, sample) in columns.iter().enumerate() {
        grid[height_to_row(sample.height)][column + Y_AXIS_WIDTH] = '•';
    }

    let t0 = to_epoch(&first.time);
    let span = to_epoch(&last.time) - t0;
    let extremum_column = |extremum: &Extremum| {
        if span <= 0.0 {
            return 0;
        }
        let fraction = ((to_epoch(&extremum.time) - t0) / span).clamp(0.0, 1.0);
        (fraction * (column_count - 1) as f64).round() as usize
    };
    for extremum in extrema.high.iter().chain(&extrema.low) {
        let marker = match extremum.kind {
            TideKind::High => 'H',
            TideKind::Low => 'L',
        };
        grid[height_to_row(extremum.height)][extremum_column(extremum) + Y_AXIS_WIDTH] = marker;
    }

    let mut out = String::new();
    for row in grid {
        let line: String = row.into_iter().collect();
        out.push_str(line.trim_end());
        out.push('\n');
    }

    // Day boundaries below the chart
    let padding = " ".repeat(Y_AXIS_WIDTH);
    let markers: String = columns
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            let new_day = i > 0 && sample.time.date_naive() != columns[i - 1].time.date_naive();
            if new_day {
                '|'
            } else {
                ' '
            }
        })
        .collect();
    let _ = writeln!(out, "{padding}{}", markers.trim_end());

    let left = first.time.format("%m-%d %H:%M").to_string();
    let right = last.time.format("%m-%d %H:%M").to_string();
    let gap = column_count.saturating_sub(left.len() + right.len()).max(1);
    let _ = writeln!(out, "{padding}{left}{}{right}", " ".repeat(gap));
    out
}

fn window_cell(window: &TideWindow) -> String {
    let hours = window
        .duration_hours()
        .map(|h| format!(" ({:.2}h)", round2(h)))
        .unwrap_or_default();
    format!("{}-{}{}", clock(window.start), clock(window.end), hours)
}

/// Human-readable table of low tides, one row per event.
pub fn events_table(report: &TideReport) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "{:<10}  {:>6}  {:<5}  {:<5}  {:<5}  {:<5}",
        "Date", "Low", "Time", "Rise", "Noon", "Set"
    );
    for threshold in &report.thresholds {
        let _ = write!(out, "  {:<20}", format!("≤{}", threshold_label(*threshold)));
    }
    out.push('\n');

    if report.events.is_empty() {
        out.push_str("(no low tides in range)\n");
        return out;
    }

    for event in &report.events {
        let _ = write!(
            out,
            "{:<10}  {:>5.2}m  {:<5}  {:<5}  {:<5}  {:<5}",
            event.date.format("%Y-%m-%d"),
            round2(event.height),
            clock(Some(event.time)),
            clock(event.sunrise),
            clock(event.noon),
            clock(event.sunset)
        );
        for window in event.windows.values() {
            let _ = write!(out, "  {:<20}", window_cell(window));
        }
        out.push('\n');
    }
    out
}

/// Column names of the flattened events table.
pub fn csv_header(thresholds: &[f64]) -> Vec<String> {
    let mut header: Vec<String> = [
        "low_tide_date",
        "low_tide_height_m",
        "low_tide_time",
        "sunrise",
        "noon",
        "sunset",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    for threshold in thresholds {
        let label = threshold_label(*threshold);
        header.push(format!("window_start_{label}"));
        header.push(format!("window_end_{label}"));
        header.push(format!("hours_under_{label}"));
    }
    header
}

fn csv_row(event: &LowTideEvent) -> Vec<String> {
    let optional = |t: Option<DateTime<Tz>>| t.as_ref().map(timestamp).unwrap_or_default();
    let mut row = vec![
        event.date.format("%Y-%m-%d").to_string(),
        format!("{:.2}", round2(event.height)),
        timestamp(&event.time),
        optional(event.sunrise),
        optional(event.noon),
        optional(event.sunset),
    ];
    for window in event.windows.values() {
        row.push(optional(window.start));
        row.push(optional(window.end));
        row.push(
            window
                .duration_hours()
                .map(|h| format!("{:.2}", round2(h)))
                .unwrap_or_default(),
        );
    }
    row
}

/// Write the events table as CSV with a header row.
pub fn write_csv<W: io::Write>(report: &TideReport, writer: W) -> Result<(), TideError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(csv_header(&report.thresholds))?;
    for event in &report.events {
        csv.write_record(csv_row(event))?;
    }
    csv.flush()?;
    Ok(())
}

/// A high or low tide as serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TideRow {
    pub time: String,
    pub height: f64,
}

/// A window as serialized; absent ends are `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowRow {
    pub start: Option<String>,
    pub end: Option<String>,
    pub hours: Option<f64>,
}

/// All windows for one threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdWindows {
    pub threshold: f64,
    pub label: String,
    pub windows: Vec<WindowRow>,
}

/// One threshold's window beside a low tide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventWindow {
    pub threshold: f64,
    pub label: String,
    #[serde(flatten)]
    pub window: WindowRow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRow {
    pub date: String,
    pub time: String,
    pub height: f64,
    pub sunrise: Option<String>,
    pub noon: Option<String>,
    pub sunset: Option<String>,
    pub windows: Vec<EventWindow>,
}

/// JSON view of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDocument {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub start: String,
    pub end: String,
    pub high: Vec<TideRow>,
    pub low: Vec<TideRow>,
    pub windows: Vec<ThresholdWindows>,
    pub events: Vec<EventRow>,
}

impl From<&Extremum> for TideRow {
    fn from(extremum: &Extremum) -> Self {
        TideRow {
            time: timestamp(&extremum.time),
            height: round2(extremum.height),
        }
    }
}

impl From<&TideWindow> for WindowRow {
    fn from(window: &TideWindow) -> Self {
        WindowRow {
            start: window.start.as_ref().map(timestamp),
            end: window.end.as_ref().map(timestamp),
            hours: window.duration_hours().map(round2),
        }
    }
}

impl From<&LowTideEvent> for EventRow {
    fn from(event: &LowTideEvent) -> Self {
        EventRow {
            date: event.date.format("%Y-%m-%d").to_string(),
            time: timestamp(&event.time),
            height: round2(event.height),
            sunrise: event.sunrise.as_ref().map(timestamp),
            noon: event.noon.as_ref().map(timestamp),
            sunset: event.sunset.as_ref().map(timestamp),
            windows: event
                .windows
                .iter()
                .map(|(h, w)| EventWindow {
                    threshold: h.into_inner(),
                    label: threshold_label(h.into_inner()),
                    window: WindowRow::from(w),
                })
                .collect(),
        }
    }
}

impl From<&TideReport> for ReportDocument {
    fn from(report: &TideReport) -> Self {
        let extrema = report.analysis.extrema();
        ReportDocument {
            latitude: report.context.latitude,
            longitude: report.context.longitude,
            timezone: report.context.timezone.name().to_string(),
            start: timestamp(&report.start),
            end: timestamp(&report.end),
            high: extrema.high.iter().map(TideRow::from).collect(),
            low: extrema.low.iter().map(TideRow::from).collect(),
            windows: report
                .windows
                .iter()
                .map(|(h, list)| ThresholdWindows {
                    threshold: h.into_inner(),
                    label: threshold_label(h.into_inner()),
                    windows: list.iter().map(WindowRow::from).collect(),
                })
                .collect(),
            events: report.events.iter().map(EventRow::from).collect(),
        }
    }
}

/// Pretty-printed JSON document for a report.
pub fn to_json(report: &TideReport) -> Result<String, TideError> {
    Ok(serde_json::to_string_pretty(&ReportDocument::from(report))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::solar::NoaaSolarCalculator;
    use crate::synthetic::HarmonicTide;
    use crate::StationContext;
    use chrono::{Duration, TimeZone};

    fn report() -> TideReport {
        report_with(&[1.5, 2.0])
    }

    fn report_with(thresholds: &[f64]) -> TideReport {
        let start = Tz::UTC.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap();
        let series = HarmonicTide::sine(2.0, 1.5, 44_712.0).sample(
            start,
            Duration::hours(48),
            Duration::minutes(15),
        );
        let context = StationContext {
            latitude: 49.28,
            longitude: -123.12,
            timezone: Tz::UTC,
        };
        analyze(
            &series,
            &context,
            start,
            start + Duration::hours(48),
            thresholds,
            &NoaaSolarCalculator,
        )
        .unwrap()
    }

    #[test]
    fn test_format_height() {
        // Test zero
        assert_eq!(format_height(0.0), " 0 ");

        // Test positive values
        assert_eq!(format_height(1.0), "+1");
        assert_eq!(format_height(1.5), "+1.5");

        // Test negative values
        assert_eq!(format_height(-1.0), "-1");
        assert_eq!(format_height(-0.5), "-0.5");
    }

    #[test]
    fn test_threshold_labels() {
        assert_eq!(threshold_label(1.5), "1.5m");
        assert_eq!(threshold_label(2.0), "2m");
    }

    #[test]
    fn test_ascii_chart_marks_extrema() {
        let report = report();
        let chart = draw_ascii(report.analysis.series(), report.analysis.extrema());
        assert_eq!(chart.matches('H').count(), 4);
        assert_eq!(chart.matches('L').count(), 4);
        assert!(chart.contains("08-01 00:00"));
        assert!(chart.contains("08-03 00:00"));
    }

    #[test]
    fn test_ascii_chart_handles_empty_and_flat() {
        assert_eq!(
            draw_ascii(&TideSeries::default(), &Extrema::default()),
            "(no samples)\n"
        );
        let flat = HarmonicTide::sine(1.0, 0.0, 1.0).sample(
            Tz::UTC.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap(),
            Duration::hours(1),
            Duration::minutes(15),
        );
        let chart = draw_ascii(&flat, &Extrema::default());
        assert_eq!(chart.matches('•').count(), 5);
    }

    #[test]
    fn test_events_table_has_row_per_low_tide() {
        let report = report();
        let table = events_table(&report);
        assert_eq!(table.lines().count(), 1 + report.events.len());
        assert!(table.lines().next().unwrap().contains("≤1.5m"));
        assert!(table.contains("(6.21h)"));
    }

    #[test]
    fn test_csv_columns_and_rows() {
        let report = report();
        let mut buffer = Vec::new();
        write_csv(&report, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "low_tide_date,low_tide_height_m,low_tide_time,sunrise,noon,sunset,\
             window_start_1.5m,window_end_1.5m,hours_under_1.5m,\
             window_start_2m,window_end_2m,hours_under_2m"
        );
        let first: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(first.len(), 12);
        assert_eq!(first[0], "2024-08-01");
        assert_eq!(first[1], "0.50");
        assert!(first[2].starts_with("2024-08-01T09:1"));
        assert!(first[2].ends_with("+00:00"));
        assert_eq!(first[11], "6.21");
        assert_eq!(lines.count(), report.events.len() - 1);
    }

    #[test]
    fn test_json_document_labels_and_rounding() {
        let report = report();
        let json: serde_json::Value = serde_json::from_str(&to_json(&report).unwrap()).unwrap();

        assert_eq!(json["timezone"], "UTC");
        assert_eq!(json["high"].as_array().unwrap().len(), 4);
        assert_eq!(json["low"][0]["height"], 0.5);
        assert_eq!(json["windows"][1]["label"], "2m");
        assert_eq!(json["windows"][1]["threshold"], 2.0);
        assert_eq!(json["windows"][1]["windows"].as_array().unwrap().len(), 4);
        assert_eq!(json["windows"][1]["windows"][0]["hours"], 6.21);
        assert!(json["windows"][1]["windows"][3]["end"].is_null());
        assert_eq!(json["events"][0]["windows"][0]["label"], "1.5m");
        assert!(json["events"][0]["windows"][0]["start"].is_string());
    }

    #[test]
    fn test_json_thresholds_in_numeric_order() {
        // As text "10m" sorts before "2m".
        let report = report_with(&[10.0, 2.0]);
        let json: serde_json::Value = serde_json::from_str(&to_json(&report).unwrap()).unwrap();

        let labels = |list: &serde_json::Value| -> Vec<String> {
            list.as_array()
                .unwrap()
                .iter()
                .map(|entry| entry["label"].as_str().unwrap().to_string())
                .collect()
        };
        assert_eq!(labels(&json["windows"]), ["2m", "10m"]);
        for event in json["events"].as_array().unwrap() {
            assert_eq!(labels(&event["windows"]), ["2m", "10m"]);
            assert!(event["windows"][1]["start"].is_null());
        }
    }
}
