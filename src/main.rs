//! # Tide Windows Application Entry Point
//!
//! Command-line front end for the analysis library: resolves the station,
//! loads (or synthesises) a water-level series, runs the analysis over the
//! requested range and prints the result as an ASCII chart and table, CSV or
//! JSON. With `--at` it instead prints the interpolated height at one instant.
//!
//! Logs go to stderr (`RUST_LOG`, default `info`) so stdout stays clean for
//! CSV and JSON output.

// Test modules
#[cfg(test)]
mod tests;

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use clap::{ArgGroup, Parser, ValueEnum};
use std::io::{self, Write};
use std::path::PathBuf;
use tide_windows_lib::analysis::{analyze, TideAnalysis};
use tide_windows_lib::config::Config;
use tide_windows_lib::error::parse_timezone;
use tide_windows_lib::solar::NoaaSolarCalculator;
use tide_windows_lib::stations::StationRegistry;
use tide_windows_lib::synthetic::{HarmonicTide, DEFAULT_CADENCE_MINUTES};
use tide_windows_lib::{renderer, tide_data, StationContext, TideSeries};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Tide extrema and low-water windows for a tide station
#[derive(Parser, Debug)]
#[command(name = "tide-windows", version)]
#[command(about = "Find high and low tides and the windows when the water is below a height")]
#[command(group(ArgGroup::new("source").required(true).args(["series", "demo"])))]
struct Args {
    /// Configuration file [default: tide-config.toml]
    #[arg(long, env = "TIDE_CONFIG")]
    config: Option<PathBuf>,

    /// Water-level measurement JSON to analyse
    #[arg(long)]
    series: Option<PathBuf>,

    /// Analyse a synthetic two-constituent tide instead of a file
    #[arg(long)]
    demo: bool,

    /// Station list JSON used to resolve --station
    #[arg(long, requires = "station")]
    stations: Option<PathBuf>,

    /// Station name (exact, or a case-insensitive prefix)
    #[arg(long, requires = "stations")]
    station: Option<String>,

    /// First day of the range (YYYY-MM-DD, station local time)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day of the range, inclusive
    #[arg(long)]
    end: Option<NaiveDate>,

    /// IANA timezone overriding the station's own
    #[arg(long)]
    tz: Option<String>,

    /// Threshold height in metres; repeat for several
    #[arg(long = "threshold")]
    thresholds: Vec<f64>,

    /// Print the height at this instant (RFC 3339, or local YYYY-MM-DDTHH:MM)
    #[arg(long)]
    at: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Ascii)]
    format: Format,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Ascii,
    Csv,
    Json,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Local midnight starting `date` in `tz`.
fn local_midnight(date: NaiveDate, tz: &Tz) -> anyhow::Result<DateTime<Tz>> {
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("invalid date {date}"))?;
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| anyhow!("{date} has no midnight in {}", tz.name()))
}

/// Parse an instant given either with an offset or as station local time.
fn parse_instant(text: &str, tz: &Tz) -> anyhow::Result<DateTime<Tz>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Ok(instant.with_timezone(tz));
    }
    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M"))
        .with_context(|| format!("cannot parse time '{text}'"))?;
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| anyhow!("{text} does not exist in {}", tz.name()))
}

/// Thresholds from the command line, else from the configuration.
fn thresholds(args: &Args, config: &Config) -> Vec<f64> {
    if args.thresholds.is_empty() {
        config.analysis.thresholds.clone()
    } else {
        args.thresholds.clone()
    }
}

/// Station context from the registry when one is given, else from config.
///
/// A registry station reports in `--tz` when given, otherwise in its own
/// timezone; the configured zone belongs to the configured station only.
fn resolve_context(args: &Args, config: &Config) -> anyhow::Result<StationContext> {
    match (&args.stations, &args.station) {
        (Some(path), Some(name)) => {
            let registry = StationRegistry::load(path)
                .with_context(|| format!("loading stations from {}", path.display()))?;
            if registry.is_empty() {
                bail!("no stations with water-level predictions in {}", path.display());
            }
            let station = registry.get(name)?;
            station.require_series(&config.station.series_code)?;
            let tz = station.resolve_timezone(args.tz.as_deref())?;
            info!(station = %station.name, code = %station.code, tz = tz.name(), "resolved station");
            Ok(station.context(tz))
        }
        _ => {
            let mut context = config.context()?;
            if let Some(name) = &args.tz {
                context.timezone = parse_timezone(name)?;
            }
            Ok(context)
        }
    }
}

/// Analysed range: start of the first day through the end of the last day.
fn resolve_range(
    args: &Args,
    config: &Config,
    tz: &Tz,
    series: Option<&TideSeries>,
) -> anyhow::Result<(DateTime<Tz>, DateTime<Tz>)> {
    let start = match (args.start, series.and_then(TideSeries::span)) {
        (Some(date), _) => local_midnight(date, tz)?,
        (None, Some((first, _))) => first,
        (None, None) => local_midnight(Utc::now().with_timezone(tz).date_naive(), tz)?,
    };
    let end = match args.end {
        Some(date) => {
            let next = date
                .succ_opt()
                .ok_or_else(|| anyhow!("end date {date} is out of range"))?;
            local_midnight(next, tz)?
        }
        None => start + Duration::days(config.analysis.span_days),
    };
    Ok((start, end))
}

fn demo_series(start: DateTime<Tz>, end: DateTime<Tz>) -> TideSeries {
    HarmonicTide::m2_s2().sample(
        start,
        end - start,
        Duration::minutes(DEFAULT_CADENCE_MINUTES),
    )
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing();

    let config = match &args.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };
    let context = resolve_context(&args, &config)?;
    let tz = context.timezone;

    let loaded = match &args.series {
        Some(path) => Some(
            tide_data::load_series(path, &tz)
                .with_context(|| format!("loading series from {}", path.display()))?,
        ),
        None => None,
    };
    let (start, end) = resolve_range(&args, &config, &tz, loaded.as_ref())?;
    let series = loaded.unwrap_or_else(|| demo_series(start, end));
    debug!(samples = series.len(), %start, %end, "series ready");

    if let Some(at) = &args.at {
        let time = parse_instant(at, &tz)?;
        let height = TideAnalysis::new(series).height_at(time)?;
        println!("{}  {:.2} m", time.to_rfc3339(), height);
        return Ok(());
    }

    let report = analyze(
        &series,
        &context,
        start,
        end,
        &thresholds(&args, &config),
        &NoaaSolarCalculator,
    )?;
    info!(
        high = report.analysis.high().len(),
        low = report.analysis.low().len(),
        "analysis complete"
    );

    let stdout = io::stdout();
    match args.format {
        Format::Ascii => {
            let mut out = stdout.lock();
            write!(
                out,
                "{}",
                renderer::draw_ascii(report.analysis.series(), report.analysis.extrema())
            )?;
            writeln!(out)?;
            write!(out, "{}", renderer::events_table(&report))?;
        }
        Format::Csv => renderer::write_csv(&report, stdout.lock())?,
        Format::Json => println!("{}", renderer::to_json(&report)?),
    }
    Ok(())
}
