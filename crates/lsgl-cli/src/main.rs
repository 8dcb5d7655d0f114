// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use lsgl_core::{
    DirSource, FlightDataController, FlightType, HttpSource, Timestamp, TrackerConfig,
};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL or local directory holding the CSV datasets
    #[arg(short, long, env = "LSGL_SOURCE")]
    source: Option<String>,

    /// Path to config.json
    #[arg(short, long, env = "LSGL_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Warnings and errors only
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct RangeArgs {
    /// Window in days back from today
    #[arg(short, long)]
    days: Option<u32>,
    /// First day to include (YYYY-MM-DD); needs --end
    #[arg(long, requires = "end")]
    start: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD); needs --start
    #[arg(long, requires = "start")]
    end: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// List flights in the date range
    Flights {
        #[command(flatten)]
        range: RangeArgs,
        /// Print at most this many flights (most recent last)
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Arrivals and departures per day
    Daily {
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Look up an airport by ICAO code
    Airport { icao: String },
    /// Look up an aircraft by ICAO24 address
    Aircraft { icao24: String },
    /// Show dataset sizes
    Summary,
    /// Write the default config file
    InitConfig,
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else if cli.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    let installed = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto);
    if let Err(e) = installed {
        eprintln!("Logging disabled: {}", e);
    }
}

fn day_start(day: NaiveDate) -> Timestamp {
    day.and_time(NaiveTime::default()).and_utc()
}

fn day_end(day: NaiveDate) -> Timestamp {
    day.and_time(NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or_default())
        .and_utc()
}

fn build_controller(cli: &Cli, config: &TrackerConfig) -> Result<FlightDataController> {
    let source = cli.source.clone().unwrap_or_else(|| config.base_url.clone());
    let controller = if source.starts_with("http://") || source.starts_with("https://") {
        let http = HttpSource::new(
            source,
            config.files.clone(),
            std::time::Duration::from_secs(config.timeout_secs),
        )
        .context("Failed to build HTTP client")?;
        FlightDataController::new(http, config)
    } else {
        FlightDataController::new(DirSource::new(&source, config.files.clone()), config)
    };
    Ok(controller)
}

/// Builds a controller and loads it, failing only if every dataset failed.
fn load(cli: &Cli, config: &TrackerConfig) -> Result<FlightDataController> {
    let controller = build_controller(cli, config)?;
    controller.load_data();
    if let Some(err) = controller.error() {
        bail!(err);
    }
    Ok(controller)
}

fn apply_range(controller: &FlightDataController, range: &RangeArgs) {
    controller.set_date_range(
        range.days,
        range.start.map(day_start),
        range.end.map(day_end),
    );
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config_path = cli.config.clone().unwrap_or_else(TrackerConfig::default_path);
    let config = TrackerConfig::load(Some(&config_path));
    log::debug!(
        "Using config: path={} flight_cap={} window_days={}",
        config_path.display(),
        config.flight_cap,
        config.default_window_days
    );

    match &cli.command {
        Commands::Flights { range, limit } => {
            let controller = load(&cli, &config)?;
            apply_range(&controller, range);
            let flights = controller.current_flights();
            let skip = limit.map(|n| flights.len().saturating_sub(n)).unwrap_or(0);

            for f in flights.iter().skip(skip) {
                let kind = match f.flight.flight_type {
                    FlightType::Arrival => "ARR",
                    FlightType::Departure => "DEP",
                };
                let when = f
                    .flight
                    .primary_date()
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "----------".to_string());
                let aircraft = f
                    .aircraft_metadata
                    .as_ref()
                    .and_then(|a| a.field("registration"))
                    .or_else(|| f.flight.aircraft_icao24.clone())
                    .unwrap_or_default();
                let route = format!(
                    "{} -> {}",
                    f.flight.origin_airport_icao.as_deref().unwrap_or("????"),
                    f.flight.destination_airport_icao.as_deref().unwrap_or("????")
                );
                let airport = f
                    .airport_info
                    .as_ref()
                    .map(|a| a.name.as_str())
                    .unwrap_or("");
                println!("{} {} {:<10} {:<13} {}", kind, when, aircraft, route, airport);
            }
            println!("{} flights", flights.len());
        }
        Commands::Daily { range } => {
            let controller = load(&cli, &config)?;
            apply_range(&controller, range);
            println!("{:<10} {:>8} {:>10}", "date", "arrivals", "departures");
            for day in controller.current_daily_counts().iter() {
                println!(
                    "{:<10} {:>8} {:>10}",
                    day.date.format("%Y-%m-%d"),
                    day.arrivals,
                    day.departures
                );
            }
        }
        Commands::Airport { icao } => {
            let controller = load(&cli, &config)?;
            match controller.get_airport_info(icao) {
                Some(info) => println!(
                    "{} — {}, {}",
                    info.name,
                    info.city.as_deref().unwrap_or("?"),
                    info.country.as_deref().unwrap_or("?")
                ),
                None => println!("No airport found matching '{}'", icao),
            }
        }
        Commands::Aircraft { icao24 } => {
            let controller = load(&cli, &config)?;
            match controller.get_aircraft_info(icao24) {
                Some(record) => {
                    println!("{}", record.icao24.as_deref().unwrap_or(icao24));
                    for (name, value) in &record.fields {
                        if let Some(text) = value.as_text() {
                            println!("  {}: {}", name, text);
                        }
                    }
                }
                None => println!("No aircraft found matching '{}'", icao24),
            }
        }
        Commands::Summary => {
            let controller = build_controller(&cli, &config)?;
            let summary = controller.load_data();
            println!("arrivals:                {}", summary.arrivals);
            println!("departures:              {}", summary.departures);
            println!("arrival state vectors:   {}", summary.arrival_state_vectors);
            println!("departure state vectors: {}", summary.departure_state_vectors);
            println!("aircraft:                {}", summary.aircraft);
            println!("airports:                {}", summary.airports);
            for failure in &summary.failures {
                println!("failed: {}", failure);
            }
            if let Some(err) = controller.error() {
                bail!(err);
            }
        }
        Commands::InitConfig => {
            TrackerConfig::default().save(&config_path)?;
            println!("Wrote default config to {}", config_path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_bounds() {
        let cli = Cli::parse_from([
            "lsgl", "daily", "--start", "2024-01-01", "--end", "2024-01-31",
        ]);
        match cli.command {
            Commands::Daily { range } => {
                assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 1, 1));
                assert_eq!(range.days, None);
            }
            _ => panic!("expected daily"),
        }
    }

    #[test]
    fn test_start_requires_end() {
        assert!(Cli::try_parse_from(["lsgl", "flights", "--start", "2024-01-01"]).is_err());
    }

    #[test]
    fn test_day_bounds_cover_whole_day() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(day_start(day).to_rfc3339(), "2024-01-31T00:00:00+00:00");
        assert_eq!(day_end(day).date_naive(), day);
        assert!(day_end(day) > day_start(day));
    }
}
