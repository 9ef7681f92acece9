//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use seismofeed::controller::FeedConfig;
use seismofeed::filters::SampleFilter;
use seismofeed::generator::GeneratorConfig;
use seismofeed::output::Format;

/// Simulated live seismic telemetry from your terminal.
#[derive(Parser, Debug)]
#[command(name = "seismofeed")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stream simulated readings as they are generated
    Live(LiveArgs),

    /// Print a freshly seeded window and its summary, then exit
    Snapshot(SnapshotArgs),

    /// Start the dashboard HTTP API
    Serve(ServeArgs),
}

/// Feed and generator settings shared by all commands.
#[derive(Args, Debug, Clone)]
pub struct FeedArgs {
    /// Number of readings kept in the sliding window
    #[arg(long, default_value = "20")]
    pub capacity: usize,

    /// Tick interval in milliseconds (minimum 10)
    #[arg(long, default_value = "2000")]
    pub interval_ms: u64,

    /// Readings generated up front before the first tick
    #[arg(long, default_value = "10")]
    pub seed_samples: usize,

    /// Magnitude range: min,max
    #[arg(long, default_value = "1.0,4.0", value_parser = parse_range)]
    pub magnitude_range: ValueRange,

    /// Frequency range in Hz: min,max
    #[arg(long, default_value = "10.0,60.0", value_parser = parse_range)]
    pub frequency_range: ValueRange,

    /// Station ids to simulate (comma-separated, default Station-1..Station-5)
    #[arg(long, value_delimiter = ',')]
    pub stations: Vec<String>,

    /// RNG seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,
}

impl FeedArgs {
    /// Window and schedule settings.
    #[must_use]
    pub fn feed_config(&self, interval: Duration) -> FeedConfig {
        FeedConfig {
            capacity: self.capacity,
            tick_interval: interval,
            seed_samples: self.seed_samples,
        }
    }

    /// Generator ranges and stations.
    #[must_use]
    pub fn generator_config(&self) -> GeneratorConfig {
        let defaults = GeneratorConfig::default();
        GeneratorConfig {
            min_magnitude: self.magnitude_range.min,
            max_magnitude: self.magnitude_range.max,
            min_frequency: self.frequency_range.min,
            max_frequency: self.frequency_range.max,
            sources: if self.stations.is_empty() {
                defaults.sources
            } else {
                self.stations.clone()
            },
        }
    }
}

/// Display filter settings.
#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Minimum magnitude to show
    #[arg(long)]
    pub min_magnitude: Option<f64>,

    /// Maximum frequency in Hz to show
    #[arg(long)]
    pub max_frequency: Option<f64>,

    /// Only show these stations (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,
}

impl FilterArgs {
    #[must_use]
    pub fn filter(&self) -> SampleFilter {
        SampleFilter {
            min_magnitude: self.min_magnitude,
            max_frequency: self.max_frequency,
            sources: self.only.clone(),
        }
    }
}

/// Arguments for the `live` command.
#[derive(Parser, Debug)]
pub struct LiveArgs {
    #[command(flatten)]
    pub feed: FeedArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Stop automatically after this many seconds
    #[arg(long)]
    pub duration: Option<u64>,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `snapshot` command.
#[derive(Parser, Debug)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub feed: FeedArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `serve` command.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub feed: FeedArgs,

    /// Port to listen on
    #[arg(long, short = 'p', default_value = "8080")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Start with the feed paused
    #[arg(long)]
    pub paused: bool,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,
}

/// Inclusive `min,max` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl std::str::FromStr for ValueRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 2 {
            return Err(format!(
                "range requires 2 values (min,max), got {}",
                parts.len()
            ));
        }

        let min = parts[0]
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid number in range: {e}"))?;
        let max = parts[1]
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid number in range: {e}"))?;

        if min > max {
            return Err(format!("range min {min} must be <= max {max}"));
        }

        Ok(Self { min, max })
    }
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}

/// Parse a value range from string.
fn parse_range(s: &str) -> Result<ValueRange, String> {
    s.parse()
}
