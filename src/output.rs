//! Output formatters for feed samples.
//!
//! Supports human-readable (with colors), JSON, and NDJSON formats.

use std::io::{self, Write};

use serde::Serialize;

use crate::controller::{FeedStats, FeedState};
use crate::models::{Sample, Severity};
use crate::stats::WindowStats;

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

// Severity colors, matching the dashboard's red/orange/yellow/green scale
const RED: &str = "\x1b[91m";
const ORANGE: &str = "\x1b[38;5;208m";
const YELLOW: &str = "\x1b[93m";
const GREEN: &str = "\x1b[92m";

const ICON_STATION: &str = "📡";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON array
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => RED,
        Severity::High => ORANGE,
        Severity::Elevated => YELLOW,
        Severity::Low => GREEN,
    }
}

/// Write samples in human-readable format, one line each.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<W: Write>(writer: &mut W, samples: &[Sample]) -> io::Result<()> {
    for sample in samples {
        let time = sample.timestamp.format("%Y-%m-%d %H:%M:%S");
        let severity = sample.severity();
        let color = severity_color(severity);
        let label = severity.as_str();

        writeln!(
            writer,
            "{ICON_STATION} {color}{BOLD}M{mag:.2}{RESET} │ \
             {color}{label:8}{RESET} │ \
             {DIM}{freq:>5.1} Hz{RESET} │ \
             {time} UTC │ \
             {source}",
            mag = sample.magnitude,
            freq = sample.frequency,
            source = sample.source_id,
        )?;
    }
    Ok(())
}

/// Write samples as a JSON array.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(writer: &mut W, samples: &[Sample]) -> io::Result<()> {
    write_pretty(writer, samples)
}

/// Write samples as newline-delimited JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write>(writer: &mut W, samples: &[Sample]) -> io::Result<()> {
    for sample in samples {
        let json = serde_json::to_string(sample)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write samples in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_samples<W: Write>(writer: &mut W, samples: &[Sample], format: Format) -> io::Result<()> {
    match format {
        Format::Human => write_human(writer, samples),
        Format::Json => write_json(writer, samples),
        Format::Ndjson => write_ndjson(writer, samples),
    }
}

/// Summary block printed after a snapshot dump.
#[derive(Debug, Serialize)]
pub struct Summary<'a> {
    pub state: FeedState,
    pub feed: FeedStats,
    pub window: &'a WindowStats,
}

/// Write a window summary. Human format is a short block; the JSON formats
/// emit a single object.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_summary<W: Write>(writer: &mut W, summary: &Summary<'_>, format: Format) -> io::Result<()> {
    match format {
        Format::Json => write_pretty(writer, summary),
        Format::Ndjson => {
            let json = serde_json::to_string(summary)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            writeln!(writer, "{json}")
        }
        Format::Human => {
            let window = summary.window;
            let fmt_mag = |m: Option<f64>| m.map_or_else(|| "--".to_string(), |m| format!("{m:.2}"));

            writeln!(writer, "{DIM}─────────────────────────────────────────────{RESET}")?;
            writeln!(
                writer,
                "{BOLD}Feed{RESET} {} │ {} ticks │ {} failures",
                summary.state, summary.feed.ticks, summary.feed.failures
            )?;
            writeln!(
                writer,
                "{BOLD}Window{RESET} {} readings │ avg M{} │ peak M{} │ {} stations",
                window.count,
                fmt_mag(window.mean_magnitude),
                fmt_mag(window.peak_magnitude),
                window.active_sources()
            )?;
            for (source, count) in &window.per_source {
                writeln!(writer, "  {DIM}{source:<12}{RESET} {count}")?;
            }
            Ok(())
        }
    }
}

fn write_pretty<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}
