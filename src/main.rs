//! SeismoFeed - simulated live seismic telemetry from your terminal.
//!
//! Streams synthetic station readings through a bounded sliding window, dumps
//! seeded snapshots, or serves the window over a small HTTP API.

use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::{self, Instant};
use tracing::error;

use seismofeed::filters::SampleFilter;
use seismofeed::output::{self, Format, Summary};
use seismofeed::server;
use seismofeed::stats::WindowStats;
use seismofeed::{LiveFeed, build_feed};

mod cli;

use cli::{Cli, Command, FeedArgs};

/// Shortest tick interval accepted from the command line.
const MIN_INTERVAL_MS: u64 = 10;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Live(args) => cmd_live(args),
        Command::Snapshot(args) => cmd_snapshot(args),
        Command::Serve(args) => cmd_serve(args),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Build the feed described by the shared arguments.
fn feed_from_args(args: &FeedArgs) -> Result<LiveFeed> {
    let interval_ms = args.interval_ms.max(MIN_INTERVAL_MS);
    if interval_ms != args.interval_ms {
        tracing::warn!("tick interval clamped to minimum of {} ms", MIN_INTERVAL_MS);
    }

    build_feed(
        args.feed_config(Duration::from_millis(interval_ms)),
        args.generator_config(),
        args.seed,
    )
    .context("invalid feed configuration")
}

/// Execute the `snapshot` command - seed a window, print it and exit.
fn cmd_snapshot(args: cli::SnapshotArgs) -> Result<()> {
    let feed = feed_from_args(&args.feed)?;
    let filter = args.filter.filter();

    let view = feed.view();
    let window = WindowStats::from_samples(&view.samples);
    let shown = filter.apply(view.samples);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_samples(&mut handle, &shown, args.format)?;
    output::write_summary(
        &mut handle,
        &Summary {
            state: view.state,
            feed: view.stats,
            window: &window,
        },
        args.format,
    )?;

    Ok(())
}

/// Execute the `live` command - real-time streaming.
fn cmd_live(args: cli::LiveArgs) -> Result<()> {
    let feed = feed_from_args(&args.feed)?;
    let filter = args.filter.filter();

    tracing::info!(
        "streaming simulated readings (tick every {} ms, window {})",
        feed.tick_interval().as_millis(),
        feed.capacity()
    );

    // Print startup banner
    if args.format == Format::Human {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "\x1b[1m📡 SeismoFeed Live Stream\x1b[0m")?;
        writeln!(
            handle,
            "\x1b[2mTick: {}ms | Window: {} | Press Ctrl+C to stop\x1b[0m",
            feed.tick_interval().as_millis(),
            feed.capacity()
        )?;
        writeln!(handle, "\x1b[2m─────────────────────────────────────────────────────────────────────\x1b[0m")?;
    }

    tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(stream_live(&feed, &filter, args.format, args.duration))
}

/// Poll the feed once per tick and print whatever arrived since the last poll.
async fn stream_live(
    feed: &LiveFeed,
    filter: &SampleFilter,
    format: Format,
    duration: Option<u64>,
) -> Result<()> {
    // Seeded readings go out first
    let seeded = feed.view();
    emit(&filter.apply(seeded.samples.clone()), format)?;
    let mut seen = seeded.stats.appended;

    feed.start().context("failed to start feed")?;

    let mut poll = time::interval(feed.tick_interval());
    poll.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

    let deadline = run_deadline(duration);
    tokio::pin!(deadline);

    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    let result = loop {
        tokio::select! {
            _ = poll.tick() => {
                let view = feed.view();
                let fresh = filter.apply(view.since(seen).to_vec());
                seen = view.stats.appended;

                if let Err(e) = emit(&fresh, format) {
                    break Err(e);
                }
            }
            signal = &mut interrupted => {
                if let Err(e) = signal {
                    tracing::warn!("failed to listen for Ctrl+C: {}", e);
                }
                break Ok(());
            }
            () = &mut deadline => break Ok(()),
        }
    };

    feed.stop().await;

    let stats = feed.stats();
    tracing::debug!(
        "live feed finished: {} ticks, {} readings, {} failures",
        stats.ticks,
        stats.appended,
        stats.failures
    );
    result
}

/// Resolves after `duration` seconds, or never when no duration is given.
///
/// Durations too large to represent as an instant never fire.
async fn run_deadline(duration: Option<u64>) {
    let deadline = duration.and_then(|secs| Instant::now().checked_add(Duration::from_secs(secs)));
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Write a batch of samples and flush for real-time output.
fn emit(samples: &[seismofeed::Sample], format: Format) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_samples(&mut handle, samples, format)?;
    handle.flush()?;
    Ok(())
}

/// Execute the `serve` command - start the HTTP API.
fn cmd_serve(args: cli::ServeArgs) -> Result<()> {
    let feed = feed_from_args(&args.feed)?;

    let config = server::ServerConfig {
        port: args.port,
        host: args.host.clone(),
        start_paused: args.paused,
    };

    // Print startup message
    let url = format!("http://{}:{}", args.host, args.port);
    println!("\x1b[1m🌍 SeismoFeed Dashboard API\x1b[0m");
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("  Local:   \x1b[96m{url}\x1b[0m");
    println!("  Tick:    {}ms", feed.tick_interval().as_millis());
    println!("  Window:  {}", feed.capacity());
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("\x1b[2mPress Ctrl+C to stop\x1b[0m\n");

    // Open browser if requested (using xdg-open/open command)
    if args.open {
        #[cfg(target_os = "linux")]
        let _ = std::process::Command::new("xdg-open").arg(&url).spawn();
        #[cfg(target_os = "macos")]
        let _ = std::process::Command::new("open").arg(&url).spawn();
        #[cfg(target_os = "windows")]
        let _ = std::process::Command::new("cmd").args(["/c", "start", &url]).spawn();
    }

    // Run the async server on tokio runtime
    tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(server::run_server(config, feed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires_after_duration() {
        let start = Instant::now();
        run_deadline(Some(3)).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_duration_never_fires() {
        let waited = time::timeout(Duration::from_secs(60), run_deadline(Some(u64::MAX))).await;
        assert!(waited.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_duration_never_fires() {
        let waited = time::timeout(Duration::from_secs(60), run_deadline(None)).await;
        assert!(waited.is_err());
    }
}
