//! CLI entry point for the live flight tracker.
//!
//! Provides subcommands for a one-shot position lookup across all feeds and
//! for continuously tracking a flight on a fixed refresh interval.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use live_flight::output::{render_summary, render_update, to_json};
use live_flight::{FlightQuery, Poller, TrackerConfig};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "live_flight")]
#[command(about = "Live aircraft position from several tracking feeds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query every feed once and print the reconciled position
    Locate {
        /// Flight callsign, e.g. AIC101
        callsign: String,

        /// Transponder hex; enables the state-vector feed
        #[arg(long)]
        hex: Option<String>,

        /// Per-feed timeout in milliseconds (overrides PER_CALL_TIMEOUT_MS)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print JSON instead of a summary
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Keep refreshing the position until interrupted
    Track {
        /// Flight callsign, e.g. AIC101
        callsign: String,

        /// Transponder hex; enables the state-vector feed
        #[arg(long)]
        hex: Option<String>,

        /// Refresh interval in milliseconds (overrides POLL_INTERVAL_MS)
        #[arg(short, long)]
        interval_ms: Option<u64>,

        /// Per-feed timeout in milliseconds (overrides PER_CALL_TIMEOUT_MS)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Number of updates to print before exiting (0 = until Ctrl+C)
        #[arg(short = 'n', long, default_value_t = 0)]
        updates: usize,

        /// Print JSON instead of a summary
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/live_flight.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("live_flight.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let mut config = TrackerConfig::from_env().context("invalid configuration")?;

    match cli.command {
        Commands::Locate {
            callsign,
            hex,
            timeout_ms,
            json,
        } => {
            if let Some(ms) = timeout_ms {
                config.per_call_timeout = Duration::from_millis(ms);
            }
            config.validate()?;
            let query = FlightQuery::new(&callsign, hex.as_deref())?;

            locate(&config, &query, json).await?;
        }
        Commands::Track {
            callsign,
            hex,
            interval_ms,
            timeout_ms,
            updates,
            json,
        } => {
            if let Some(ms) = interval_ms {
                config.poll_interval = Duration::from_millis(ms);
            }
            if let Some(ms) = timeout_ms {
                config.per_call_timeout = Duration::from_millis(ms);
            }
            config.validate()?;
            let query = FlightQuery::new(&callsign, hex.as_deref())?;

            track(&config, query, updates, json).await?;
        }
    }

    Ok(())
}

/// Runs a single aggregate cycle and prints the result.
#[tracing::instrument(skip(config, query), fields(query = %query))]
async fn locate(config: &TrackerConfig, query: &FlightQuery, json: bool) -> Result<()> {
    let aggregator = config.build_aggregator()?;
    let result = aggregator.aggregate(query, config.per_call_timeout).await;

    if json {
        println!("{}", to_json(&result)?);
    } else {
        print!("{}", render_summary(&result));
    }
    Ok(())
}

/// Polls until Ctrl+C, or until `updates` updates have been printed.
#[tracing::instrument(
    skip(config, query),
    fields(query = %query, interval_ms = config.poll_interval.as_millis() as u64)
)]
async fn track(
    config: &TrackerConfig,
    query: FlightQuery,
    updates: usize,
    json: bool,
) -> Result<()> {
    let aggregator = Arc::new(config.build_aggregator()?);
    let poller = Poller::new(aggregator, config.per_call_timeout);
    let mut rx = poller.subscribe();

    poller.start(query, config.poll_interval)?;

    if updates == 0 {
        info!("Tracking. Press Ctrl+C to stop.");
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut printed = 0;
    loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                if let Err(e) = signal {
                    warn!(error = %e, "Failed to listen for Ctrl+C");
                }
                info!("Interrupted");
                break;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let Some(update) = rx.borrow_and_update().clone() else {
                    continue;
                };

                if json {
                    println!("{}", to_json(&update.result)?);
                } else {
                    println!("{}", render_update(&update));
                }

                printed += 1;
                if updates > 0 && printed >= updates {
                    break;
                }
            }
        }
    }

    poller.stop();
    info!(printed, "Tracking finished");
    Ok(())
}
