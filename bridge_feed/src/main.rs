//! Bridge Feed — stands in for the trading terminal by pushing telemetry files to the
//! bridge server's ingest port.
//!
//! Usage example (CLI):
//! ```bash
//! bridge_feed --server 127.0.0.1:8888 --path ./ohlc.txt --path ./trades.txt --interval-ms 1000
//! ```
//!
//! Each file holds one protocol message (an OHLC line or an `Open Trades` list).
#![warn(missing_docs)]
mod args;
mod sender;

use crate::args::Args;
use crate::sender::FeedSender;
use bridge_common::{BridgeError, Result};
use clap::Parser;
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

fn main() -> Result<(), BridgeError> {
    init_logger();
    let args = Args::parse();

    let messages = args
        .path
        .iter()
        .map(|raw| {
            let path = normalize_path(raw);
            fs::read_to_string(&path).map_err(|e| {
                BridgeError::Format(format!("Failed to read {}: {}", path.display(), e))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if args.interval_ms == 0 {
        FeedSender::send_round(&args.server, &messages)?;
        info!("Sent {} messages to {}", messages.len(), args.server);
        return Ok(());
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            info!("Ctrl+C received. Stopping feed...");
            shutdown.store(true, Ordering::SeqCst);
        })
        .map_err(|e| BridgeError::Format(format!("Error setting Ctrl+C handler: {}", e)))?;
    }

    FeedSender::run_repeating(
        &args.server,
        &messages,
        Duration::from_millis(args.interval_ms),
        shutdown,
    );
    Ok(())
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

/// Normalize a CLI-provided path string by trimming whitespace and matching quotes.
///
/// This allows passing Windows paths in quotes without breaking parsing.
fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let no_quotes = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(no_quotes)
}
