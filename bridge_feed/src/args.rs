//! Command-line arguments for the feed tool.
use bridge_common::protocol::DEFAULT_INGEST_ADDR;
use clap::Parser;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Ingest address of the bridge server.
    #[arg(long, default_value = DEFAULT_INGEST_ADDR)]
    pub server: String,

    /// Message files to send, one frame per file, in the given order.
    #[arg(long, required = true, num_args = 1..)]
    pub path: Vec<String>,

    /// Resend every this many milliseconds; 0 sends once and exits.
    #[arg(long, default_value_t = 0)]
    pub interval_ms: u64,
}
