//! Command-line and environment configuration for the bridge server.
//!
//! Every option can be given as a flag or through a `BRIDGE_*` environment variable.
use crate::listener::IngestConfig;
use crate::store::RetentionPolicy;
use bridge_common::protocol::{DEFAULT_BACKLOG, DEFAULT_HTTP_ADDR, DEFAULT_INGEST_ADDR};
use bridge_common::{BridgeError, Result};
use clap::Parser;
use std::time::Duration;

/// Parsed command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Address the terminal connects to for telemetry ingestion.
    #[arg(long, env = "BRIDGE_INGEST_ADDR", default_value = DEFAULT_INGEST_ADDR)]
    pub ingest_addr: String,

    /// Address the HTTP API listens on.
    #[arg(long, env = "BRIDGE_HTTP_ADDR", default_value = DEFAULT_HTTP_ADDR)]
    pub http_addr: String,

    /// Pending ingest connections kept before new ones are dropped.
    #[arg(long, env = "BRIDGE_BACKLOG", default_value_t = DEFAULT_BACKLOG)]
    pub backlog: usize,

    /// Ingest connection worker threads.
    #[arg(long, env = "BRIDGE_WORKERS", default_value_t = 32)]
    pub workers: usize,

    /// Seconds a connection may stay silent before it is closed.
    #[arg(long, env = "BRIDGE_READ_TIMEOUT_SECS", default_value_t = 30)]
    pub read_timeout_secs: u64,

    /// Largest content accepted from one connection before the sentinel.
    #[arg(long, env = "BRIDGE_MAX_MESSAGE_BYTES", default_value_t = 1024 * 1024)]
    pub max_message_bytes: usize,

    /// Keep at most this many OHLC records (unbounded when unset).
    #[arg(long, env = "BRIDGE_MAX_OHLC")]
    pub max_ohlc: Option<usize>,

    /// Keep at most this many trade records (unbounded when unset).
    #[arg(long, env = "BRIDGE_MAX_TRADES")]
    pub max_trades: Option<usize>,
}

impl Args {
    /// Reject settings the listener cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(BridgeError::Config("--workers must be at least 1".to_string()));
        }
        if self.backlog == 0 {
            return Err(BridgeError::Config("--backlog must be at least 1".to_string()));
        }
        if self.read_timeout_secs == 0 {
            return Err(BridgeError::Config(
                "--read-timeout-secs must be at least 1".to_string(),
            ));
        }
        if self.max_ohlc == Some(0) || self.max_trades == Some(0) {
            return Err(BridgeError::Config(
                "retention caps must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Listener settings derived from the arguments.
    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            addr: self.ingest_addr.clone(),
            backlog: self.backlog,
            workers: self.workers,
            read_timeout: Duration::from_secs(self.read_timeout_secs),
            max_message_bytes: self.max_message_bytes,
            ..IngestConfig::default()
        }
    }

    /// Store retention derived from the arguments.
    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_ohlc: self.max_ohlc,
            max_trades: self.max_trades,
        }
    }
}
