//! Terminal bridge server.
//!
//! This binary wires together the building blocks from the library crate:
//!
//! - `IngestListener` — binds the terminal-facing TCP endpoint and runs an accept loop
//!   plus a pool of connection workers on plain threads.
//! - `SnapshotStore` — shared in-memory state; workers append parsed records, HTTP
//!   handlers read them.
//! - `api::serve` — axum server on a tokio runtime exposing the store as JSON.
//!
//! Startup and shutdown:
//! - A bind failure on either endpoint aborts startup with a non-zero exit.
//! - Ctrl+C stops the HTTP server gracefully, then the ingest listener stops accepting
//!   and its workers drain in-flight connections before the process exits.
use bridge_common::{BridgeError, Result};
use bridge_server::api;
use bridge_server::config::Args;
use bridge_server::listener::IngestListener;
use bridge_server::store::SnapshotStore;
use clap::Parser;
use log::{error, info};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), BridgeError> {
    init_logger();
    let args = Args::parse();
    args.validate()?;

    let store = Arc::new(SnapshotStore::with_retention(args.retention()));
    info!("Snapshot store retention: {:?}", store.retention());

    let ingest = IngestListener::bind(args.ingest_config())?.spawn(Arc::clone(&store))?;

    let http = tokio::net::TcpListener::bind(&args.http_addr)
        .await
        .map_err(|e| BridgeError::bind(&args.http_addr, e))?;
    let served = api::serve(http, store, shutdown_signal()).await;

    let stopped = tokio::task::spawn_blocking(move || ingest.shutdown())
        .await
        .map_err(|e| BridgeError::ThreadJoin(e.to_string()))?;
    if let Err(e) = &stopped {
        error!("Ingest server did not stop cleanly: {}", e);
    }
    served.and(stopped)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl+C received. Shutting down server..."),
        Err(e) => {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await
        }
    }
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
