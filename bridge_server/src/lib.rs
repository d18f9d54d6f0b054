//! Terminal bridge server.
//!
//! Ingests OHLC and open-trade telemetry from a trading terminal over TCP, keeps the
//! latest snapshot in memory and serves it as JSON over HTTP.
//!
//! - `store` — `SnapshotStore`, the only shared mutable state.
//! - `framing` — per-connection buffering up to the `END CONNECTION\0` sentinel.
//! - `listener` — accept loop and worker pool feeding the store.
//! - `api` — axum routes reading from the store.
//! - `config` — clap arguments and the settings derived from them.
#![warn(missing_docs)]
pub mod api;
pub mod config;
pub mod framing;
pub mod listener;
pub mod store;
