//!
//! Common types and utilities shared by the bridge server and the feed tool.
//!
//! This crate aggregates:
//! - `error` — unified error type `BridgeError` and the parser's `RecordError`.
//! - `result` — handy `Result<T, BridgeError>` alias.
//! - `record` — typed OHLC and trade records.
//! - `parser` — turns protocol messages into records.
//! - `protocol` — sentinel, markers and networking defaults.
#![warn(missing_docs)]
pub mod error;
pub mod parser;
pub mod protocol;
pub mod record;
pub mod result;

pub use error::{BridgeError, RecordError};
pub use record::{OhlcRecord, Record, TradeRecord};
pub use result::Result;
