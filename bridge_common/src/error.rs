//! Error types shared between the bridge server and the feed tool.
//!
//! `BridgeError` unifies the failure cases of the process-level plumbing (I/O,
//! binding, configuration and worker threads). Record-level parse
//! failures are not part of it: they are expressed as [`RecordError`] and never
//! leave the parser as anything but a dropped record.
use std::io;
use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

use crate::record::Field;

/// Unified error type shared by server and feed.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// I/O error originating from sockets or files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The ingest or HTTP endpoint could not be bound. Fatal at startup.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// Generic formatting/validation error with a human-readable message.
    #[error("Format error: {0}")]
    Format(String),

    /// Invalid runtime configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A background thread panicked before it could be joined.
    #[error("Thread {0} panicked")]
    ThreadJoin(String),
}

impl BridgeError {
    /// Wrap a bind failure together with the address that was requested.
    pub fn bind(addr: impl ToString, source: io::Error) -> Self {
        BridgeError::Bind {
            addr: addr.to_string(),
            source,
        }
    }
}

/// Why a single OHLC message or trade line was rejected.
///
/// The parser never raises these to the listener; they exist so that the
/// cause of a dropped record is visible in logs and tests.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// The message has fewer space-separated tokens than the field needs.
    #[error("missing token {index} for field `{field}`")]
    MissingToken {
        /// Field that was being read.
        field: Field,
        /// Zero-based token position.
        index: usize,
    },

    /// The token has no `key=value` separator.
    #[error("token for field `{0}` has no value")]
    MissingValue(Field),

    /// The value is not a floating point number.
    #[error("field `{field}` is not a number: {source}")]
    InvalidFloat {
        /// Field that failed.
        field: Field,
        /// Conversion error.
        source: ParseFloatError,
    },

    /// The value is not an integer.
    #[error("field `{field}` is not an integer: {source}")]
    InvalidInteger {
        /// Field that failed.
        field: Field,
        /// Conversion error.
        source: ParseIntError,
    },

    /// The value parsed but is `NaN` or infinite.
    #[error("field `{0}` is not finite")]
    NonFinite(Field),
}
