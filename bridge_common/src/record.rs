//! Typed records produced by the parser.
//!
//! Records are immutable once built. The capture time is assigned by whoever
//! calls the parser, never read from the wire, and is serialized under the
//! `time` key so API payloads keep the shape existing HTTP clients expect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Latest open/high/low/close snapshot for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcRecord {
    /// Instrument identifier, e.g. `EURUSD`.
    pub symbol: String,
    /// Opening price of the interval.
    pub open: f64,
    /// Highest price of the interval.
    pub high: f64,
    /// Lowest price of the interval.
    pub low: f64,
    /// Closing (current) price of the interval.
    pub close: f64,
    /// UTC capture time.
    #[serde(rename = "time")]
    pub observed_at: DateTime<Utc>,
}

/// One open position reported by the terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Terminal-assigned position identifier.
    pub ticket: i64,
    /// Instrument identifier.
    pub symbol: String,
    /// Position size in lots.
    pub volume: f64,
    /// Entry price.
    pub open_price: f64,
    /// Current market price.
    pub current_price: f64,
    /// UTC capture time.
    #[serde(rename = "time")]
    pub observed_at: DateTime<Utc>,
}

/// Anything the parser can produce from a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// A single OHLC snapshot.
    Ohlc(OhlcRecord),
    /// One line of an open-trades list.
    Trade(TradeRecord),
}

/// Named fields of the wire format, used to report which one failed.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    Symbol,
    Open,
    High,
    Low,
    Close,
    Ticket,
    Volume,
    OpenPrice,
    CurrentPrice,
}
