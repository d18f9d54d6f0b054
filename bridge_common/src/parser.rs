//! Record parser for the terminal's text protocol.
//!
//! A message is classified by marker substring:
//!
//! - `OHLC` — one space-separated line. Token 0 is `<symbol>:<anything>`, tokens 2..=5
//!   are `key=value` pairs carrying open, high, low and close in that order.
//! - `Open Trades` — a header line followed by one trade per line, each made of
//!   `ticket= symbol= volume= open_price= current_price=` pairs.
//!
//! Anything else is ignored. The functions here are pure: the capture time is passed
//! in, so reparsing the same text with the same time yields identical records.
//! Malformed records are dropped one at a time and never abort their siblings.

use chrono::{DateTime, Utc};
use log::debug;

use crate::error::RecordError;
use crate::protocol::{NUL, OHLC_MARKER, TRADES_MARKER};
use crate::record::{Field, OhlcRecord, Record, TradeRecord};

/// Message classification by marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Single OHLC snapshot.
    Ohlc,
    /// Header plus one trade per line.
    Trades,
    /// Neither marker present.
    Unknown,
}

/// Classify `text`. `OHLC` takes precedence when both markers are present.
pub fn classify(text: &str) -> MessageKind {
    if text.contains(OHLC_MARKER) {
        MessageKind::Ohlc
    } else if text.contains(TRADES_MARKER) {
        MessageKind::Trades
    } else {
        MessageKind::Unknown
    }
}

/// Parse one message into zero or more records. Never fails.
pub fn parse_message(text: &str, observed_at: DateTime<Utc>) -> Vec<Record> {
    match classify(text) {
        MessageKind::Ohlc => match parse_ohlc(text, observed_at) {
            Ok(record) => vec![Record::Ohlc(record)],
            Err(e) => {
                debug!("Dropping OHLC message: {}", e);
                Vec::new()
            }
        },
        MessageKind::Trades => parse_trades(text, observed_at)
            .into_iter()
            .map(Record::Trade)
            .collect(),
        MessageKind::Unknown => {
            debug!("Ignoring message without a known marker ({} bytes)", text.len());
            Vec::new()
        }
    }
}

/// Parse a single OHLC line. The `OHLC` marker itself is not required here.
pub fn parse_ohlc(line: &str, observed_at: DateTime<Utc>) -> Result<OhlcRecord, RecordError> {
    let tokens: Vec<&str> = trim_frame(line).split(' ').collect();
    let symbol_token = token(&tokens, 0, Field::Symbol)?;
    let symbol = normalize(symbol_token.split(':').next().unwrap_or_default());

    Ok(OhlcRecord {
        symbol,
        open: float_field(&tokens, 2, Field::Open)?,
        high: float_field(&tokens, 3, Field::High)?,
        low: float_field(&tokens, 4, Field::Low)?,
        close: float_field(&tokens, 5, Field::Close)?,
        observed_at,
    })
}

/// Parse every non-empty line after the header of a trade-list message.
///
/// Lines that fail are logged and skipped; the rest keep their relative order.
pub fn parse_trades(text: &str, observed_at: DateTime<Utc>) -> Vec<TradeRecord> {
    text.split('\n')
        .skip(1)
        .filter(|line| !trim_frame(line).is_empty())
        .filter_map(|line| match parse_trade_line(line, observed_at) {
            Ok(trade) => Some(trade),
            Err(e) => {
                debug!("Dropping trade line {:?}: {}", line, e);
                None
            }
        })
        .collect()
}

/// Parse one `ticket=.. symbol=.. volume=.. open_price=.. current_price=..` line.
pub fn parse_trade_line(
    line: &str,
    observed_at: DateTime<Utc>,
) -> Result<TradeRecord, RecordError> {
    let tokens: Vec<&str> = trim_frame(line).split(' ').collect();

    let ticket_raw = value(token(&tokens, 0, Field::Ticket)?, Field::Ticket)?;
    let ticket = ticket_raw
        .parse::<i64>()
        .map_err(|source| RecordError::InvalidInteger {
            field: Field::Ticket,
            source,
        })?;

    let symbol = value(token(&tokens, 1, Field::Symbol)?, Field::Symbol)?;

    Ok(TradeRecord {
        ticket,
        symbol,
        volume: float_field(&tokens, 2, Field::Volume)?,
        open_price: float_field(&tokens, 3, Field::OpenPrice)?,
        current_price: float_field(&tokens, 4, Field::CurrentPrice)?,
        observed_at,
    })
}

fn token<'a>(tokens: &[&'a str], index: usize, field: Field) -> Result<&'a str, RecordError> {
    tokens
        .get(index)
        .copied()
        .ok_or(RecordError::MissingToken { field, index })
}

/// Value of a `key=value` token: the text between the first and second `=`,
/// with null bytes and surrounding whitespace removed.
fn value(token: &str, field: Field) -> Result<String, RecordError> {
    token
        .split('=')
        .nth(1)
        .map(normalize)
        .ok_or(RecordError::MissingValue(field))
}

fn float_field(tokens: &[&str], index: usize, field: Field) -> Result<f64, RecordError> {
    let raw = value(token(tokens, index, field)?, field)?;
    let parsed = raw
        .parse::<f64>()
        .map_err(|source| RecordError::InvalidFloat { field, source })?;
    if !parsed.is_finite() {
        return Err(RecordError::NonFinite(field));
    }
    Ok(parsed)
}

fn normalize(raw: &str) -> String {
    raw.replace(NUL, "").trim().to_string()
}

fn trim_frame(text: &str) -> &str {
    text.trim_matches(|c: char| c == NUL || c.is_whitespace())
}
