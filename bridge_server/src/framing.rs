//! Accumulates a connection's bytes until the end-of-connection sentinel arrives.
//!
//! The terminal writes C strings, so every send ends in a null byte and the last one
//! is `END CONNECTION\0`. A single read may hold a fraction of a send or several of
//! them, so bytes are buffered until the sentinel shows up. Only then is the content
//! before it decoded and handed on as messages.
//!
//! Null bytes may also sit inside a message, after a value or mid-line. The content is
//! therefore only cut at a null that directly precedes a new `OHLC` or `Open Trades`
//! message; every other null stays in the text and the parser strips it per value.

use bridge_common::parser::{MessageKind, classify};
use bridge_common::protocol::{NUL, SENTINEL_BYTES};
use thiserror::Error;

/// Framing failure that ends a connection without dispatching anything.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    /// The peer sent more than `limit` bytes without a sentinel.
    #[error("message exceeds {limit} bytes without a sentinel")]
    Oversized {
        /// Configured maximum.
        limit: usize,
    },
}

/// Per-connection receive buffer.
#[derive(Debug)]
pub struct MessageBuffer {
    buf: Vec<u8>,
    max_bytes: usize,
    sentinel_at: Option<usize>,
    scanned: usize,
}

impl MessageBuffer {
    /// Create an empty buffer that refuses to grow beyond `max_bytes`.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_bytes,
            sentinel_at: None,
            scanned: 0,
        }
    }

    /// Append a chunk. Returns `true` once the sentinel has been seen.
    ///
    /// Bytes pushed after completion are ignored.
    pub fn push(&mut self, chunk: &[u8]) -> Result<bool, FramingError> {
        if self.sentinel_at.is_some() {
            return Ok(true);
        }
        self.buf.extend_from_slice(chunk);

        // the sentinel may straddle the previous chunk boundary
        let from = self.scanned.saturating_sub(SENTINEL_BYTES.len() - 1);
        if let Some(pos) = self.buf[from..]
            .windows(SENTINEL_BYTES.len())
            .position(|w| w == SENTINEL_BYTES)
        {
            self.sentinel_at = Some(from + pos);
            return Ok(true);
        }
        self.scanned = self.buf.len();

        if self.buf.len() > self.max_bytes {
            return Err(FramingError::Oversized {
                limit: self.max_bytes,
            });
        }
        Ok(false)
    }

    /// Whether the sentinel has arrived.
    pub fn is_complete(&self) -> bool {
        self.sentinel_at.is_some()
    }

    /// Bytes buffered so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been buffered yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Messages carried before the sentinel, in arrival order.
    ///
    /// Returns `None` while the sentinel is still missing: partial content is never
    /// handed to the parser.
    pub fn into_messages(self) -> Option<Vec<String>> {
        let end = self.sentinel_at?;
        let text = String::from_utf8_lossy(&self.buf[..end]);
        Some(split_messages(&text))
    }
}

/// Cut decoded content into messages, dropping blank ones.
///
/// A null starts a new message only when the text after it carries a message marker;
/// otherwise the null and what follows stay part of the current message.
pub fn split_messages(text: &str) -> Vec<String> {
    let mut messages: Vec<String> = Vec::new();
    for piece in text.split(NUL) {
        match messages.last_mut() {
            Some(current) if classify(piece) == MessageKind::Unknown => {
                current.push(NUL);
                current.push_str(piece);
            }
            _ => messages.push(piece.to_string()),
        }
    }
    messages.retain(|m| !m.trim_matches(|c: char| c == NUL || c.is_whitespace()).is_empty());
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_on_sentinel_in_single_chunk() {
        let mut buf = MessageBuffer::new(1024);
        assert!(buf.push(b"EURUSD:1 OHLC open=1 high=2 low=0 close=1\0END CONNECTION\0").unwrap());
        assert_eq!(
            buf.into_messages().unwrap(),
            vec!["EURUSD:1 OHLC open=1 high=2 low=0 close=1\0".to_string()]
        );
    }

    #[test]
    fn sentinel_split_across_reads_is_found() {
        let mut buf = MessageBuffer::new(1024);
        assert!(!buf.push(b"Open Trades\nticket=1 symbol=EURUSD").unwrap());
        assert!(!buf.push(b" volume=1 open_price=1 current_price=1\0END CONN").unwrap());
        assert!(buf.push(b"ECTION\0").unwrap());

        let messages = buf.into_messages().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("current_price=1"));
    }

    #[test]
    fn sentinel_without_null_does_not_complete() {
        let mut buf = MessageBuffer::new(1024);
        assert!(!buf.push(b"hello END CONNECTION").unwrap());
        assert!(!buf.is_complete());
        assert!(buf.into_messages().is_none());
    }

    #[test]
    fn several_sends_in_one_connection() {
        let mut buf = MessageBuffer::new(1024);
        buf.push(b"A:1 OHLC open=1 high=1 low=1 close=1\0").unwrap();
        buf.push(b"Open Trades\nticket=1 symbol=A volume=1 open_price=1 current_price=1\n\0")
            .unwrap();
        buf.push(b"END CONNECTION\0trailing junk").unwrap();

        let messages = buf.into_messages().unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("A:1 OHLC"));
        assert!(messages[1].starts_with("Open Trades"));
    }

    #[test]
    fn nulls_inside_a_trade_list_do_not_split_it() {
        let messages = split_messages(
            "Open Trades\nticket=100\0 symbol=EURUSD volume=1.0\0 open_price=1.10 current_price=1.11\0\n\
             ticket=101 symbol=GBPUSD volume=2.0 open_price=1.20 current_price=1.21\n",
        );
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Open Trades"));
        assert!(messages[0].contains("ticket=101"));
    }

    #[test]
    fn nulls_inside_an_ohlc_line_do_not_split_it() {
        let messages = split_messages("EURUSD:1 OHLC open=1.1\0 high=1.2 low=1.0 close=1.15\0");
        assert_eq!(
            messages,
            vec!["EURUSD:1 OHLC open=1.1\0 high=1.2 low=1.0 close=1.15\0".to_string()]
        );
    }

    #[test]
    fn oversized_content_is_rejected() {
        let mut buf = MessageBuffer::new(8);
        assert!(!buf.push(b"1234").unwrap());
        assert_eq!(
            buf.push(b"56789").unwrap_err(),
            FramingError::Oversized { limit: 8 }
        );
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let mut buf = MessageBuffer::new(64);
        buf.push(b"ab\xffcd\0END CONNECTION\0").unwrap();
        let messages = buf.into_messages().unwrap();
        assert_eq!(messages, vec!["ab\u{fffd}cd\0".to_string()]);
    }

    #[test]
    fn blank_messages_are_dropped() {
        assert_eq!(
            split_messages("\0 \0A:1 OHLC open=1 high=1 low=1 close=1\0\n\0"),
            vec!["A:1 OHLC open=1 high=1 low=1 close=1\0\n\0".to_string()]
        );
        assert!(split_messages("\0 \0\n\0").is_empty());
        assert!(split_messages("").is_empty());
    }
}
