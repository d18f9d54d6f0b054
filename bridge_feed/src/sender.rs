//! Writing messages to the bridge server's ingest port.
//!
//! Each round opens a fresh TCP connection, writes every message as a null-terminated
//! frame and finishes with the `END CONNECTION\0` sentinel, the way the terminal does.
use bridge_common::protocol::{NUL, SENTINEL_BYTES};
use bridge_common::{BridgeError, Result};
use log::{debug, error, info};
use std::io::Write;
use std::net::TcpStream;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

/// Helper type for pushing messages to the server.
pub struct FeedSender;

impl FeedSender {
    /// Write `messages` followed by the sentinel to `stream`.
    pub fn send_messages<W: Write>(stream: &mut W, messages: &[String]) -> Result<()> {
        for message in messages {
            stream.write_all(message.trim_end_matches(NUL).as_bytes())?;
            stream.write_all(&[NUL as u8])?;
        }
        stream.write_all(SENTINEL_BYTES)?;
        stream.flush()?;
        Ok(())
    }

    /// Connect to `server` and send one round.
    pub fn send_round(server: &str, messages: &[String]) -> Result<()> {
        let mut stream = TcpStream::connect(server)
            .map_err(|e| BridgeError::Format(format!("Failed to connect to {}: {}", server, e)))?;
        Self::send_messages(&mut stream, messages)?;
        debug!("Sent {} messages to {}", messages.len(), server);
        Ok(())
    }

    /// Send a round every `interval` until `shutdown` is set.
    pub fn run_repeating(
        server: &str,
        messages: &[String],
        interval: Duration,
        shutdown: Arc<AtomicBool>,
    ) {
        info!("Feeding {} every {:?}", server, interval);
        while !shutdown.load(Ordering::Relaxed) {
            if let Err(e) = Self::send_round(server, messages) {
                error!("Feed round failed: {}", e);
            }
            thread::sleep(interval);
        }
        info!("Feed loop stopping...");
    }
}
