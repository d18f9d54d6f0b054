//! Wire-level constants of the terminal ingestion protocol and shared defaults.

/// Marks the end of a connection's content: `END CONNECTION` plus its null terminator.
pub const SENTINEL_BYTES: &[u8] = b"END CONNECTION\0";
/// Frame terminator written by the terminal after every string it sends.
pub const NUL: char = '\0';

/// Marker that classifies a message as a single OHLC record.
pub const OHLC_MARKER: &str = "OHLC";
/// Marker that classifies a message as an open-trades list.
pub const TRADES_MARKER: &str = "Open Trades";

/// Default ingest endpoint the terminal connects to.
pub const DEFAULT_INGEST_ADDR: &str = "127.0.0.1:8888";
/// Default HTTP endpoint for API clients.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:5000";
/// Default depth of the pending-connection queue.
pub const DEFAULT_BACKLOG: usize = 7000;
/// Size of a single socket read.
pub const READ_CHUNK: usize = 1024;
