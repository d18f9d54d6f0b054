//! TCP ingestion listener for terminal telemetry.
//!
//! One accept-loop thread hands every accepted connection to a bounded queue, and a
//! fixed pool of worker threads drains that queue. Each worker runs a connection
//! to completion:
//!
//! - read chunks into a [`MessageBuffer`] until the `END CONNECTION\0` sentinel arrives,
//! - parse the messages before the sentinel and append the records to the store,
//! - close the connection.
//!
//! A peer that hangs up before the sentinel contributes nothing. Read errors, timeouts
//! and oversized content end only the affected connection; the accept loop keeps
//! running until [`IngestHandle::shutdown`] is called. When the queue is full the accept
//! loop drops the new connection instead of waiting for a worker.
//!
//! The accept loop blocks in `accept`. Shutdown raises a flag on a channel and then
//! connects to the listener once so that the blocked call returns and sees it.

use crate::framing::{FramingError, MessageBuffer};
use crate::store::SnapshotStore;
use bridge_common::parser::parse_message;
use bridge_common::protocol::{DEFAULT_BACKLOG, DEFAULT_INGEST_ADDR, READ_CHUNK};
use bridge_common::{BridgeError, Record, Result};
use chrono::Utc;
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded, unbounded};
use log::{debug, error, info, warn};
use std::io::{self, ErrorKind, Read};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Runtime settings of the ingestion listener.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Address to bind, e.g. `127.0.0.1:8888`.
    pub addr: String,
    /// Capacity of the pending-connection queue.
    pub backlog: usize,
    /// Number of connection worker threads.
    pub workers: usize,
    /// Longest a worker waits for the next chunk from a peer.
    pub read_timeout: Duration,
    /// Largest content accepted from one connection before the sentinel.
    pub max_message_bytes: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_INGEST_ADDR.to_string(),
            backlog: DEFAULT_BACKLOG,
            workers: 32,
            read_timeout: Duration::from_secs(30),
            max_message_bytes: 1024 * 1024,
        }
    }
}

/// Why a single connection was closed without dispatching.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Socket read failed.
    #[error("read failed: {0}")]
    Io(#[from] io::Error),

    /// The peer sent nothing for longer than the read timeout.
    #[error("read timed out")]
    TimedOut,

    /// The peer's content could not be framed.
    #[error(transparent)]
    Framing(#[from] FramingError),
}

/// How a connection ended when no error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOutcome {
    /// The sentinel arrived and the content was parsed.
    Dispatched {
        /// OHLC records appended.
        ohlc: usize,
        /// Trade records appended.
        trades: usize,
    },
    /// The peer closed before the sentinel; buffered bytes were discarded.
    Abandoned {
        /// Bytes that were buffered.
        bytes: usize,
    },
}

/// A bound, not yet running ingestion listener.
pub struct IngestListener {
    socket: TcpListener,
    config: IngestConfig,
}

impl IngestListener {
    /// Bind the listening socket. Failure here is fatal to startup.
    pub fn bind(config: IngestConfig) -> Result<Self> {
        if config.workers == 0 || config.backlog == 0 {
            return Err(BridgeError::Config(
                "ingest workers and backlog must be positive".to_string(),
            ));
        }
        let socket =
            TcpListener::bind(&config.addr).map_err(|e| BridgeError::bind(&config.addr, e))?;
        info!("Ingest server successfully bound to {}", socket.local_addr()?);
        Ok(Self { socket, config })
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Start the accept loop and the worker pool in background threads.
    pub fn spawn(self, store: Arc<SnapshotStore>) -> Result<IngestHandle> {
        let local_addr = self.local_addr()?;
        let (queue_tx, queue_rx) = bounded::<TcpStream>(self.config.backlog);
        let (shutdown_tx, shutdown_rx) = unbounded::<()>();

        let mut workers = Vec::with_capacity(self.config.workers);
        for id in 0..self.config.workers {
            let queue_rx = queue_rx.clone();
            let store = Arc::clone(&store);
            let config = self.config.clone();
            let handle = thread::Builder::new()
                .name(format!("ingest-worker-{id}"))
                .spawn(move || run_worker(queue_rx, store, config))?;
            workers.push(handle);
        }

        let socket = self.socket;
        let accept = thread::Builder::new()
            .name("ingest-accept".to_string())
            .spawn(move || accept_loop(socket, queue_tx, shutdown_rx))?;

        info!(
            "Ingest server is now listening on {} with {} workers",
            local_addr,
            workers.len()
        );
        Ok(IngestHandle {
            local_addr,
            shutdown_tx,
            accept,
            workers,
        })
    }
}

/// Running listener.
///
/// Dropping the handle without calling [`IngestHandle::shutdown`] detaches the threads;
/// the accept loop then stops after the next connection it accepts.
pub struct IngestHandle {
    local_addr: SocketAddr,
    shutdown_tx: Sender<()>,
    accept: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

impl IngestHandle {
    /// Address the listener accepts connections on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, let workers finish queued and in-flight connections, then join.
    pub fn shutdown(self) -> Result<()> {
        info!("Stopping ingest server on {}", self.local_addr);
        // a send error means the accept loop is already gone
        if self.shutdown_tx.send(()).is_ok() {
            let wake = wake_addr(self.local_addr);
            if let Err(e) = TcpStream::connect_timeout(&wake, Duration::from_secs(1)) {
                debug!("Wake-up connection to {} failed: {}", wake, e);
            }
        }
        self.accept
            .join()
            .map_err(|_| BridgeError::ThreadJoin("ingest-accept".to_string()))?;
        for (id, worker) in self.workers.into_iter().enumerate() {
            worker
                .join()
                .map_err(|_| BridgeError::ThreadJoin(format!("ingest-worker-{id}")))?;
        }
        info!("Ingest server socket closed");
        Ok(())
    }
}

/// Where to connect to unblock the accept loop. A wildcard bind is reached via loopback.
fn wake_addr(local: SocketAddr) -> SocketAddr {
    let ip = match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local.port())
}

fn shutdown_requested(shutdown_rx: &Receiver<()>) -> bool {
    !matches!(shutdown_rx.try_recv(), Err(TryRecvError::Empty))
}

fn accept_loop(socket: TcpListener, queue_tx: Sender<TcpStream>, shutdown_rx: Receiver<()>) {
    loop {
        let accepted = socket.accept();
        if shutdown_requested(&shutdown_rx) {
            break;
        }
        match accepted {
            Ok((stream, addr)) => {
                debug!("Connection established with: {}", addr);
                match queue_tx.try_send(stream) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!("Connection queue is full, dropping connection from {}", addr);
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        error!("All ingest workers are gone, stopping accept loop");
                        break;
                    }
                }
            }
            Err(e) => {
                error!("TCP connection error: {}", e);
                // persistent errors such as EMFILE would otherwise spin
                thread::sleep(ACCEPT_ERROR_BACKOFF);
            }
        }
    }
    // dropping the sender lets workers exit once the queue is drained
    drop(queue_tx);
    debug!("Accept loop stopped");
}

fn run_worker(queue_rx: Receiver<TcpStream>, store: Arc<SnapshotStore>, config: IngestConfig) {
    for mut stream in queue_rx.iter() {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown peer".to_string());

        if let Err(e) = prepare_stream(&stream, config.read_timeout) {
            warn!("Failed to configure connection from {}: {}", peer, e);
            continue;
        }

        match handle_connection(&mut stream, &store, config.max_message_bytes) {
            Ok(ConnectionOutcome::Dispatched { ohlc, trades }) => {
                debug!("Connection {} stored {} OHLC and {} trade records", peer, ohlc, trades);
            }
            Ok(ConnectionOutcome::Abandoned { bytes }) => {
                debug!("Connection {} closed before sentinel, discarded {} bytes", peer, bytes);
            }
            Err(e) => warn!("Connection {} closed: {}", peer, e),
        }
    }
}

fn prepare_stream(stream: &TcpStream, read_timeout: Duration) -> io::Result<()> {
    stream.set_read_timeout(Some(read_timeout))
}

/// Run one connection to completion against `store`.
///
/// Reads until the sentinel, a clean close, or an error. Records are appended only
/// after the sentinel has arrived.
pub fn handle_connection<R: Read>(
    reader: &mut R,
    store: &SnapshotStore,
    max_message_bytes: usize,
) -> std::result::Result<ConnectionOutcome, ConnectionError> {
    let mut buffer = MessageBuffer::new(max_message_bytes);
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let size = match reader.read(&mut chunk) {
            Ok(size) => size,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Err(ConnectionError::TimedOut);
            }
            Err(e) => return Err(ConnectionError::Io(e)),
        };
        if size == 0 {
            return Ok(ConnectionOutcome::Abandoned {
                bytes: buffer.len(),
            });
        }
        if buffer.push(&chunk[..size])? {
            break;
        }
    }

    let messages = buffer.into_messages().unwrap_or_default();
    Ok(dispatch(&messages, store))
}

/// Parse each message and append its records, preserving order within a message.
pub fn dispatch(messages: &[String], store: &SnapshotStore) -> ConnectionOutcome {
    let mut ohlc = 0;
    let mut trades = 0;

    for message in messages {
        let mut batch = Vec::new();
        for record in parse_message(message, Utc::now()) {
            match record {
                Record::Ohlc(r) => {
                    store.append_ohlc(r);
                    ohlc += 1;
                }
                Record::Trade(t) => batch.push(t),
            }
        }
        if !batch.is_empty() {
            trades += batch.len();
            store.append_trades(batch);
        }
    }
    ConnectionOutcome::Dispatched { ohlc, trades }
}
