//! Connection Handler Module
//!
//! This module runs the read-execute-reply loop for one client. Each client
//! gets its own handler task.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects, handler task spawned
//!        │
//!        ▼
//! 2. ┌──────────────────────────────┐
//!    │  Decode every complete frame │
//!    │  in the buffer, execute it,  │
//!    │  write its reply             │
//!    │              │               │
//!    │              ▼               │
//!    │  Flush, read more bytes      │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 3. Stream ends (clean) or a frame is malformed (protocol error)
//! ```
//!
//! ## Buffer Management
//!
//! TCP is a stream protocol: one read may hold half a command or several
//! commands. Incoming bytes accumulate in a `BytesMut` until the parser can
//! take a whole frame off the front.

use crate::commands::CommandHandler;
use crate::protocol::{FrameParser, ParseError, RespValue};
use bytes::{Buf, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, trace, warn};

/// Default maximum size for the read buffer (64 MB)
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 64 * 1024 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Connections closed because of malformed input
    pub protocol_errors: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection over any byte stream.
///
/// Replies are written in the order the commands arrived, one per non-empty
/// command.
pub struct ConnectionHandler<S> {
    /// The client's byte stream; writes are buffered until the next read
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Bytes read but not yet decoded
    buffer: BytesMut,

    /// Upper bound on `buffer`
    max_buffer_size: usize,

    parser: FrameParser,

    command_handler: CommandHandler,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The client's byte stream
    /// * `addr` - The client's socket address
    /// * `command_handler` - The command handler for executing commands
    /// * `stats` - Shared connection statistics
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            parser: FrameParser::with_max_bulk_len(DEFAULT_MAX_BUFFER_SIZE),
            command_handler,
            stats,
        }
    }

    /// Limits how many undecoded bytes may be buffered. A single bulk
    /// string larger than this is rejected as a protocol error.
    pub fn with_max_buffer_size(mut self, max_buffer_size: usize) -> Self {
        self.max_buffer_size = max_buffer_size;
        self.parser = FrameParser::with_max_bulk_len(max_buffer_size);
        self
    }

    /// Runs the connection until the stream ends or a fatal error occurs.
    ///
    /// Returns `Ok(())` when the client closed the stream between commands.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected"),
            Err(ConnectionError::Io(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection closed with error"),
        }

        self.stats.connection_closed();
        result
    }

    /// The main read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(args) = self.next_frame().await? {
                // A zero-element frame is not a command
                let Some(response) = self.command_handler.execute(&args) else {
                    trace!(client = %self.addr, "Skipped empty frame");
                    continue;
                };
                self.stats.command_processed();
                self.write_response(&response).await?;
            }

            self.stream.flush().await?;

            if !self.read_more_data().await? {
                return Ok(());
            }
        }
    }

    /// Takes the next complete frame off the buffer, if there is one.
    ///
    /// On a protocol error the client is sent a best-effort error reply
    /// before the error is returned.
    async fn next_frame(&mut self) -> Result<Option<Vec<bytes::Bytes>>, ConnectionError> {
        match self.parser.parse(&self.buffer) {
            Ok(Some((args, consumed))) => {
                self.buffer.advance(consumed);
                trace!(
                    client = %self.addr,
                    consumed = consumed,
                    remaining = self.buffer.len(),
                    "Parsed command"
                );
                Ok(Some(args))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(client = %self.addr, error = %e, "Protocol error");
                self.stats.protocol_error();

                let reply = RespValue::error(format!("ERR Protocol error: {}", e));
                if self.write_response(&reply).await.is_ok() {
                    let _ = self.stream.flush().await;
                }
                Err(ConnectionError::Protocol(e))
            }
        }
    }

    /// Reads more data from the stream into the buffer.
    ///
    /// Returns `false` when the client closed the stream cleanly.
    async fn read_more_data(&mut self) -> Result<bool, ConnectionError> {
        if self.buffer.len() >= self.max_buffer_size {
            return Err(ConnectionError::BufferFull {
                size: self.buffer.len(),
                max: self.max_buffer_size,
            });
        }

        // Ensure we have some capacity
        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            return if self.buffer.is_empty() {
                Ok(false)
            } else {
                Err(ConnectionError::UnexpectedEof {
                    buffered: self.buffer.len(),
                })
            };
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(true)
    }

    /// Queues a response; it reaches the client at the next flush.
    async fn write_response(&mut self, response: &RespValue) -> Result<(), ConnectionError> {
        let bytes = response.serialize();
        self.stream.write_all(&bytes).await?;
        self.stats.bytes_written(bytes.len());
        trace!(client = %self.addr, bytes = bytes.len(), "Queued response");
        Ok(())
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The client sent bytes that are not a valid command frame
    #[error("protocol error: {0}")]
    Protocol(#[from] ParseError),

    /// The stream ended in the middle of a frame
    #[error("unexpected end of stream with {buffered} bytes of a partial frame")]
    UnexpectedEof { buffered: usize },

    /// The client sent more undecodable data than the buffer allows
    #[error("buffer size limit exceeded: {size} bytes (max: {max})")]
    BufferFull { size: usize, max: usize },
}

/// Handles a client connection to completion.
///
/// This is a convenience function that creates a [`ConnectionHandler`]
/// and runs it. Errors have already been logged by the handler.
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
    max_buffer_size: usize,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats)
        .with_max_buffer_size(max_buffer_size);
    if let Err(e) = handler.run().await {
        debug!(client = %addr, error = %e, "Connection ended with error");
    }
}
