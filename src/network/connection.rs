//! Connection Handler
//!
//! A single client connection to a Redis-protocol server.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{Result, StashError};
use crate::protocol::{read_reply, write_command, Command, Reply};

/// A client connection to the store
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Dial `addr` and set up buffered I/O
    pub fn connect(addr: &str) -> Result<Self> {
        let addrs: Vec<_> = addr
            .to_socket_addrs()
            .map_err(|e| StashError::StoreUnavailable(format!("resolve {}: {}", addr, e)))?
            .collect();

        let stream = TcpStream::connect(&addrs[..])
            .map_err(|e| StashError::StoreUnavailable(format!("connect {}: {}", addr, e)))?;

        Self::from_stream(stream)
    }

    /// Wrap an already connected stream
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 = no timeout)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let read_stream = self.reader.get_ref();
        let write_stream = self.writer.get_ref();

        read_stream.set_read_timeout((read_ms > 0).then(|| Duration::from_millis(read_ms)))?;
        write_stream.set_write_timeout((write_ms > 0).then(|| Duration::from_millis(write_ms)))?;

        Ok(())
    }

    /// Send a command and wait for its reply
    ///
    /// Error lines from the server are returned as `Reply::Error`, not as
    /// `Err`; transport failures are `StoreUnavailable`.
    pub fn call(&mut self, command: &Command) -> Result<Reply> {
        tracing::trace!("Sending {} to {}", command.name(), self.peer_addr);

        write_command(&mut self.writer, command).map_err(|e| self.transport_error(e))?;
        let reply = read_reply(&mut self.reader).map_err(|e| self.transport_error(e))?;

        tracing::trace!("Reply from {}: {:?}", self.peer_addr, reply);
        Ok(reply)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    fn transport_error(&self, error: StashError) -> StashError {
        match error {
            StashError::Io(ref io_err) => {
                let reason = match io_err.kind() {
                    ErrorKind::UnexpectedEof => "connection closed by server",
                    ErrorKind::ConnectionReset => "connection reset",
                    ErrorKind::ConnectionAborted => "connection aborted",
                    ErrorKind::BrokenPipe => "broken pipe",
                    // Windows uses TimedOut instead of WouldBlock
                    ErrorKind::WouldBlock | ErrorKind::TimedOut => "timed out",
                    _ => "I/O failure",
                };
                tracing::warn!("Store connection {} failed: {} ({})", self.peer_addr, reason, io_err);
                StashError::StoreUnavailable(format!("{}: {} ({})", self.peer_addr, reason, io_err))
            }
            other => other,
        }
    }
}
