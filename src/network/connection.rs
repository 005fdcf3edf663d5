//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter, ErrorKind as IoErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ErrorKind, Result, VaultError};
use crate::protocol::{read_command, write_response, Command, Response};
use crate::storage::Storage;

/// Handles a single client connection
pub struct Connection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    storage: Arc<dyn Storage>,
    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, storage: Arc<dyn Storage>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            storage,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 = no timeout)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Serve requests until the client goes away
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!(peer = %self.peer_addr, "Connection established");

        loop {
            let command = match read_command(&mut self.reader) {
                Ok(cmd) => cmd,
                Err(VaultError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!(peer = %self.peer_addr, reason = ?e.kind(), "Client gone");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(peer = %self.peer_addr, error = %e, "Bad request");
                    let _ = write_response(&mut self.writer, &Response::error(&e.to_string()));
                    return Err(e);
                }
            };

            tracing::trace!(peer = %self.peer_addr, ?command, "Received command");

            let response = self.execute(command);

            if let Err(e) = write_response(&mut self.writer, &response) {
                if let VaultError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) {
                        tracing::debug!(
                            peer = %self.peer_addr,
                            "Client disconnected before response could be sent"
                        );
                        return Ok(());
                    }
                }
                tracing::warn!(peer = %self.peer_addr, error = %e, "Write failed");
                return Err(e);
            }
        }
    }

    /// Execute a command against storage
    fn execute(&self, command: Command) -> Response {
        match command {
            Command::Ping => Response::ok(Some(b"PONG".to_vec())),
            Command::Set { name } => {
                let name = match String::from_utf8(name) {
                    Ok(name) if !name.is_empty() => name,
                    Ok(_) => return Response::error("invalid name: must not be empty"),
                    Err(_) => return Response::error("invalid name: not UTF-8"),
                };
                match self.storage.set(&name) {
                    Ok(id) => Response::id(id),
                    Err(e) => Response::error(&e.to_string()),
                }
            }
            Command::Get { id } => match self.storage.get(id) {
                Ok(record) => Response::ok(Some(record.name.into_bytes())),
                Err(e) if e.kind() == ErrorKind::NotFound => Response::not_found(),
                Err(e) => Response::error(&e.to_string()),
            },
        }
    }

    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// Errors that just mean the peer hung up or went idle
fn is_disconnect(kind: IoErrorKind) -> bool {
    matches!(
        kind,
        IoErrorKind::UnexpectedEof
            | IoErrorKind::ConnectionReset
            | IoErrorKind::ConnectionAborted
            | IoErrorKind::BrokenPipe
            | IoErrorKind::WouldBlock
            | IoErrorKind::TimedOut
    )
}
