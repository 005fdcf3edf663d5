//! memcached cache
//!
//! Speaks the memcached ASCII protocol over a single TCP connection:
//!
//! ```text
//! get <key>\r\n              → VALUE <key> <flags> <bytes>\r\n<data>\r\nEND\r\n
//!                            → END\r\n                                  (miss)
//! set <key> 0 0 <bytes>\r\n<data>\r\n
//!                            → STORED\r\n
//! version\r\n                → VERSION <version>\r\n
//! ```
//!
//! Keys are the decimal id, values the bincode-encoded [`Record`]. The
//! connection is opened lazily and dropped after any I/O or protocol error,
//! so the next call reconnects.

use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use parking_lot::Mutex;

use crate::record::Record;

use super::{CacheError, RecordCache};

/// memcached's default item size limit; larger values are refused
pub const MAX_VALUE_SIZE: usize = 1024 * 1024;

/// A memcached-backed [`RecordCache`]
pub struct MemcacheCache {
    addr: String,
    timeout: Duration,
    conn: Mutex<Option<Connection>>,
}

struct Connection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl MemcacheCache {
    /// Create a client for `addr` (host:port); no connection is made yet
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
            conn: Mutex::new(None),
        }
    }

    /// Ask the server for its version, connecting if needed
    pub fn ping(&self) -> Result<String, CacheError> {
        self.with_connection(|conn| {
            conn.send(b"version\r\n")?;
            let line = conn.read_line()?;
            line.strip_prefix("VERSION ")
                .map(str::to_string)
                .ok_or_else(|| CacheError::Protocol(format!("unexpected reply to version: {line}")))
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Run `op` on the live connection, reconnecting first if there is none
    ///
    /// The connection is kept after success, a miss or a decode failure (the
    /// stream is still in sync); any other error discards it.
    fn with_connection<T>(
        &self,
        op: impl FnOnce(&mut Connection) -> Result<T, CacheError>,
    ) -> Result<T, CacheError> {
        let mut slot = self.conn.lock();

        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => self.connect()?,
        };

        let result = op(&mut conn);
        if matches!(
            result,
            Ok(_) | Err(CacheError::Miss) | Err(CacheError::Serialization(_))
        ) {
            *slot = Some(conn);
        }
        result
    }

    fn connect(&self) -> Result<Connection, CacheError> {
        let mut last_err = None;

        for addr in self.addr.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    stream.set_read_timeout(Some(self.timeout))?;
                    stream.set_write_timeout(Some(self.timeout))?;
                    tracing::debug!(server = %addr, "Connected to memcached");

                    let read_half = stream.try_clone()?;
                    return Ok(Connection {
                        reader: BufReader::new(read_half),
                        writer: BufWriter::new(stream),
                    });
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(CacheError::Unavailable(last_err.unwrap_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no address resolved for {}", self.addr),
            )
        })))
    }
}

impl Connection {
    fn send(&mut self, bytes: &[u8]) -> Result<(), CacheError> {
        self.writer.write_all(bytes)?;
        self.writer.flush()?;
        Ok(())
    }

    /// One response line without its trailing CRLF
    fn read_line(&mut self) -> Result<String, CacheError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(CacheError::Unavailable(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "memcached closed the connection",
            )));
        }
        if !line.ends_with("\r\n") {
            return Err(CacheError::Protocol(format!("unterminated line: {line:?}")));
        }
        line.truncate(line.len() - 2);
        Ok(line)
    }

    fn get(&mut self, key: &str) -> Result<Vec<u8>, CacheError> {
        self.send(format!("get {key}\r\n").as_bytes())?;

        let line = self.read_line()?;
        if line == "END" {
            return Err(CacheError::Miss);
        }

        // VALUE <key> <flags> <bytes>
        let mut parts = line.split(' ');
        let (Some("VALUE"), Some(k), Some(_flags), Some(len), None) =
            (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CacheError::Protocol(format!("unexpected reply to get: {line}")));
        };
        if k != key {
            return Err(CacheError::Protocol(format!("asked for {key}, got {k}")));
        }
        let len: usize = len
            .parse()
            .map_err(|_| CacheError::Protocol(format!("bad value length: {len}")))?;
        if len > MAX_VALUE_SIZE {
            return Err(CacheError::Protocol(format!(
                "value of {len} bytes exceeds the {MAX_VALUE_SIZE} byte item limit"
            )));
        }

        let mut data = vec![0u8; len + 2];
        self.reader.read_exact(&mut data)?;
        if !data.ends_with(b"\r\n") {
            return Err(CacheError::Protocol("value block not terminated".to_string()));
        }
        data.truncate(len);

        let end = self.read_line()?;
        if end != "END" {
            return Err(CacheError::Protocol(format!("expected END, got {end}")));
        }

        Ok(data)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        let mut request = format!("set {key} 0 0 {}\r\n", value.len()).into_bytes();
        request.extend_from_slice(value);
        request.extend_from_slice(b"\r\n");
        self.send(&request)?;

        match self.read_line()?.as_str() {
            "STORED" => Ok(()),
            other => Err(CacheError::Protocol(format!("set rejected: {other}"))),
        }
    }
}

impl RecordCache for MemcacheCache {
    fn set(&self, id: i64, record: &Record) -> Result<(), CacheError> {
        let data = bincode::serialize(record)?;
        self.with_connection(|conn| conn.set(&id.to_string(), &data))?;
        tracing::debug!(id, "Stored record in memcached");
        Ok(())
    }

    fn get(&self, id: i64) -> Result<Record, CacheError> {
        let data = self.with_connection(|conn| conn.get(&id.to_string()))?;
        Ok(bincode::deserialize(&data)?)
    }
}
