//! Blocking client for the recordvault protocol

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{Result, VaultError};
use crate::protocol::{read_response, write_command, Command, Response, Status};
use crate::record::Record;

/// A connection to a recordvault server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Insert a record and return its id
    pub fn set(&mut self, name: &str) -> Result<i64> {
        let response = self.call(&Command::Set {
            name: name.as_bytes().to_vec(),
        })?;

        let payload = response.payload.unwrap_or_default();
        let raw: [u8; 8] = payload.as_slice().try_into().map_err(|_| {
            VaultError::Protocol(format!("SET reply: expected 8-byte id, got {} bytes", payload.len()))
        })?;
        Ok(i64::from_be_bytes(raw))
    }

    /// Fetch a record; a missing id is `VaultError::NotFound`
    pub fn get(&mut self, id: i64) -> Result<Record> {
        let response = self.call(&Command::Get { id })?;
        Ok(Record {
            id,
            name: response.payload_text(),
        })
    }

    pub fn ping(&mut self) -> Result<()> {
        self.call(&Command::Ping).map(|_| ())
    }

    /// Send a command and map non-OK statuses to errors
    fn call(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        let response = read_response(&mut self.reader)?;

        match (response.status, command) {
            (Status::Ok, _) => Ok(response),
            (Status::NotFound, Command::Get { id }) => Err(VaultError::NotFound { id: *id }),
            (Status::NotFound, _) => Err(VaultError::Protocol(
                "NOT_FOUND reply to a non-GET command".to_string(),
            )),
            (Status::Error, _) => Err(VaultError::Storage(format!(
                "server error: {}",
                response.payload_text()
            ))),
        }
    }
}
