//! Network Module
//!
//! TCP server and client.
//!
//! ## Architecture
//! - Single acceptor thread (non-blocking accept, polls the shutdown flag)
//! - Fixed pool of worker threads fed through a crossbeam channel
//! - Commands routed to a shared [`crate::storage::Storage`]

mod server;
mod connection;
mod client;

pub use server::{Server, ShutdownHandle};
pub use connection::Connection;
pub use client::Client;
