//! TCP Server
//!
//! Accepts connections and dispatches them to worker threads.

use std::io::ErrorKind as IoErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel;

use crate::config::Config;
use crate::error::Result;
use crate::storage::Storage;

use super::Connection;

/// How long the acceptor sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// TCP server for recordvault
pub struct Server {
    config: Config,
    storage: Arc<dyn Storage>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
}

/// Cloneable handle that stops a running [`Server`]
#[derive(Clone)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl Server {
    /// Bind `config.listen_addr`
    pub fn bind(config: Config, storage: Arc<dyn Storage>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            storage,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(Arc::clone(&self.shutdown))
    }

    /// Signal the server to stop accepting and return from `run`
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Accept and serve connections until shut down (blocking)
    ///
    /// Returns once the acceptor has stopped and every worker has finished
    /// its current connection.
    pub fn run(&self) -> Result<()> {
        let workers = self.config.worker_threads.max(1);
        let (tx, rx) = channel::bounded::<TcpStream>(workers * 4);

        tracing::info!(
            addr = %self.local_addr()?,
            workers,
            "Server listening"
        );

        thread::scope(|scope| {
            for worker in 0..workers {
                let rx = rx.clone();
                let storage = Arc::clone(&self.storage);
                let (read_ms, write_ms) = (self.config.read_timeout_ms, self.config.write_timeout_ms);

                scope.spawn(move || {
                    for stream in rx.iter() {
                        let served = Connection::new(stream, Arc::clone(&storage)).and_then(|mut conn| {
                            conn.set_timeouts(read_ms, write_ms)?;
                            conn.handle()
                        });
                        if let Err(e) = served {
                            tracing::debug!(worker, error = %e, "Connection ended with error");
                        }
                    }
                });
            }
            drop(rx);

            while !self.shutdown.load(Ordering::SeqCst) {
                match self.listener.accept() {
                    Ok((stream, peer)) => {
                        tracing::trace!(%peer, "Accepted connection");
                        if let Err(e) = stream.set_nonblocking(false) {
                            tracing::warn!(%peer, error = %e, "Dropping connection");
                            continue;
                        }
                        if tx.send(stream).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == IoErrorKind::WouldBlock => {
                        thread::sleep(ACCEPT_POLL_INTERVAL);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        thread::sleep(ACCEPT_POLL_INTERVAL);
                    }
                }
            }

            // Closing the channel lets workers drain and exit
            drop(tx);
        });

        tracing::info!("Server stopped");
        Ok(())
    }
}
