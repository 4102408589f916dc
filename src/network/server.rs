//! TCP Server
//!
//! Accepts connections and dispatches them to worker threads.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver};

use crate::config::Config;
use crate::error::{HubError, Result};
use crate::query::QueryService;

use super::Connection;

/// How long the acceptor sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Pending connections per worker before the acceptor blocks
const QUEUE_DEPTH_PER_WORKER: usize = 4;

/// Read-facing TCP server
pub struct Server {
    config: Config,
    query: QueryService,
    listener: Option<TcpListener>,
    shutdown: Arc<AtomicBool>,
}

/// Cloneable handle to stop a running server
#[derive(Debug, Clone)]
pub struct ServerHandle {
    shutdown: Arc<AtomicBool>,
}

impl ServerHandle {
    /// Signal the server to shut down gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl Server {
    /// Create a new server with the given config and query service
    pub fn new(config: Config, query: QueryService) -> Self {
        Self {
            config,
            query,
            listener: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Bind the listen socket (idempotent); returns the bound address
    pub fn bind(&mut self) -> Result<SocketAddr> {
        if let Some(listener) = &self.listener {
            return Ok(listener.local_addr()?);
        }

        let listener = TcpListener::bind(&self.config.query_addr).map_err(|e| {
            HubError::Network(format!("failed to bind {}: {}", self.config.query_addr, e))
        })?;
        // Non-blocking accept so the loop can notice shutdown
        listener.set_nonblocking(true)?;

        let addr = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(addr)
    }

    /// Handle for stopping the server from another thread
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown: Arc::clone(&self.shutdown),
        }
    }

    /// Start the server (blocking until shutdown)
    pub fn run(&mut self) -> Result<()> {
        let addr = self.bind()?;
        let listener = match self.listener.take() {
            Some(listener) => listener,
            None => return Err(HubError::Network("listener not bound".to_string())),
        };

        let worker_count = self.config.workers;
        let (tx, rx) = channel::bounded::<TcpStream>(worker_count * QUEUE_DEPTH_PER_WORKER);
        let workers = self.spawn_workers(worker_count, rx)?;

        tracing::info!("Query service listening on {} ({} workers)", addr, worker_count);

        while !self.shutdown.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    // Accepted sockets inherit non-blocking mode on some platforms
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping connection from {}: {}", peer, e);
                        continue;
                    }
                    if tx.send(stream).is_err() {
                        tracing::error!("All query workers have exited");
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!("Accept error: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        // Closing the channel lets workers drain and exit
        drop(tx);
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Query worker panicked");
            }
        }

        tracing::info!("Query service on {} stopped", addr);
        Ok(())
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    fn spawn_workers(&self, count: usize, rx: Receiver<TcpStream>) -> Result<Vec<JoinHandle<()>>> {
        let mut workers = Vec::with_capacity(count);
        for id in 0..count {
            let rx = rx.clone();
            let query = self.query.clone();
            let (read_ms, write_ms) = (self.config.read_timeout_ms, self.config.write_timeout_ms);

            let worker = thread::Builder::new()
                .name(format!("query-worker-{}", id))
                .spawn(move || {
                    for stream in rx.iter() {
                        let mut conn = match Connection::new(stream, query.clone()) {
                            Ok(conn) => conn,
                            Err(e) => {
                                tracing::warn!("Failed to set up connection: {}", e);
                                continue;
                            }
                        };
                        if let Err(e) = conn.set_timeouts(read_ms, write_ms) {
                            tracing::warn!("Failed to set timeouts for {}: {}", conn.peer_addr(), e);
                            continue;
                        }
                        if let Err(e) = conn.handle() {
                            tracing::debug!("Connection {} closed with error: {}", conn.peer_addr(), e);
                        }
                    }
                })?;
            workers.push(worker);
        }
        Ok(workers)
    }
}
