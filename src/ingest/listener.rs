//! Datagram Listener
//!
//! Binds the ingestion socket and runs the receive loop.

use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{DecodeError, HubError, Result};
use crate::payload;
use crate::store::{Ack, Store};

use super::{node_identity, IngestCounts, IngestStats, ListenerState, ReadingSink, StateCell};

/// UDP listener feeding decoded readings into a sink
pub struct DatagramListener<S: ReadingSink = Store> {
    socket: UdpSocket,
    local_addr: SocketAddr,
    sink: Arc<S>,
    max_datagram_size: usize,
    shared: Arc<Shared>,
}

/// State visible to the supervisor while the loop runs
#[derive(Debug)]
struct Shared {
    running: AtomicBool,
    state: StateCell,
    stats: IngestStats,
}

/// Cloneable control handle for a running listener
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    local_addr: SocketAddr,
    shared: Arc<Shared>,
}

impl ListenerHandle {
    /// Ask the receive loop to exit (takes effect within one receive timeout)
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> ListenerState {
        self.shared.state.get()
    }

    pub fn counts(&self) -> IngestCounts {
        self.shared.stats.counts()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl<S: ReadingSink> DatagramListener<S> {
    /// Bind the ingestion socket
    ///
    /// Failure is fatal for ingestion and reported as `HubError::Bind`.
    pub fn bind(config: &Config, sink: Arc<S>) -> Result<Self> {
        let bind_err = |source: std::io::Error| HubError::Bind {
            addr: config.ingest_addr.clone(),
            source,
        };

        let socket = UdpSocket::bind(&config.ingest_addr).map_err(bind_err)?;

        // Timed receive so the loop notices stop requests
        socket
            .set_read_timeout(Some(Duration::from_millis(config.recv_timeout_ms)))
            .map_err(bind_err)?;
        let local_addr = socket.local_addr().map_err(bind_err)?;

        tracing::info!("Ingestion socket bound to {}", local_addr);

        let shared = Arc::new(Shared {
            running: AtomicBool::new(true),
            state: StateCell::new(ListenerState::Listening),
            stats: IngestStats::default(),
        });

        Ok(Self {
            socket,
            local_addr,
            sink,
            max_datagram_size: config.max_datagram_size,
            shared,
        })
    }

    /// Handle for stopping and observing the listener from another thread
    pub fn handle(&self) -> ListenerHandle {
        ListenerHandle {
            local_addr: self.local_addr,
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Run the receive loop (blocking) until stopped
    ///
    /// No single datagram can end the loop: decode and store failures are
    /// logged and the next datagram is received.
    pub fn run(self) {
        tracing::info!("Ingestion listener started on {}", self.local_addr);

        // One spare byte tells an oversized datagram from one that fits exactly
        let mut buffer = vec![0u8; self.max_datagram_size + 1];

        while self.shared.running.load(Ordering::Relaxed) {
            self.shared.state.set(ListenerState::Listening);

            let (len, src) = match self.socket.recv_from(&mut buffer) {
                Ok(result) => result,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::error!("UDP recv error: {}", e);
                    continue;
                }
            };

            match self.process_datagram(&buffer[..len], src) {
                Ok(ack) => {
                    tracing::debug!(
                        "Stored reading from {} as sequence {}",
                        src,
                        ack.sequence_id
                    );
                }
                Err(HubError::Decode(e)) => {
                    tracing::warn!("Dropping datagram from {}: {}", src, e);
                }
                Err(e) => {
                    tracing::error!("Failed to store reading from {}: {}", src, e);
                }
            }
        }

        self.shared.state.set(ListenerState::Stopped);
        tracing::info!("Ingestion listener stopped");
    }

    /// Decode one datagram and hand it to the sink
    ///
    /// Returns `HubError::Decode` or `HubError::Store`; counters are updated
    /// either way.
    pub fn process_datagram(&self, datagram: &[u8], src: SocketAddr) -> Result<Ack> {
        self.shared.state.set(ListenerState::Receiving);
        self.shared.stats.record_received();

        let (node_id, source_address) = node_identity(&src);
        tracing::trace!("Datagram from {} ({} bytes)", source_address, datagram.len());

        self.shared.state.set(ListenerState::Decoding);
        let decoded = if datagram.len() > self.max_datagram_size {
            Err(DecodeError::Malformed(format!(
                "datagram exceeds {} bytes",
                self.max_datagram_size
            )))
        } else {
            payload::decode(datagram)
        };

        let reading = match decoded {
            Ok(reading) => reading,
            Err(e) => {
                self.shared.stats.record_malformed();
                return Err(e.into());
            }
        };

        self.shared.state.set(ListenerState::Storing);
        match self.sink.upsert(&node_id, &source_address, &reading) {
            Ok(ack) => {
                self.shared.stats.record_stored();
                Ok(ack)
            }
            Err(e) => {
                self.shared.stats.record_store_failure();
                Err(e.into())
            }
        }
    }
}
