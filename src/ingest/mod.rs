//! Ingest Module
//!
//! UDP datagram listener for sensor readings.
//!
//! ## Architecture
//! - One socket, one receive loop on a dedicated thread
//! - Each datagram is decoded and stored before the next receive
//! - Per-datagram failures are logged and counted, never fatal
//!
//! ## Node Identity
//! The payload carries no node id. A node is the canonical text form of its
//! source IP (IPv4-mapped IPv6 addresses are shown as plain IPv4); the full
//! source socket address is stored alongside it.

mod listener;

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use crate::error::StoreError;
use crate::payload::Reading;
use crate::store::{Ack, Store};

pub use listener::{DatagramListener, ListenerHandle};

/// Where decoded readings go
///
/// `Store` is the production sink; tests substitute their own.
pub trait ReadingSink: Send + Sync {
    fn upsert(
        &self,
        node_id: &str,
        source_address: &str,
        reading: &Reading,
    ) -> Result<Ack, StoreError>;
}

impl ReadingSink for Store {
    fn upsert(
        &self,
        node_id: &str,
        source_address: &str,
        reading: &Reading,
    ) -> Result<Ack, StoreError> {
        Store::upsert(self, node_id, source_address, reading)
    }
}

/// Derive `(node_id, source_address)` from a datagram's source
pub fn node_identity(src: &SocketAddr) -> (String, String) {
    let ip = src.ip().to_canonical();
    let source_address = match src {
        SocketAddr::V6(v6) if ip.is_ipv4() => SocketAddr::new(ip, v6.port()).to_string(),
        _ => src.to_string(),
    };
    (ip.to_string(), source_address)
}

// =============================================================================
// Listener State
// =============================================================================

/// Where the receive loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ListenerState {
    Unbound = 0,
    /// Waiting for the next datagram
    Listening = 1,
    Receiving = 2,
    Decoding = 3,
    Storing = 4,
    Stopped = 5,
}

impl ListenerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ListenerState::Listening,
            2 => ListenerState::Receiving,
            3 => ListenerState::Decoding,
            4 => ListenerState::Storing,
            5 => ListenerState::Stopped,
            _ => ListenerState::Unbound,
        }
    }
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ListenerState::Unbound => "unbound",
            ListenerState::Listening => "listening",
            ListenerState::Receiving => "receiving",
            ListenerState::Decoding => "decoding",
            ListenerState::Storing => "storing",
            ListenerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Lock-free cell holding a `ListenerState`
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: ListenerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn set(&self, state: ListenerState) {
        self.0.store(state as u8, Ordering::Release);
    }

    pub fn get(&self) -> ListenerState {
        ListenerState::from_u8(self.0.load(Ordering::Acquire))
    }
}

// =============================================================================
// Counters
// =============================================================================

/// Ingestion counters, updated by the receive loop
#[derive(Debug, Default)]
pub struct IngestStats {
    received: AtomicU64,
    stored: AtomicU64,
    malformed: AtomicU64,
    store_failures: AtomicU64,
}

/// Point-in-time copy of `IngestStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestCounts {
    pub received: u64,
    pub stored: u64,
    pub malformed: u64,
    pub store_failures: u64,
}

impl IngestStats {
    pub fn counts(&self) -> IngestCounts {
        IngestCounts {
            received: self.received.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stored(&self) {
        self.stored.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }
}
