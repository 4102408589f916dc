//! Error types for sensorhub
//!
//! `HubError` is the crate-wide error. Two narrow enums describe the failures
//! callers are expected to branch on:
//! - [`DecodeError`] for payloads that are not a valid reading
//! - [`StoreError`] for any persistence failure surfaced by the store

use thiserror::Error;

/// Result type alias using HubError
pub type Result<T> = std::result::Result<T, HubError>;

/// Payload decoding failure (datagram is dropped, listener continues)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Store failure (the operation had no effect)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Unified error type for sensorhub operations
#[derive(Debug, Error)]
pub enum HubError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Ingestion Errors
    // -------------------------------------------------------------------------
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("failed to bind ingestion socket on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Persistence Errors
    // -------------------------------------------------------------------------
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("history log corruption detected: {0}")]
    HistoryCorruption(String),

    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for HubError {
    fn from(e: bincode::Error) -> Self {
        HubError::Serialization(e.to_string())
    }
}

/// Anything that goes wrong below the store boundary is reported as unavailable.
impl From<HubError> for StoreError {
    fn from(e: HubError) -> Self {
        match e {
            HubError::Store(inner) => inner,
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}
