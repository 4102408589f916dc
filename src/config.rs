//! Configuration for sensorhub
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{HubError, Result};

/// Main configuration for a sensorhub instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── history.log      (append-only history log)
    ///     └── snapshot.ckpt    (snapshot table checkpoint)
    pub data_dir: PathBuf,

    /// Sync strategy: how often to fsync the history log
    pub sync_strategy: SyncStrategy,

    /// Upserts between snapshot checkpoints (0 = checkpoint only on close)
    pub checkpoint_interval: u64,

    // -------------------------------------------------------------------------
    // Ingestion Configuration
    // -------------------------------------------------------------------------
    /// UDP listen address for sensor datagrams
    pub ingest_addr: String,

    /// Largest datagram accepted; anything longer is dropped as malformed
    pub max_datagram_size: usize,

    /// Receive timeout used to poll the stop flag (milliseconds)
    pub recv_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Query Service Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address for the read-facing service
    pub query_addr: String,

    /// Worker threads serving query connections
    pub workers: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

/// History log sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every append (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced entries
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./sensorhub_data"),
            sync_strategy: SyncStrategy::EveryWrite,
            checkpoint_interval: 64,
            ingest_addr: "[::]:8888".to_string(),
            max_datagram_size: 1024,
            recv_timeout_ms: 250,
            query_addr: "127.0.0.1:5000".to_string(),
            workers: 4,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject values the runtime cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_datagram_size == 0 {
            return Err(HubError::Config(
                "max_datagram_size must be at least 1 byte".to_string(),
            ));
        }
        if self.recv_timeout_ms == 0 {
            return Err(HubError::Config(
                "recv_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(HubError::Config("workers must be at least 1".to_string()));
        }
        if let SyncStrategy::EveryNEntries { count: 0 } = self.sync_strategy {
            return Err(HubError::Config(
                "EveryNEntries sync count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the history log sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the number of upserts between snapshot checkpoints
    pub fn checkpoint_interval(mut self, upserts: u64) -> Self {
        self.config.checkpoint_interval = upserts;
        self
    }

    /// Set the UDP ingestion address
    pub fn ingest_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.ingest_addr = addr.into();
        self
    }

    /// Set the maximum accepted datagram size (in bytes)
    pub fn max_datagram_size(mut self, size: usize) -> Self {
        self.config.max_datagram_size = size;
        self
    }

    /// Set the receive timeout used for stop-flag polling (in milliseconds)
    pub fn recv_timeout_ms(mut self, ms: u64) -> Self {
        self.config.recv_timeout_ms = ms;
        self
    }

    /// Set the TCP query service address
    pub fn query_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.query_addr = addr.into();
        self
    }

    /// Set the number of query worker threads
    pub fn workers(mut self, count: usize) -> Self {
        self.config.workers = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
