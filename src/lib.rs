//! # sensorhub
//!
//! Telemetry hub for a small fleet of sensor nodes:
//! - UDP ingestion of `"<temp*10>,<hum*10>"` readings
//! - Node identity taken from the datagram's source address
//! - Durable snapshot table (latest reading per node)
//! - Durable append-only history log (every reading, unbounded)
//! - Read-only query service for the presentation layer
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────┐              ┌──────────────────────────┐
//! │   Sensor nodes       │              │  Presentation clients    │
//! │   (UDP datagrams)    │              │  (TCP, VIEW / NODE)      │
//! └──────────┬───────────┘              └────────────┬─────────────┘
//!            │                                       │
//! ┌──────────▼───────────┐              ┌────────────▼─────────────┐
//! │  DatagramListener    │              │   Server + QueryService  │
//! │  decode → upsert     │              │   (worker pool)          │
//! └──────────┬───────────┘              └────────────┬─────────────┘
//!            │ write (serialized)                    │ read (concurrent)
//!            └──────────────────┬────────────────────┘
//!                               ▼
//!                  ┌─────────────────────────┐
//!                  │          Store          │
//!                  │  history log (commit)   │
//!                  │  snapshot + history     │
//!                  │  tables (RwLock)        │
//!                  └─────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod history;
pub mod ingest;
pub mod network;
pub mod payload;
pub mod protocol;
pub mod query;
pub mod snapshot;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use error::{DecodeError, HubError, Result, StoreError};
pub use ingest::DatagramListener;
pub use payload::Reading;
pub use query::{NodeView, QueryService};
pub use store::{Ack, Store};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of sensorhub
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
