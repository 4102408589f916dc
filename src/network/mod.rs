//! Network Module
//!
//! Read-facing TCP service for the presentation layer.
//!
//! ## Architecture
//! - Single acceptor thread
//! - Fixed worker thread pool for connections (crossbeam channel hand-off)
//! - Commands answered through the `QueryService`

mod client;
mod connection;
mod server;

pub use client::QueryClient;
pub use connection::Connection;
pub use server::{Server, ServerHandle};
