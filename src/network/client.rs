//! Query Client
//!
//! Blocking client for the read-facing service, used by the CLI and tests.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{HubError, Result};
use crate::protocol::{read_response, write_command, Command, Response};
use crate::query::NodeView;

/// A connection to a sensorhub query service
///
/// After a failed request the stream position is unknown, so the client
/// closes the connection and refuses further requests.
pub struct QueryClient {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    broken: bool,
}

impl QueryClient {
    /// Connect with the given I/O timeout (0 = none)
    pub fn connect<A: ToSocketAddrs>(addr: A, timeout_ms: u64) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| HubError::Network(format!("connect failed: {}", e)))?;
        stream.set_nodelay(true)?;
        if timeout_ms > 0 {
            let timeout = Some(Duration::from_millis(timeout_ms));
            stream.set_read_timeout(timeout)?;
            stream.set_write_timeout(timeout)?;
        }

        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            broken: false,
        })
    }

    /// Every node with its history
    pub fn view(&mut self) -> Result<Vec<NodeView>> {
        self.request(&Command::View)?.into_view()
    }

    /// One node, or `None` if it never reported
    pub fn node(&mut self, node_id: &str) -> Result<Option<NodeView>> {
        self.request(&Command::Node {
            node_id: node_id.to_string(),
        })?
        .into_node()
    }

    /// Round-trip a PING
    pub fn ping(&mut self) -> Result<()> {
        let response = self.request(&Command::Ping)?;
        match response.payload.as_deref() {
            Some(b"PONG") => Ok(()),
            _ => Err(HubError::Protocol(format!(
                "unexpected PING response: {:?}",
                response.status
            ))),
        }
    }

    /// Whether an earlier failure closed the connection
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    fn request(&mut self, command: &Command) -> Result<Response> {
        if self.broken {
            return Err(HubError::Network(
                "connection closed after an earlier error".to_string(),
            ));
        }

        let result = write_command(&mut self.writer, command)
            .and_then(|()| read_response(&mut self.reader));

        if result.is_err() {
            self.broken = true;
            if let Err(e) = self.writer.get_ref().shutdown(Shutdown::Both) {
                tracing::debug!("Failed to shut down query connection: {}", e);
            }
        }
        result
    }
}
