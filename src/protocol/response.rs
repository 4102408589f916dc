//! Response definitions
//!
//! Represents responses to presentation clients.

use crate::error::{HubError, Result};
use crate::query::NodeView;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
}

/// A response to send to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (encoded views, PONG, or error message)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// Create a NOT_FOUND response
    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            payload: None,
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// OK response carrying the full view
    pub fn view(views: &[NodeView]) -> Result<Self> {
        Ok(Self::ok(Some(bincode::serialize(views)?)))
    }

    /// OK response carrying one node
    pub fn node(view: &NodeView) -> Result<Self> {
        Ok(Self::ok(Some(bincode::serialize(view)?)))
    }

    /// Decode a VIEW payload
    pub fn into_view(self) -> Result<Vec<NodeView>> {
        match self.into_ok_payload()? {
            Some(payload) => Ok(bincode::deserialize(&payload)?),
            None => Ok(Vec::new()),
        }
    }

    /// Decode a NODE payload; `None` for NOT_FOUND
    pub fn into_node(self) -> Result<Option<NodeView>> {
        if self.status == Status::NotFound {
            return Ok(None);
        }
        match self.into_ok_payload()? {
            Some(payload) => Ok(Some(bincode::deserialize(&payload)?)),
            None => Err(HubError::Protocol("NODE response without payload".to_string())),
        }
    }

    /// Error message carried by an ERROR response
    pub fn error_message(&self) -> Option<String> {
        match (self.status, &self.payload) {
            (Status::Error, Some(bytes)) => Some(String::from_utf8_lossy(bytes).into_owned()),
            (Status::Error, None) => Some(String::new()),
            _ => None,
        }
    }

    fn into_ok_payload(self) -> Result<Option<Vec<u8>>> {
        match self.status {
            Status::Ok => Ok(self.payload),
            Status::Error => Err(HubError::Network(format!(
                "server error: {}",
                self.error_message().unwrap_or_default()
            ))),
            Status::NotFound => Err(HubError::Protocol("unexpected NOT_FOUND".to_string())),
        }
    }
}
