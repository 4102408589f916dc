//! Command definitions
//!
//! Represents requests from presentation clients.

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    View = 0x01,
    Node = 0x02,
    Ping = 0x03,
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Every node with its snapshot and history
    View,

    /// One node with its snapshot and history
    Node { node_id: String },

    /// Ping (health check)
    Ping,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::View => CommandType::View,
            Command::Node { .. } => CommandType::Node,
            Command::Ping => CommandType::Ping,
        }
    }
}
