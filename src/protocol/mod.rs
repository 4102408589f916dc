//! Protocol Module
//!
//! Defines the wire protocol of the read-facing query service.
//!
//! ## Protocol Format (V1 - Simple Binary)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0x01: VIEW  - Payload: empty
//! - 0x02: NODE  - Payload: id_len (4) + node_id (utf-8)
//! - 0x03: PING  - Payload: empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK        - VIEW: bincode `Vec<NodeView>`, NODE: bincode `NodeView`, PING: "PONG"
//! - 0x01: NOT_FOUND - NODE for a node that never reported
//! - 0x02: ERROR     - Payload: utf-8 message
//! - 0x03: (continuation) - Part of a payload larger than one frame

mod codec;
mod command;
mod response;

pub use codec::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, write_command, write_response, CONTINUATION, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
pub use command::{Command, CommandType};
pub use response::{Response, Status};
