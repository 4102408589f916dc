//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Command Type
//! - VIEW: empty
//! - NODE: id_len (4 bytes) + node_id (utf-8)
//! - PING: empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! A frame never carries more than `MAX_PAYLOAD_SIZE` bytes. A longer
//! response payload is split over frames with status `0x03` (continuation),
//! followed by one frame with the real status holding the last part. History
//! is unbounded, so there is no limit on the total.

use std::io::{Read, Write};
use crate::error::{HubError, Result};
use super::{Command, Response, Status};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size of a single frame (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Status byte of a frame holding a non-final part of a response payload
pub const CONTINUATION: u8 = 0x03;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Vec<u8> {
    let cmd_type = command.command_type() as u8;

    // Build payload based on command type
    let payload = match command {
        Command::Node { node_id } => {
            let id = node_id.as_bytes();
            let mut payload = Vec::with_capacity(4 + id.len());
            payload.extend_from_slice(&(id.len() as u32).to_be_bytes());
            payload.extend_from_slice(id);
            payload
        }
        Command::View | Command::Ping => Vec::new(),
    };

    // Build full message: header + payload
    let mut message = Vec::with_capacity(HEADER_SIZE + payload.len());
    message.push(cmd_type);
    message.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    message.extend_from_slice(&payload);

    message
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_type, payload) = split_frame(bytes, "command")?;

    // Parse command based on type
    match cmd_type {
        0x01 => decode_empty_command(payload, "VIEW", Command::View),
        0x02 => decode_node_command(payload),
        0x03 => decode_empty_command(payload, "PING", Command::Ping),
        _ => Err(HubError::Protocol(format!(
            "Unknown command type: 0x{:02x}",
            cmd_type
        ))),
    }
}

/// Decode NODE command payload
fn decode_node_command(payload: &[u8]) -> Result<Command> {
    if payload.len() < 4 {
        return Err(HubError::Protocol(
            "NODE command: missing id length".to_string(),
        ));
    }

    let id_len = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;

    if payload.len() != 4 + id_len {
        return Err(HubError::Protocol(format!(
            "NODE command: id length mismatch (declared {}, got {})",
            id_len,
            payload.len() - 4
        )));
    }

    let node_id = std::str::from_utf8(&payload[4..])
        .map_err(|e| HubError::Protocol(format!("NODE command: id is not utf-8: {}", e)))?
        .to_string();

    Ok(Command::Node { node_id })
}

/// Decode a command that carries no payload
fn decode_empty_command(payload: &[u8], name: &str, command: Command) -> Result<Command> {
    if !payload.is_empty() {
        return Err(HubError::Protocol(format!(
            "{} command: unexpected payload of {} bytes",
            name,
            payload.len()
        )));
    }
    Ok(command)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload, repeated as continuation
/// frames when the payload is larger than `MAX_PAYLOAD_SIZE`
pub fn encode_response(response: &Response) -> Vec<u8> {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    let frames = payload.len() / MAX_PAYLOAD_SIZE as usize + 1;

    let mut message = Vec::with_capacity(frames * HEADER_SIZE + payload.len());
    for (status, chunk) in response_frames(response.status, payload) {
        message.push(status);
        message.extend_from_slice(&(chunk.len() as u32).to_be_bytes());
        message.extend_from_slice(chunk);
    }

    message
}

/// Decode a response from bytes, joining continuation frames
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let mut payload = Vec::new();
    let mut offset = 0;

    loop {
        let (status_byte, chunk) = split_frame(&bytes[offset..], "response")?;
        offset += HEADER_SIZE + chunk.len();
        payload.extend_from_slice(chunk);

        if status_byte != CONTINUATION {
            return finish_response(status_byte, payload);
        }
    }
}

/// Split a payload into `(status, chunk)` frames; only the last carries `status`
fn response_frames(status: Status, payload: &[u8]) -> Vec<(u8, &[u8])> {
    if payload.is_empty() {
        return vec![(status as u8, payload)];
    }

    let chunks: Vec<&[u8]> = payload.chunks(MAX_PAYLOAD_SIZE as usize).collect();
    let last = chunks.len() - 1;
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let byte = if i == last { status as u8 } else { CONTINUATION };
            (byte, chunk)
        })
        .collect()
}

fn finish_response(status_byte: u8, payload: Vec<u8>) -> Result<Response> {
    let status = match status_byte {
        0x00 => Status::Ok,
        0x01 => Status::NotFound,
        0x02 => Status::Error,
        _ => {
            return Err(HubError::Protocol(format!(
                "Unknown response status: 0x{:02x}",
                status_byte
            )))
        }
    };

    let payload = if payload.is_empty() { None } else { Some(payload) };
    Ok(Response { status, payload })
}

/// Split a complete frame into its type byte and payload
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(HubError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let payload_len = payload_len(&bytes[..HEADER_SIZE])?;
    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(HubError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((bytes[0], &bytes[HEADER_SIZE..total_len]))
}

/// Payload length from a header, bounded by `MAX_PAYLOAD_SIZE`
fn payload_len(header: &[u8]) -> Result<usize> {
    let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if len > MAX_PAYLOAD_SIZE {
        return Err(HubError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(len as usize)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one complete frame (header + payload) from a stream
fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let len = payload_len(&header)?;
    let mut frame = Vec::with_capacity(HEADER_SIZE + len);
    frame.extend_from_slice(&header);
    frame.resize(HEADER_SIZE + len, 0);
    if len > 0 {
        reader.read_exact(&mut frame[HEADER_SIZE..])?;
    }
    Ok(frame)
}

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let frame = read_frame(reader)?;
    decode_command(&frame)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    writer.write_all(&encode_command(command))?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream, joining continuation frames
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let mut payload = Vec::new();
    loop {
        let frame = read_frame(reader)?;
        payload.extend_from_slice(&frame[HEADER_SIZE..]);

        if frame[0] != CONTINUATION {
            return finish_response(frame[0], payload);
        }
    }
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    for (status, chunk) in response_frames(response.status, payload) {
        writer.write_all(&[status])?;
        writer.write_all(&(chunk.len() as u32).to_be_bytes())?;
        writer.write_all(chunk)?;
    }
    writer.flush()?;
    Ok(())
}
