//! History log entry definitions
//!
//! Defines the structure of individual history log entries and their
//! on-disk framing.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{HubError, Result};

use super::HistoryRecord;

/// Frame header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Largest body a frame may declare; anything bigger is treated as corruption
pub const MAX_BODY_SIZE: u32 = 1024 * 1024;

/// A single entry in the history log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Log Sequence Number - monotonically increasing, doubles as the
    /// history record's `sequence_id`
    pub lsn: u64,

    /// Timestamp (unix millis) assigned when the entry was appended
    pub timestamp: u64,

    /// The operation that was committed
    pub operation: Operation,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// A reading from a node: replaces its snapshot row, appends to its history
    Upsert {
        node_id: String,
        source_address: String,
        temperature: f64,
        humidity: f64,
    },
}

impl LogEntry {
    pub fn new(lsn: u64, timestamp: u64, operation: Operation) -> Self {
        Self {
            lsn,
            timestamp,
            operation,
        }
    }

    /// Serialize into a framed record: `LSN | CRC32(body) | LEN | body`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let body = bincode::serialize(self)?;
        if body.len() > MAX_BODY_SIZE as usize {
            return Err(HubError::Serialization(format!(
                "history entry too large: {} bytes (max {})",
                body.len(),
                MAX_BODY_SIZE
            )));
        }

        let mut frame = Vec::with_capacity(HEADER_SIZE + body.len());
        frame.extend_from_slice(&self.lsn.to_le_bytes());
        frame.extend_from_slice(&Self::compute_crc(&body).to_le_bytes());
        frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    /// Deserialize one framed record, verifying length, checksum and LSN
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let header = FrameHeader::parse(bytes)?;
        let total = HEADER_SIZE + header.body_len as usize;
        if bytes.len() < total {
            return Err(HubError::HistoryCorruption(format!(
                "incomplete entry: expected {} bytes, got {}",
                total,
                bytes.len()
            )));
        }
        Self::decode_body(&header, &bytes[HEADER_SIZE..total])
    }

    /// CRC32 of an entry body
    pub fn compute_crc(body: &[u8]) -> u32 {
        crc32fast::hash(body)
    }

    /// Node the entry belongs to
    pub fn node_id(&self) -> &str {
        match &self.operation {
            Operation::Upsert { node_id, .. } => node_id,
        }
    }

    /// The history record this entry represents
    pub fn to_record(&self) -> HistoryRecord {
        match &self.operation {
            Operation::Upsert {
                node_id,
                temperature,
                humidity,
                ..
            } => HistoryRecord {
                sequence_id: self.lsn,
                node_id: node_id.clone(),
                temperature: *temperature,
                humidity: *humidity,
                recorded_at: self.timestamp,
            },
        }
    }

    pub(crate) fn decode_body(header: &FrameHeader, body: &[u8]) -> Result<Self> {
        let actual_crc = Self::compute_crc(body);
        if actual_crc != header.crc {
            return Err(HubError::HistoryCorruption(format!(
                "CRC mismatch for LSN {}: stored {:08x}, computed {:08x}",
                header.lsn, header.crc, actual_crc
            )));
        }

        let entry: LogEntry = bincode::deserialize(body)
            .map_err(|e| HubError::HistoryCorruption(format!("undecodable entry body: {}", e)))?;

        if entry.lsn != header.lsn {
            return Err(HubError::HistoryCorruption(format!(
                "LSN mismatch: header says {}, body says {}",
                header.lsn, entry.lsn
            )));
        }
        Ok(entry)
    }
}

/// Parsed fixed-size frame header
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameHeader {
    pub lsn: u64,
    pub crc: u32,
    pub body_len: u32,
}

impl FrameHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(HubError::HistoryCorruption(format!(
                "incomplete header: expected {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let mut lsn = [0u8; 8];
        lsn.copy_from_slice(&bytes[0..8]);
        let mut crc = [0u8; 4];
        crc.copy_from_slice(&bytes[8..12]);
        let mut len = [0u8; 4];
        len.copy_from_slice(&bytes[12..16]);

        let header = Self {
            lsn: u64::from_le_bytes(lsn),
            crc: u32::from_le_bytes(crc),
            body_len: u32::from_le_bytes(len),
        };

        if header.body_len > MAX_BODY_SIZE {
            return Err(HubError::HistoryCorruption(format!(
                "entry body length {} exceeds maximum {}",
                header.body_len, MAX_BODY_SIZE
            )));
        }
        Ok(header)
    }
}

/// Current wall-clock time in unix milliseconds
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
