//! Snapshot checkpoint file
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Header (22 bytes)                                           │
//! │   Magic "SHSN" (4) | Version u16 (2) | LastLSN u64 (8)      │
//! │   | RowCount u64 (8)                                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Rows (variable)                                             │
//! │   [RowLen: u32][bincode(SnapshotRow)]                       │
//! │   ... repeated for each row ...                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Footer (4 bytes)                                            │
//! │   RowsCRC: u32                                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers little-endian. The file is written to a temporary path and
//! renamed into place, so a reader sees either the old or the new checkpoint.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::error::{HubError, Result};

use super::{SnapshotRow, SnapshotTable};

/// Magic bytes identifying a snapshot checkpoint
pub const CHECKPOINT_MAGIC: &[u8; 4] = b"SHSN";

/// Current checkpoint format version
const VERSION: u16 = 1;

/// Magic (4) + Version (2) + LastLSN (8) + RowCount (8)
pub const CHECKPOINT_HEADER_SIZE: usize = 22;

const FOOTER_SIZE: usize = 4;

/// A loaded checkpoint
#[derive(Debug, Clone)]
pub struct Checkpoint {
    /// Last history LSN reflected in `rows`
    pub last_lsn: u64,
    pub rows: Vec<SnapshotRow>,
}

impl Checkpoint {
    /// Write `table` as the checkpoint at `path`, atomically replacing any
    /// previous one. Returns the number of bytes written.
    pub fn write(path: &Path, last_lsn: u64, table: &SnapshotTable) -> Result<u64> {
        let tmp_path = path.with_extension("ckpt.tmp");

        let mut rows_bytes = Vec::new();
        for row in table.iter() {
            let encoded = bincode::serialize(row)?;
            rows_bytes.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
            rows_bytes.extend_from_slice(&encoded);
        }

        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(CHECKPOINT_MAGIC)?;
            writer.write_all(&VERSION.to_le_bytes())?;
            writer.write_all(&last_lsn.to_le_bytes())?;
            writer.write_all(&(table.len() as u64).to_le_bytes())?;
            writer.write_all(&rows_bytes)?;
            writer.write_all(&crc32fast::hash(&rows_bytes).to_le_bytes())?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }

        fs::rename(&tmp_path, path)?;
        if let Some(dir) = path.parent() {
            // Persist the rename; not every platform lets a directory be opened.
            match File::open(dir).and_then(|dir| dir.sync_all()) {
                Ok(()) => {}
                Err(e) => tracing::debug!(
                    "Could not sync checkpoint directory {}: {}",
                    dir.display(),
                    e
                ),
            }
        }

        Ok((CHECKPOINT_HEADER_SIZE + rows_bytes.len() + FOOTER_SIZE) as u64)
    }

    /// Read the checkpoint at `path`; `Ok(None)` if there is none yet
    pub fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let mut bytes = Vec::new();
        File::open(path)?.read_to_end(&mut bytes)?;
        Self::decode(&bytes).map(Some)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < CHECKPOINT_HEADER_SIZE + FOOTER_SIZE {
            return Err(HubError::Checkpoint(format!(
                "file too short: {} bytes",
                bytes.len()
            )));
        }

        if &bytes[0..4] != CHECKPOINT_MAGIC {
            return Err(HubError::Checkpoint(format!(
                "invalid magic: expected SHSN, got {:?}",
                &bytes[0..4]
            )));
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(HubError::Checkpoint(format!(
                "unsupported checkpoint version: {}",
                version
            )));
        }

        let last_lsn = read_u64(&bytes[6..14]);
        let row_count = read_u64(&bytes[14..22]);

        let rows_end = bytes.len() - FOOTER_SIZE;
        let rows_bytes = &bytes[CHECKPOINT_HEADER_SIZE..rows_end];
        let stored_crc = u32::from_le_bytes([
            bytes[rows_end],
            bytes[rows_end + 1],
            bytes[rows_end + 2],
            bytes[rows_end + 3],
        ]);
        let actual_crc = crc32fast::hash(rows_bytes);
        if stored_crc != actual_crc {
            return Err(HubError::Checkpoint(format!(
                "CRC mismatch: stored {:08x}, computed {:08x}",
                stored_crc, actual_crc
            )));
        }

        let mut rows = Vec::new();
        let mut offset = 0;
        while offset < rows_bytes.len() {
            if rows_bytes.len() - offset < 4 {
                return Err(HubError::Checkpoint("truncated row length".to_string()));
            }
            let len = u32::from_le_bytes([
                rows_bytes[offset],
                rows_bytes[offset + 1],
                rows_bytes[offset + 2],
                rows_bytes[offset + 3],
            ]) as usize;
            offset += 4;

            if rows_bytes.len() - offset < len {
                return Err(HubError::Checkpoint("truncated row".to_string()));
            }
            let row: SnapshotRow = bincode::deserialize(&rows_bytes[offset..offset + len])?;
            rows.push(row);
            offset += len;
        }

        if rows.len() as u64 != row_count {
            return Err(HubError::Checkpoint(format!(
                "row count mismatch: header says {}, found {}",
                row_count,
                rows.len()
            )));
        }

        Ok(Self { last_lsn, rows })
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}
