//! History log recovery
//!
//! Restores the log to its longest valid prefix after a crash.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::Result;

use super::reader::{Frame, HistoryReader};
use super::LogEntry;

/// Handles history log recovery on startup
pub struct HistoryRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of frames that failed verification
    pub entries_corrupted: u64,

    /// Last valid LSN (0 for an empty log)
    pub last_lsn: u64,

    /// Timestamp of the last valid entry (0 for an empty log)
    pub last_timestamp: u64,

    /// Length in bytes of the valid prefix
    pub valid_len: u64,

    /// Whether bytes past the valid prefix were (or would be) removed
    pub was_truncated: bool,
}

impl HistoryRecovery {
    /// Recover entries from a history log file
    ///
    /// This will:
    /// 1. Read all valid entries in order
    /// 2. Stop at the first torn or corrupted frame
    /// 3. Truncate the file to the valid prefix so appends resume cleanly
    /// 4. Return the valid entries
    pub fn recover(path: &Path) -> Result<(Vec<LogEntry>, RecoveryResult)> {
        let (entries, result) = Self::scan(path)?;

        if result.was_truncated {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(result.valid_len)?;
            file.sync_all()?;
        }

        Ok((entries, result))
    }

    /// Verify integrity of a history log without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Self::scan(path).map(|(_, result)| result)
    }

    fn scan(path: &Path) -> Result<(Vec<LogEntry>, RecoveryResult)> {
        let mut reader = HistoryReader::open(path)?;
        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();

        loop {
            match reader.read_frame()? {
                Frame::Entry(entry) => {
                    result.entries_recovered += 1;
                    result.last_lsn = entry.lsn;
                    result.last_timestamp = entry.timestamp;
                    entries.push(entry);
                }
                Frame::End => break,
                Frame::Torn { offset } => {
                    tracing::warn!("History log: partial entry at offset {}, dropping tail", offset);
                    result.was_truncated = true;
                    break;
                }
                Frame::Corrupt { offset, reason } => {
                    tracing::error!(
                        "History log: corrupted entry at offset {} ({}), dropping tail",
                        offset,
                        reason
                    );
                    result.entries_corrupted += 1;
                    result.was_truncated = true;
                    break;
                }
            }
        }

        result.valid_len = reader.position();
        Ok((entries, result))
    }
}
