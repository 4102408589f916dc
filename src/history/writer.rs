//! History log writer
//!
//! Appends framed entries to the history log file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::SyncStrategy;
use crate::error::{HubError, Result, StoreError};

use super::entry::now_millis;
use super::recovery::{HistoryRecovery, RecoveryResult};
use super::{LogEntry, Operation};

/// Writes entries to the history log file
pub struct HistoryWriter {
    path: PathBuf,
    file: File,
    /// LSN handed to the next append
    next_lsn: u64,
    /// Timestamp of the last append; later entries never go backwards
    last_timestamp: u64,
    /// Length of the file up to the last complete entry
    len: u64,
    sync_strategy: SyncStrategy,
    unsynced: usize,
    /// A failed append left bytes past `len` that could not be cut off
    dirty_tail: bool,
}

impl HistoryWriter {
    /// Open or create a history log, recovering any existing content first
    pub fn open(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        let result = if path.exists() {
            HistoryRecovery::recover(path)?.1
        } else {
            RecoveryResult::default()
        };
        Self::resume(path, sync_strategy, &result)
    }

    /// Open a log that has already been recovered
    ///
    /// `recovered` must describe the file as it is on disk now.
    pub fn resume(path: &Path, sync_strategy: SyncStrategy, recovered: &RecoveryResult) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            next_lsn: recovered.last_lsn + 1,
            last_timestamp: recovered.last_timestamp,
            len: recovered.valid_len,
            sync_strategy,
            unsynced: 0,
            dirty_tail: false,
        })
    }

    /// Append an operation, returning the committed entry
    ///
    /// On failure the file is cut back to the last complete entry and the
    /// LSN is not consumed. If that cut fails, it is retried before the next
    /// append, and appends are refused until it succeeds.
    pub fn append(&mut self, operation: Operation) -> Result<LogEntry> {
        if self.dirty_tail {
            self.rollback();
            if self.dirty_tail {
                return Err(HubError::Store(StoreError::Unavailable(format!(
                    "history log {} has a partial entry that could not be removed",
                    self.path.display()
                ))));
            }
        }

        let timestamp = now_millis().max(self.last_timestamp);
        let entry = LogEntry::new(self.next_lsn, timestamp, operation);
        let frame = entry.serialize()?;

        if let Err(e) = self.write_frame(&frame) {
            self.rollback();
            return Err(e);
        }

        self.len += frame.len() as u64;
        self.next_lsn += 1;
        self.last_timestamp = timestamp;
        Ok(entry)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// LSN the next append will receive
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// LSN of the last committed entry (0 if none)
    pub fn last_lsn(&self) -> u64 {
        self.next_lsn - 1
    }

    /// Bytes of committed entries in the log
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.file.write_all(frame)?;
        self.unsynced += 1;

        let should_sync = match self.sync_strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if should_sync {
            self.sync()?;
        }
        Ok(())
    }

    fn rollback(&mut self) {
        match self.file.set_len(self.len) {
            Ok(()) => self.dirty_tail = false,
            Err(e) => {
                self.dirty_tail = true;
                tracing::error!(
                    "History log: failed to roll back {} to {} bytes: {}",
                    self.path.display(),
                    self.len,
                    e
                );
            }
        }
    }

    /// Whether a failed append left bytes that still need removing
    pub fn has_dirty_tail(&self) -> bool {
        self.dirty_tail
    }
}
