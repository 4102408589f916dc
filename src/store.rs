//! Store Module
//!
//! The dual-table store that coordinates the history log and the snapshot.
//!
//! ## Responsibilities
//! - Idempotent initialization and crash recovery on startup
//! - Commit each upsert to the history log, then apply it to both tables
//! - Serve concurrent reads of the snapshot and per-node history
//! - Periodically checkpoint the snapshot table

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::history::{
    HistoryRecord, HistoryRecovery, HistoryTable, HistoryWriter, LogEntry, Operation,
    RecoveryResult,
};
use crate::payload::Reading;
use crate::snapshot::{Checkpoint, SnapshotRow, SnapshotTable};

/// Acknowledgement of a committed upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    /// Sequence id of the history record that was appended
    pub sequence_id: u64,
    /// Timestamp written to both the snapshot row and the history record
    pub recorded_at: u64,
}

/// Writer-side state, guarded by the write mutex
struct LogState {
    writer: HistoryWriter,
    /// Upserts applied since the last checkpoint
    since_checkpoint: u64,
}

/// Both tables live behind one lock so readers see an upsert entirely or not at all
#[derive(Default)]
struct Tables {
    snapshot: SnapshotTable,
    history: HistoryTable,
    last_lsn: u64,
}

impl Tables {
    fn apply(&mut self, entry: &LogEntry) {
        self.snapshot.upsert(row_from_entry(entry));
        self.history.append(entry.to_record());
        self.last_lsn = entry.lsn;
    }
}

/// The snapshot row an entry leaves behind
fn row_from_entry(entry: &LogEntry) -> SnapshotRow {
    match &entry.operation {
        Operation::Upsert {
            node_id,
            source_address,
            temperature,
            humidity,
        } => SnapshotRow {
            node_id: node_id.clone(),
            source_address: source_address.clone(),
            temperature: *temperature,
            humidity: *humidity,
            updated_at: entry.timestamp,
        },
    }
}

/// The telemetry store
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (upsert/checkpoint): Serialized by the `log` mutex
///   - One upsert at a time, globally, so per-node order is ingestion order
///   - Order: log mutex → append to history log → tables write lock
///
/// - **Reads** (snapshot_all/history_for): Concurrent
///   - Only take the tables read lock, never the log mutex
///   - The tables lock is held only while applying an already-committed
///     entry, so a reader never observes half an upsert
pub struct Store {
    /// Store configuration
    config: Config,

    history_path: PathBuf,
    checkpoint_path: PathBuf,

    /// History log writer; doubles as the write serialization point
    log: Mutex<LogState>,

    /// In-memory snapshot + history tables
    tables: RwLock<Tables>,
}

impl Store {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const HISTORY_FILENAME: &'static str = "history.log";
    const CHECKPOINT_FILENAME: &'static str = "snapshot.ckpt";

    /// Open or create a store with the given config
    ///
    /// Safe to call on every startup. On startup:
    /// 1. Create data directory if it doesn't exist
    /// 2. Load the snapshot checkpoint, if any
    /// 3. Recover the history log to its longest valid prefix
    /// 4. Rebuild the history table, roll the snapshot forward
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        // Step 1: Create data directory if it doesn't exist
        fs::create_dir_all(&config.data_dir)?;

        let history_path = config.data_dir.join(Self::HISTORY_FILENAME);
        let checkpoint_path = config.data_dir.join(Self::CHECKPOINT_FILENAME);

        // Step 2: Load checkpoint (a bad one is rebuilt from the log)
        let checkpoint = match Checkpoint::read(&checkpoint_path) {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                tracing::warn!("Ignoring unreadable checkpoint {}: {}", checkpoint_path.display(), e);
                None
            }
        };

        // Step 3: Recover history log
        let (entries, recovery) = if history_path.exists() {
            HistoryRecovery::recover(&history_path)?
        } else {
            (Vec::new(), RecoveryResult::default())
        };

        if recovery.entries_recovered > 0 || recovery.was_truncated {
            tracing::info!(
                "History recovery: {} entries recovered, {} corrupted, last_lsn={}, truncated={}",
                recovery.entries_recovered,
                recovery.entries_corrupted,
                recovery.last_lsn,
                recovery.was_truncated
            );
        }

        // Step 4: Rebuild tables
        let (tables, replayed) = Self::rebuild(checkpoint, &entries, recovery.last_lsn);

        let writer = HistoryWriter::resume(&history_path, config.sync_strategy, &recovery)?;

        let store = Self {
            config,
            history_path,
            checkpoint_path,
            log: Mutex::new(LogState {
                writer,
                since_checkpoint: 0,
            }),
            tables: RwLock::new(tables),
        };

        // Persist the rolled-forward snapshot so the next start replays less;
        // the log already holds everything, so failure is not fatal
        if replayed > 0 {
            if let Err(e) = store.checkpoint_locked(&mut store.log.lock()) {
                tracing::warn!("Snapshot checkpoint after recovery failed: {}", e);
            }
        }

        Ok(store)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let mut config = Config::default();
        config.data_dir = path.to_path_buf();
        Self::open(config)
    }

    /// Insert or replace the node's snapshot row and append a history record
    ///
    /// Both writes carry the same values and timestamp. The history log append
    /// is the commit point: if it fails, neither table changes.
    pub fn upsert(
        &self,
        node_id: &str,
        source_address: &str,
        reading: &Reading,
    ) -> std::result::Result<Ack, StoreError> {
        let mut log = self.log.lock();

        // Step 1: Commit to the history log
        let entry = log.writer.append(Operation::Upsert {
            node_id: node_id.to_string(),
            source_address: source_address.to_string(),
            temperature: reading.temperature,
            humidity: reading.humidity,
        })?;

        // Step 2: Publish to readers
        self.tables.write().apply(&entry);

        let ack = Ack {
            sequence_id: entry.lsn,
            recorded_at: entry.timestamp,
        };

        // Step 3: Checkpoint if due; the upsert is already durable in the log
        log.since_checkpoint += 1;
        let interval = self.config.checkpoint_interval;
        if interval > 0 && log.since_checkpoint >= interval {
            if let Err(e) = self.checkpoint_locked(&mut log) {
                tracing::warn!("Snapshot checkpoint failed: {}", e);
            }
        }

        Ok(ack)
    }

    /// One row per known node, ordered by node id
    pub fn snapshot_all(&self) -> std::result::Result<Vec<SnapshotRow>, StoreError> {
        Ok(self.tables.read().snapshot.rows())
    }

    /// The snapshot row of one node
    pub fn snapshot_for(&self, node_id: &str) -> std::result::Result<Option<SnapshotRow>, StoreError> {
        Ok(self.tables.read().snapshot.get(node_id).cloned())
    }

    /// All history records of a node in ascending `sequence_id` order
    ///
    /// Unknown nodes yield an empty list.
    pub fn history_for(&self, node_id: &str) -> std::result::Result<Vec<HistoryRecord>, StoreError> {
        Ok(self.tables.read().history.records_for(node_id))
    }

    /// Write the snapshot table to its checkpoint file now
    ///
    /// Returns the checkpoint size in bytes.
    pub fn checkpoint(&self) -> std::result::Result<u64, StoreError> {
        let mut log = self.log.lock();
        Ok(self.checkpoint_locked(&mut log)?)
    }

    /// Force the history log to disk
    pub fn sync(&self) -> std::result::Result<(), StoreError> {
        Ok(self.log.lock().writer.sync()?)
    }

    /// Close the store gracefully
    ///
    /// Syncs the history log and writes a final checkpoint.
    pub fn close(self) -> std::result::Result<(), StoreError> {
        let mut log = self.log.lock();
        log.writer.sync()?;
        self.checkpoint_locked(&mut log)?;
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of known nodes
    pub fn node_count(&self) -> usize {
        self.tables.read().snapshot.len()
    }

    /// Total number of history records across all nodes
    pub fn history_len(&self) -> usize {
        self.tables.read().history.len()
    }

    /// Sequence id of the newest history record (0 if empty)
    pub fn last_sequence_id(&self) -> u64 {
        self.tables.read().last_lsn
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Checkpoint with the write mutex already held
    fn checkpoint_locked(&self, log: &mut LogState) -> Result<u64> {
        let tables = self.tables.read();
        let bytes = Checkpoint::write(&self.checkpoint_path, tables.last_lsn, &tables.snapshot)?;
        log.since_checkpoint = 0;
        tracing::debug!(
            "Checkpointed {} nodes at lsn {} ({} bytes)",
            tables.snapshot.len(),
            tables.last_lsn,
            bytes
        );
        Ok(bytes)
    }

    /// Build both tables from a checkpoint plus the recovered log
    ///
    /// Returns the tables and the number of entries replayed into the snapshot
    /// beyond the checkpoint.
    fn rebuild(checkpoint: Option<Checkpoint>, entries: &[LogEntry], log_last_lsn: u64) -> (Tables, usize) {
        let mut history = HistoryTable::new();
        for entry in entries {
            history.append(entry.to_record());
        }

        let (mut snapshot, base_lsn) = match checkpoint {
            Some(cp) if cp.last_lsn <= log_last_lsn => (SnapshotTable::from_rows(cp.rows), cp.last_lsn),
            Some(cp) => {
                tracing::warn!(
                    "Checkpoint is ahead of the history log (lsn {} > {}), rebuilding snapshot from log",
                    cp.last_lsn,
                    log_last_lsn
                );
                (SnapshotTable::new(), 0)
            }
            None => (SnapshotTable::new(), 0),
        };

        let mut replayed = 0;
        for entry in entries.iter().filter(|e| e.lsn > base_lsn) {
            snapshot.upsert(row_from_entry(entry));
            replayed += 1;
        }

        let tables = Tables {
            snapshot,
            history,
            last_lsn: log_last_lsn,
        };
        (tables, replayed)
    }
}
