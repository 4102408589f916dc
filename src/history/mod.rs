//! History Module
//!
//! The append-only history of every accepted reading.
//!
//! ## Responsibilities
//! - Append one framed entry per upsert (the commit point of the upsert)
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) double as `sequence_id`
//! - Crash recovery: keep the longest valid prefix
//! - In-memory per-node index for `history_for` queries
//!
//! History is unbounded: nothing here ever evicts or rewrites a record.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Entry 1                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Entry 2                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! └─────────────────────────────────────────┘
//! ```

mod entry;
mod reader;
mod recovery;
mod writer;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use entry::{LogEntry, Operation, HEADER_SIZE, MAX_BODY_SIZE};
pub use reader::{HistoryIterator, HistoryReader};
pub use recovery::{HistoryRecovery, RecoveryResult};
pub use writer::HistoryWriter;

/// One immutable history record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Store-assigned, strictly increasing across all nodes
    pub sequence_id: u64,
    pub node_id: String,
    pub temperature: f64,
    pub humidity: f64,
    /// Unix millis; non-decreasing in `sequence_id` order
    pub recorded_at: u64,
}

/// Per-node history, each list in ascending `sequence_id` order
#[derive(Debug, Default)]
pub struct HistoryTable {
    records: BTreeMap<String, Vec<HistoryRecord>>,
    total: usize,
}

impl HistoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record; callers hand records over in LSN order
    pub fn append(&mut self, record: HistoryRecord) {
        self.records
            .entry(record.node_id.clone())
            .or_default()
            .push(record);
        self.total += 1;
    }

    /// All records for a node, oldest first (empty for unknown nodes)
    pub fn records_for(&self, node_id: &str) -> Vec<HistoryRecord> {
        self.records.get(node_id).cloned().unwrap_or_default()
    }

    /// Most recent record for a node
    pub fn latest(&self, node_id: &str) -> Option<&HistoryRecord> {
        self.records.get(node_id).and_then(|records| records.last())
    }

    /// Number of records for one node
    pub fn len_for(&self, node_id: &str) -> usize {
        self.records.get(node_id).map_or(0, Vec::len)
    }

    /// Number of records across all nodes
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}
