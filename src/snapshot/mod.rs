//! Snapshot Module
//!
//! The latest reading per node.
//!
//! ## Responsibilities
//! - Keep exactly one row per `node_id`; an upsert replaces the whole row
//! - Persist the table as a checkpoint file that recovery rolls forward
//!   from the history log
//!
//! ## Data Structure Choice
//! BTreeMap keyed by node id: small fleet, ordered output for free.

mod checkpoint;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use checkpoint::{Checkpoint, CHECKPOINT_HEADER_SIZE, CHECKPOINT_MAGIC};

/// The current state of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    /// Primary key: canonical source IP of the node
    pub node_id: String,
    /// Full socket address the last reading came from
    pub source_address: String,
    pub temperature: f64,
    pub humidity: f64,
    /// Unix millis of the last reading
    pub updated_at: u64,
}

/// One row per node
#[derive(Debug, Default, Clone)]
pub struct SnapshotTable {
    rows: BTreeMap<String, SnapshotRow>,
}

impl SnapshotTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from checkpointed rows (later duplicates win)
    pub fn from_rows(rows: impl IntoIterator<Item = SnapshotRow>) -> Self {
        let mut table = Self::new();
        for row in rows {
            table.upsert(row);
        }
        table
    }

    /// Insert or fully replace the row for `row.node_id`
    ///
    /// Returns the row that was replaced, if any.
    pub fn upsert(&mut self, row: SnapshotRow) -> Option<SnapshotRow> {
        self.rows.insert(row.node_id.clone(), row)
    }

    pub fn get(&self, node_id: &str) -> Option<&SnapshotRow> {
        self.rows.get(node_id)
    }

    /// All rows, ordered by node id
    pub fn rows(&self) -> Vec<SnapshotRow> {
        self.rows.values().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SnapshotRow> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
