//! Query Module
//!
//! Read-only facade over the store for the presentation layer.
//!
//! The presentation layer only ever sees [`NodeView`]s: a node's latest
//! reading paired with its full, time-ordered history. Nothing here exposes
//! file layout or storage internals.

mod service;

use serde::{Deserialize, Serialize};

use crate::history::HistoryRecord;
use crate::snapshot::SnapshotRow;

pub use service::QueryService;

/// One node as the presentation layer sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    pub snapshot: SnapshotRow,
    /// Ascending by `sequence_id`
    pub history: Vec<HistoryRecord>,
}

impl NodeView {
    pub fn node_id(&self) -> &str {
        &self.snapshot.node_id
    }
}
