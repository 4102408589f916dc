//! Query Service
//!
//! Composes `Store::snapshot_all` and `Store::history_for`; no caching.

use std::sync::Arc;

use crate::error::StoreError;
use crate::store::Store;

use super::NodeView;

/// Read-only view over a shared store
#[derive(Clone)]
pub struct QueryService {
    store: Arc<Store>,
}

impl QueryService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Every known node with its full history, ordered by node id
    ///
    /// The snapshot and each history are read separately, so an upsert that
    /// lands in between may show up in a history but not yet in the snapshot
    /// row (or the reverse). A store failure fails the whole view.
    pub fn current_view(&self) -> Result<Vec<NodeView>, StoreError> {
        let rows = self.store.snapshot_all()?;
        let mut views = Vec::with_capacity(rows.len());
        for snapshot in rows {
            let history = self.store.history_for(&snapshot.node_id)?;
            views.push(NodeView { snapshot, history });
        }
        Ok(views)
    }

    /// One node's view, or `None` if the node has never reported
    pub fn node_view(&self, node_id: &str) -> Result<Option<NodeView>, StoreError> {
        let Some(snapshot) = self.store.snapshot_for(node_id)? else {
            return Ok(None);
        };
        let history = self.store.history_for(node_id)?;
        Ok(Some(NodeView { snapshot, history }))
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }
}
