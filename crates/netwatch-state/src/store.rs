//! Node record store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use netwatch_core::{CallerStats, NetwatchError, NodeRecord, NodeState, Result};
use uuid::Uuid;

use crate::snapshot::NetworkSnapshot;

/// Records keyed by node id, iterated in discovery order.
///
/// Records are never removed; a node that drops out of later scans keeps its
/// last known state.
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    records: Vec<NodeRecord>,
    index: HashMap<String, usize>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&NodeRecord> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut NodeRecord> {
        match self.index.get(id) {
            Some(&i) => Some(&mut self.records[i]),
            None => None,
        }
    }

    /// Like [`NodeStore::get_mut`], but a missing record is an error.
    pub fn require_mut(&mut self, id: &str) -> Result<&mut NodeRecord> {
        self.get_mut(id)
            .ok_or_else(|| NetwatchError::NotFound { id: id.to_string() })
    }

    /// Lifecycle state of `id`; `Unknown` until a scan has stored it.
    pub fn state_of(&self, id: &str) -> NodeState {
        self.get(id).map_or(NodeState::Unknown, NodeRecord::state)
    }

    /// Insert a record, replacing any existing record with the same id in
    /// place. Returns the replaced record.
    pub fn insert(&mut self, record: NodeRecord) -> Option<NodeRecord> {
        if let Some(&i) = self.index.get(&record.id) {
            return Some(std::mem::replace(&mut self.records[i], record));
        }

        tracing::debug!("Storing new record for {}", record.id);
        self.index.insert(record.id.clone(), self.records.len());
        self.records.push(record);
        None
    }

    /// Records in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeRecord> {
        self.records.iter()
    }

    /// Ids in discovery order.
    pub fn ids(&self) -> Vec<String> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    /// Capture every record together with the caller's stats.
    pub fn snapshot(&self, caller: CallerStats, taken_at: DateTime<Utc>) -> NetworkSnapshot {
        NetworkSnapshot {
            id: Uuid::new_v4(),
            taken_at,
            caller,
            nodes: self.records.clone(),
        }
    }
}
