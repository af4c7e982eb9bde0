//! Point-in-time views of the store.

use chrono::{DateTime, Utc};
use netwatch_core::{CallerStats, NodeRecord, NodeState, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Every known node plus the caller's stats at one moment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    /// Unique ID for this snapshot.
    pub id: Uuid,

    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,

    /// Caller stats as captured at startup.
    pub caller: CallerStats,

    /// Records in discovery order.
    pub nodes: Vec<NodeRecord>,
}

impl NetworkSnapshot {
    pub fn get(&self, id: &str) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes in `state`.
    pub fn count_in(&self, state: NodeState) -> usize {
        self.nodes.iter().filter(|n| n.state() == state).count()
    }

    /// Number of nodes on which every action is now a no-op.
    pub fn saturated(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_saturated()).count()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
