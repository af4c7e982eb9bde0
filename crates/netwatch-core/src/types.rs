//! Node records and caller state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest defense level a node can be weakened to.
pub const MIN_DEFENSE_LEVEL: f64 = 1.0;

/// Effective lifecycle state of a node as seen by this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Not yet returned by any scan.
    Unknown,
    /// In the store, access not elevated.
    Discovered,
    /// Access has been granted.
    Elevated,
}

/// The remote actions the engine can take against a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Elevate,
    Grow,
    ReduceDefense,
    Extract,
}

impl ActionKind {
    /// Verb used in log lines.
    pub fn verb(&self) -> &'static str {
        match self {
            ActionKind::Elevate => "elevate",
            ActionKind::Grow => "grow",
            ActionKind::ReduceDefense => "weaken",
            ActionKind::Extract => "extract from",
        }
    }
}

/// A full read of a node's observable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub has_elevated_access: bool,
    pub used_capacity: f64,
    pub max_capacity: f64,
    pub current_resource: f64,
    pub max_resource: f64,
    pub defense_level: f64,
    pub required_capability: u32,
    pub required_ports_open: u32,
}

/// Cached state of one discovered node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Unique node identifier.
    pub id: String,

    /// Once true, never reset by this system.
    pub has_elevated_access: bool,

    pub used_capacity: f64,
    pub max_capacity: f64,

    pub current_resource: f64,
    pub max_resource: f64,

    /// Never below [`MIN_DEFENSE_LEVEL`] once weakened.
    pub defense_level: f64,

    /// Fixed at discovery.
    pub required_capability: u32,

    /// Tracked only; no operation is gated on it.
    pub required_ports_open: u32,

    pub last_grow_at: DateTime<Utc>,
    pub last_reduce_defense_at: DateTime<Utc>,
    pub last_extract_at: DateTime<Utc>,
    pub last_refresh_at: DateTime<Utc>,
}

impl NodeRecord {
    /// Create the record for a node seen for the first time.
    pub fn discovered(id: impl Into<String>, telemetry: Telemetry, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            has_elevated_access: telemetry.has_elevated_access,
            used_capacity: telemetry.used_capacity,
            max_capacity: telemetry.max_capacity,
            current_resource: telemetry.current_resource,
            max_resource: telemetry.max_resource,
            defense_level: telemetry.defense_level.max(MIN_DEFENSE_LEVEL),
            required_capability: telemetry.required_capability,
            required_ports_open: telemetry.required_ports_open,
            last_grow_at: DateTime::<Utc>::UNIX_EPOCH,
            last_reduce_defense_at: DateTime::<Utc>::UNIX_EPOCH,
            last_extract_at: DateTime::<Utc>::UNIX_EPOCH,
            last_refresh_at: now,
        }
    }

    /// Returns true once `interval` has passed since the last refresh.
    pub fn needs_refresh(&self, now: DateTime<Utc>, interval: chrono::Duration) -> bool {
        now - self.last_refresh_at >= interval
    }

    /// Overwrite the telemetry fields from a fresh read.
    ///
    /// `required_capability` stays as discovered, elevation is never
    /// downgraded and the defense level never drops below the floor.
    pub fn apply_telemetry(&mut self, telemetry: Telemetry, now: DateTime<Utc>) {
        self.has_elevated_access |= telemetry.has_elevated_access;
        self.used_capacity = telemetry.used_capacity;
        self.max_capacity = telemetry.max_capacity;
        self.current_resource = telemetry.current_resource;
        self.max_resource = telemetry.max_resource;
        self.defense_level = telemetry.defense_level.max(MIN_DEFENSE_LEVEL);
        self.required_ports_open = telemetry.required_ports_open;
        self.last_refresh_at = now;
    }

    /// Store a defense level observed after weakening, clamped to the floor.
    pub fn set_weakened_defense(&mut self, observed: f64) {
        self.defense_level = observed.max(MIN_DEFENSE_LEVEL);
    }

    pub fn state(&self) -> NodeState {
        if self.has_elevated_access {
            NodeState::Elevated
        } else {
            NodeState::Discovered
        }
    }

    pub fn is_resource_maxed(&self) -> bool {
        self.current_resource >= self.max_resource
    }

    pub fn is_capacity_maxed(&self) -> bool {
        self.used_capacity >= self.max_capacity
    }

    pub fn is_fully_weakened(&self) -> bool {
        self.defense_level <= MIN_DEFENSE_LEVEL
    }

    /// Elevated, weakened and maxed: every action on it is a no-op.
    pub fn is_saturated(&self) -> bool {
        self.has_elevated_access
            && self.is_fully_weakened()
            && self.is_resource_maxed()
            && self.is_capacity_maxed()
    }

    /// Stamp the completion time of a successful action.
    pub fn mark_action(&mut self, kind: ActionKind, at: DateTime<Utc>) {
        match kind {
            ActionKind::Grow => self.last_grow_at = at,
            ActionKind::ReduceDefense => self.last_reduce_defense_at = at,
            ActionKind::Extract => self.last_extract_at = at,
            ActionKind::Elevate => {}
        }
    }
}

/// The caller's own host, captured once when the engine starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallerCapability {
    pub id: String,
    pub capability_level: u32,
    pub max_capacity: f64,
    pub used_capacity: f64,
    pub resource_balance: f64,
}

impl CallerCapability {
    /// Whether this caller is allowed to elevate the given node.
    pub fn can_elevate(&self, record: &NodeRecord) -> bool {
        self.capability_level >= record.required_capability
    }

    pub fn stats(&self) -> CallerStats {
        CallerStats {
            capability_level: self.capability_level,
            max_capacity: self.max_capacity,
            used_capacity: self.used_capacity,
            resource_balance: self.resource_balance,
        }
    }
}

/// Read-only view of the caller's own stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallerStats {
    pub capability_level: u32,
    pub max_capacity: f64,
    pub used_capacity: f64,
    pub resource_balance: f64,
}
