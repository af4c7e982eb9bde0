//! In-memory simulated network.
//!
//! Deterministic, records every call it receives and can be told to fail
//! specific operations, which is what the engine's tests lean on.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use netwatch_core::{NetwatchError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::provider::RemoteProvider;

/// Provider operations, as recorded by [`SimulatedNetwork`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    OwnId,
    ListNeighbors,
    HasElevatedAccess,
    ElevateAccess,
    UsedCapacity,
    MaxCapacity,
    ResourceBalance,
    MaxResource,
    DefenseLevel,
    RequiredCapability,
    RequiredOpenPorts,
    GrowResource,
    ReduceDefense,
    ExtractResource,
    OwnCapabilityLevel,
    Sleep,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::OwnId => "own_id",
            Operation::ListNeighbors => "list_neighbors",
            Operation::HasElevatedAccess => "has_elevated_access",
            Operation::ElevateAccess => "elevate_access",
            Operation::UsedCapacity => "used_capacity",
            Operation::MaxCapacity => "max_capacity",
            Operation::ResourceBalance => "resource_balance",
            Operation::MaxResource => "max_resource",
            Operation::DefenseLevel => "defense_level",
            Operation::RequiredCapability => "required_capability",
            Operation::RequiredOpenPorts => "required_open_ports",
            Operation::GrowResource => "grow_resource",
            Operation::ReduceDefense => "reduce_defense",
            Operation::ExtractResource => "extract_resource",
            Operation::OwnCapabilityLevel => "own_capability_level",
            Operation::Sleep => "sleep",
        }
    }

    /// Read-only per-node queries.
    pub fn is_telemetry(&self) -> bool {
        matches!(
            self,
            Operation::HasElevatedAccess
                | Operation::UsedCapacity
                | Operation::MaxCapacity
                | Operation::ResourceBalance
                | Operation::MaxResource
                | Operation::DefenseLevel
                | Operation::RequiredCapability
                | Operation::RequiredOpenPorts
        )
    }

    /// Calls that change remote state.
    pub fn is_action(&self) -> bool {
        matches!(
            self,
            Operation::ElevateAccess
                | Operation::GrowResource
                | Operation::ReduceDefense
                | Operation::ExtractResource
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A recorded provider call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCall {
    pub op: Operation,
    /// Empty for calls that take no node.
    pub node: String,
}

/// Server-side state of one simulated node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedNode {
    pub id: String,
    pub elevated: bool,
    pub used_capacity: f64,
    pub max_capacity: f64,
    pub resource: f64,
    pub max_resource: f64,
    pub defense: f64,
    /// Floor that weakening stops at.
    pub min_defense: f64,
    pub required_capability: u32,
    pub required_ports: u32,
    /// Elevation succeeds only with `open_ports >= required_ports`.
    pub open_ports: u32,
    pub grow_step: f64,
    pub weaken_step: f64,
    /// Share of the current resource one extraction takes.
    pub extract_fraction: f64,
    /// Capacity consumed by one extraction.
    pub extract_cost: f64,
}

impl SimulatedNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            elevated: false,
            used_capacity: 0.0,
            max_capacity: 16.0,
            resource: 0.0,
            max_resource: 0.0,
            defense: 1.0,
            min_defense: 1.0,
            required_capability: 1,
            required_ports: 0,
            open_ports: 0,
            grow_step: 25_000.0,
            weaken_step: 1.0,
            extract_fraction: 0.1,
            extract_cost: 1.0,
        }
    }

    pub fn with_capacity(mut self, used: f64, max: f64) -> Self {
        self.used_capacity = used;
        self.max_capacity = max;
        self
    }

    pub fn with_resource(mut self, current: f64, max: f64) -> Self {
        self.resource = current;
        self.max_resource = max;
        self
    }

    pub fn with_defense(mut self, defense: f64) -> Self {
        self.defense = defense;
        self
    }

    pub fn with_requirements(mut self, capability: u32, ports: u32) -> Self {
        self.required_capability = capability;
        self.required_ports = ports;
        self
    }

    pub fn with_open_ports(mut self, open: u32) -> Self {
        self.open_ports = open;
        self
    }

    pub fn with_weaken_step(mut self, step: f64) -> Self {
        self.weaken_step = step;
        self
    }

    pub fn with_grow_step(mut self, step: f64) -> Self {
        self.grow_step = step;
        self
    }

    pub fn elevated(mut self) -> Self {
        self.elevated = true;
        self
    }
}

struct Network {
    home: String,
    capability_level: u32,
    nodes: HashMap<String, SimulatedNode>,
    links: HashMap<String, Vec<String>>,
    calls: Vec<ProviderCall>,
    failures: HashSet<(Operation, String)>,
}

impl Network {
    /// Record the call, then apply any injected failure.
    fn record(&mut self, op: Operation, node: &str) -> Result<()> {
        self.calls.push(ProviderCall {
            op,
            node: node.to_string(),
        });

        if self.failures.contains(&(op, node.to_string())) {
            return Err(NetwatchError::provider(op.name(), node, "injected failure"));
        }

        Ok(())
    }

    fn node(&self, op: Operation, id: &str) -> Result<&SimulatedNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| NetwatchError::provider(op.name(), id, "no such host"))
    }

    fn node_mut(&mut self, op: Operation, id: &str) -> Result<&mut SimulatedNode> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| NetwatchError::provider(op.name(), id, "no such host"))
    }

    fn query<T>(&mut self, op: Operation, id: &str, f: impl FnOnce(&SimulatedNode) -> T) -> Result<T> {
        self.record(op, id)?;
        self.node(op, id).map(f)
    }
}

/// A [`RemoteProvider`] backed by an in-memory topology.
pub struct SimulatedNetwork {
    inner: RwLock<Network>,
}

impl SimulatedNetwork {
    /// Create a network containing only the caller's own host.
    pub fn new(home: SimulatedNode, capability_level: u32) -> Self {
        let home_id = home.id.clone();
        let mut nodes = HashMap::new();
        nodes.insert(home_id.clone(), home);

        Self {
            inner: RwLock::new(Network {
                home: home_id,
                capability_level,
                nodes,
                links: HashMap::new(),
                calls: Vec::new(),
                failures: HashSet::new(),
            }),
        }
    }

    /// Add a node and link it to the home host.
    pub fn with_neighbor(mut self, node: SimulatedNode) -> Self {
        let home = self.inner.get_mut().home.clone();
        let id = node.id.clone();
        self.with_node(node).with_link(&home, &id)
    }

    /// Add a node without linking it.
    pub fn with_node(mut self, node: SimulatedNode) -> Self {
        let net = self.inner.get_mut();
        net.nodes.insert(node.id.clone(), node);
        self
    }

    /// Link two nodes in both directions.
    pub fn with_link(mut self, a: &str, b: &str) -> Self {
        let net = self.inner.get_mut();
        net.links.entry(a.to_string()).or_default().push(b.to_string());
        net.links.entry(b.to_string()).or_default().push(a.to_string());
        self
    }

    /// A small fixed topology for running the binary without a live network.
    pub fn demo() -> Self {
        let home = SimulatedNode::new("home")
            .with_capacity(8.0, 32.0)
            .with_requirements(0, 0)
            .elevated();

        Self::new(home, 5)
            .with_neighbor(
                SimulatedNode::new("n00dles")
                    .with_capacity(0.0, 4.0)
                    .with_resource(70_000.0, 1_750_000.0)
                    .with_defense(1.0)
                    .with_requirements(1, 0),
            )
            .with_neighbor(
                SimulatedNode::new("foodnstuff")
                    .with_capacity(0.0, 16.0)
                    .with_resource(2_000_000.0, 50_000_000.0)
                    .with_defense(3.0)
                    .with_requirements(1, 0),
            )
            .with_neighbor(
                SimulatedNode::new("sigma-cosmetics")
                    .with_capacity(0.0, 16.0)
                    .with_resource(2_300_000.0, 57_500_000.0)
                    .with_defense(3.0)
                    .with_requirements(5, 0),
            )
            .with_neighbor(
                SimulatedNode::new("joesguns")
                    .with_capacity(0.0, 16.0)
                    .with_resource(2_500_000.0, 62_500_000.0)
                    .with_defense(5.0)
                    .with_requirements(10, 0),
            )
            .with_neighbor(
                SimulatedNode::new("hong-fang-tea")
                    .with_capacity(0.0, 16.0)
                    .with_resource(3_000_000.0, 75_000_000.0)
                    .with_defense(5.0)
                    .with_requirements(30, 0),
            )
            .with_neighbor(
                SimulatedNode::new("CSEC")
                    .with_capacity(0.0, 8.0)
                    .with_resource(0.0, 0.0)
                    .with_defense(5.0)
                    .with_requirements(1, 1),
            )
    }

    /// Make every future `op` call against `node` fail.
    pub async fn fail_on(&self, op: Operation, node: &str) {
        self.inner.write().await.failures.insert((op, node.to_string()));
    }

    pub async fn clear_failures(&self) {
        self.inner.write().await.failures.clear();
    }

    /// Change a node's server-side state.
    pub async fn update_node(&self, id: &str, f: impl FnOnce(&mut SimulatedNode)) {
        if let Some(node) = self.inner.write().await.nodes.get_mut(id) {
            f(node);
        }
    }

    /// Add a node linked to home while the network is in use.
    pub async fn add_neighbor(&self, node: SimulatedNode) {
        let mut net = self.inner.write().await;
        let home = net.home.clone();
        let id = node.id.clone();
        net.nodes.insert(id.clone(), node);
        net.links.entry(home.clone()).or_default().push(id.clone());
        net.links.entry(id).or_default().push(home);
    }

    /// Remove the link between two nodes, leaving both in the network.
    pub async fn unlink(&self, a: &str, b: &str) {
        let mut net = self.inner.write().await;
        if let Some(list) = net.links.get_mut(a) {
            list.retain(|n| n != b);
        }
        if let Some(list) = net.links.get_mut(b) {
            list.retain(|n| n != a);
        }
    }

    pub async fn node(&self, id: &str) -> Option<SimulatedNode> {
        self.inner.read().await.nodes.get(id).cloned()
    }

    pub async fn calls(&self) -> Vec<ProviderCall> {
        self.inner.read().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.inner.write().await.calls.clear();
    }

    /// Number of `op` calls made against `node`.
    pub async fn count(&self, op: Operation, node: &str) -> usize {
        self.inner
            .read()
            .await
            .calls
            .iter()
            .filter(|c| c.op == op && c.node == node)
            .count()
    }

    /// Number of telemetry queries made against `node`.
    pub async fn telemetry_calls(&self, node: &str) -> usize {
        self.inner
            .read()
            .await
            .calls
            .iter()
            .filter(|c| c.op.is_telemetry() && c.node == node)
            .count()
    }

    /// Number of state-changing calls made against any node.
    pub async fn action_calls(&self) -> usize {
        self.inner
            .read()
            .await
            .calls
            .iter()
            .filter(|c| c.op.is_action())
            .count()
    }
}

#[async_trait]
impl RemoteProvider for SimulatedNetwork {
    async fn own_id(&self) -> Result<String> {
        let mut net = self.inner.write().await;
        net.record(Operation::OwnId, "")?;
        Ok(net.home.clone())
    }

    async fn list_neighbors(&self, node: &str) -> Result<Vec<String>> {
        let mut net = self.inner.write().await;
        net.record(Operation::ListNeighbors, node)?;
        Ok(net.links.get(node).cloned().unwrap_or_default())
    }

    async fn has_elevated_access(&self, node: &str) -> Result<bool> {
        self.inner
            .write()
            .await
            .query(Operation::HasElevatedAccess, node, |n| n.elevated)
    }

    async fn elevate_access(&self, node: &str) -> Result<()> {
        let mut net = self.inner.write().await;
        net.record(Operation::ElevateAccess, node)?;
        let target = net.node_mut(Operation::ElevateAccess, node)?;
        if target.open_ports >= target.required_ports {
            target.elevated = true;
        } else {
            tracing::debug!(
                "{} refused elevation: {}/{} ports open",
                node,
                target.open_ports,
                target.required_ports
            );
        }
        Ok(())
    }

    async fn used_capacity(&self, node: &str) -> Result<f64> {
        self.inner
            .write()
            .await
            .query(Operation::UsedCapacity, node, |n| n.used_capacity)
    }

    async fn max_capacity(&self, node: &str) -> Result<f64> {
        self.inner
            .write()
            .await
            .query(Operation::MaxCapacity, node, |n| n.max_capacity)
    }

    async fn resource_balance(&self, node: &str) -> Result<f64> {
        self.inner
            .write()
            .await
            .query(Operation::ResourceBalance, node, |n| n.resource)
    }

    async fn max_resource(&self, node: &str) -> Result<f64> {
        self.inner
            .write()
            .await
            .query(Operation::MaxResource, node, |n| n.max_resource)
    }

    async fn defense_level(&self, node: &str) -> Result<f64> {
        self.inner
            .write()
            .await
            .query(Operation::DefenseLevel, node, |n| n.defense)
    }

    async fn required_capability(&self, node: &str) -> Result<u32> {
        self.inner
            .write()
            .await
            .query(Operation::RequiredCapability, node, |n| n.required_capability)
    }

    async fn required_open_ports(&self, node: &str) -> Result<u32> {
        self.inner
            .write()
            .await
            .query(Operation::RequiredOpenPorts, node, |n| n.required_ports)
    }

    async fn grow_resource(&self, node: &str) -> Result<()> {
        let mut net = self.inner.write().await;
        net.record(Operation::GrowResource, node)?;
        let target = net.node_mut(Operation::GrowResource, node)?;
        target.resource = (target.resource + target.grow_step).min(target.max_resource);
        Ok(())
    }

    async fn reduce_defense(&self, node: &str) -> Result<()> {
        let mut net = self.inner.write().await;
        net.record(Operation::ReduceDefense, node)?;
        let target = net.node_mut(Operation::ReduceDefense, node)?;
        target.defense = (target.defense - target.weaken_step).max(target.min_defense);
        Ok(())
    }

    async fn extract_resource(&self, node: &str) -> Result<()> {
        let mut net = self.inner.write().await;
        net.record(Operation::ExtractResource, node)?;
        let target = net.node_mut(Operation::ExtractResource, node)?;
        let taken = target.resource * target.extract_fraction;
        target.resource -= taken;
        target.used_capacity = (target.used_capacity + target.extract_cost).min(target.max_capacity);

        let home = net.home.clone();
        let own = net.node_mut(Operation::ExtractResource, &home)?;
        own.resource += taken;
        Ok(())
    }

    async fn own_capability_level(&self) -> Result<u32> {
        let mut net = self.inner.write().await;
        net.record(Operation::OwnCapabilityLevel, "")?;
        Ok(net.capability_level)
    }

    async fn sleep(&self, duration: Duration) {
        {
            let mut net = self.inner.write().await;
            net.calls.push(ProviderCall {
                op: Operation::Sleep,
                node: String::new(),
            });
        }
        tokio::time::sleep(duration).await;
    }
}
