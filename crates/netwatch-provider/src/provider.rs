//! Remote operation provider trait.

use std::time::Duration;

use async_trait::async_trait;
use netwatch_core::{Result, Telemetry};

/// The remote call surface the engine drives.
///
/// Every call is a suspension point. Own-host stats are read through the
/// per-node queries using the id returned by [`RemoteProvider::own_id`].
#[async_trait]
pub trait RemoteProvider: Send + Sync {
    /// Identifier of the host this process runs on.
    async fn own_id(&self) -> Result<String>;

    /// One-hop neighbors of `node`.
    async fn list_neighbors(&self, node: &str) -> Result<Vec<String>>;

    async fn has_elevated_access(&self, node: &str) -> Result<bool>;

    /// Attempt elevation. Refusal is not an error; re-query
    /// [`RemoteProvider::has_elevated_access`] to learn the result.
    async fn elevate_access(&self, node: &str) -> Result<()>;

    async fn used_capacity(&self, node: &str) -> Result<f64>;
    async fn max_capacity(&self, node: &str) -> Result<f64>;
    async fn resource_balance(&self, node: &str) -> Result<f64>;
    async fn max_resource(&self, node: &str) -> Result<f64>;
    async fn defense_level(&self, node: &str) -> Result<f64>;
    async fn required_capability(&self, node: &str) -> Result<u32>;
    async fn required_open_ports(&self, node: &str) -> Result<u32>;

    async fn grow_resource(&self, node: &str) -> Result<()>;
    async fn reduce_defense(&self, node: &str) -> Result<()>;
    async fn extract_resource(&self, node: &str) -> Result<()>;

    /// Capability level of the caller itself.
    async fn own_capability_level(&self) -> Result<u32>;

    /// Suspend the caller.
    async fn sleep(&self, duration: Duration);
}

/// Read every telemetry field of `node`, one call per field.
pub async fn fetch_telemetry<P>(provider: &P, node: &str) -> Result<Telemetry>
where
    P: RemoteProvider + ?Sized,
{
    Ok(Telemetry {
        has_elevated_access: provider.has_elevated_access(node).await?,
        used_capacity: provider.used_capacity(node).await?,
        max_capacity: provider.max_capacity(node).await?,
        current_resource: provider.resource_balance(node).await?,
        max_resource: provider.max_resource(node).await?,
        defense_level: provider.defense_level(node).await?,
        required_capability: provider.required_capability(node).await?,
        required_ports_open: provider.required_open_ports(node).await?,
    })
}
