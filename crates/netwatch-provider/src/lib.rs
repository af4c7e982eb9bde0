//! # Netwatch Provider
//!
//! The remote operation provider contract and an in-memory implementation.

pub mod provider;
pub mod simulated;

pub use provider::{fetch_telemetry, RemoteProvider};
pub use simulated::{Operation, ProviderCall, SimulatedNetwork, SimulatedNode};
