//! # Netwatch State
//!
//! In-memory node record store with snapshots.

pub mod snapshot;
pub mod store;

pub use snapshot::NetworkSnapshot;
pub use store::NodeStore;
