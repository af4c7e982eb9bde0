//! # Netwatch Core
//!
//! Core records and primitives shared by every Netwatch crate.
//!
//! - [`NodeRecord`] - Cached state of one discovered node
//! - [`CallerCapability`] - The caller's own host, captured once
//! - [`LogEntry`] - One journal line
//! - [`NetwatchError`] - Error types

pub mod clock;
pub mod error;
pub mod log;
pub mod types;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{NetwatchError, Result};
pub use log::{LogEntry, LogLevel};
pub use types::*;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::error::{NetwatchError, Result};
    pub use crate::log::{LogEntry, LogLevel};
    pub use crate::types::{ActionKind, CallerCapability, CallerStats, NodeRecord, NodeState};
}
