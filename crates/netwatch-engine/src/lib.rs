//! # Netwatch Engine
//!
//! Scans the caller's neighbors, caches their state and applies a fixed
//! per-node policy in a continuous loop:
//!
//! - [`Netwatch::scan`] - discover and refresh node records
//! - [`Netwatch::elevate`], [`Netwatch::grow`], [`Netwatch::reduce_defense`],
//!   [`Netwatch::extract`] - guarded remote actions
//! - [`Netwatch::run_cycle`] / [`Netwatch::run_forever`] - the loop
//! - [`Journal`] - leveled, timestamped outcome log

pub mod actions;
pub mod config;
pub mod engine;
pub mod journal;
pub mod scanner;

pub use actions::{ActionOutcome, Skip, WeakenReport, WeakenStop};
pub use config::NetwatchConfig;
pub use engine::{CycleReport, Netwatch};
pub use journal::{FileSink, Journal, LogSink, MemorySink};
pub use scanner::ScanReport;
