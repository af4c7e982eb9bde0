//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

use netwatch_core::{NetwatchError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the orchestration loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetwatchConfig {
    /// Minimum age of a record before its telemetry is re-queried.
    pub refresh_interval_ms: u64,

    /// Pause between two cycles.
    pub cycle_delay_ms: u64,

    /// Upper bound on weaken calls against one node in one cycle.
    pub max_weaken_attempts: u32,

    /// Append-only journal file.
    pub log_path: PathBuf,
}

impl Default for NetwatchConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 60_000,
            cycle_delay_ms: 1_000,
            max_weaken_attempts: 64,
            log_path: PathBuf::from("netwatch.log.txt"),
        }
    }
}

impl NetwatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_weaken_attempts == 0 {
            return Err(NetwatchError::Config(
                "max_weaken_attempts must be greater than zero".to_string(),
            ));
        }
        if self.log_path.as_os_str().is_empty() {
            return Err(NetwatchError::Config("log_path must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::try_from(self.refresh_interval_ms).unwrap_or(i64::MAX))
    }

    pub fn cycle_delay(&self) -> Duration {
        Duration::from_millis(self.cycle_delay_ms)
    }
}
