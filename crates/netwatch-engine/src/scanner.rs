//! Topology scanning and refresh gating.

use netwatch_core::{LogLevel, NodeRecord, Result};
use netwatch_provider::fetch_telemetry;
use serde::Serialize;
use tracing::debug;

use crate::engine::Netwatch;

/// What one scan did with each neighbor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// New records inserted.
    pub discovered: Vec<String>,
    /// Existing records whose telemetry was re-read.
    pub refreshed: Vec<String>,
    /// Existing records left untouched, still within the refresh interval.
    pub fresh: Vec<String>,
    /// Neighbors whose telemetry could not be read.
    pub failed: Vec<String>,
}

impl ScanReport {
    pub fn neighbors(&self) -> usize {
        self.discovered.len() + self.refreshed.len() + self.fresh.len() + self.failed.len()
    }
}

impl Netwatch {
    /// Query the one-hop neighbors of the caller's host, insert new records
    /// and refresh stale ones.
    ///
    /// Telemetry failures are isolated per node; only a failure to list the
    /// neighbors fails the scan.
    pub async fn scan(&mut self) -> Result<ScanReport> {
        let neighbors = self.provider.list_neighbors(&self.caller.id).await?;
        let now = self.clock.now();
        let interval = self.config.refresh_interval();
        let mut report = ScanReport::default();

        for id in &neighbors {
            let due = self.store.get(id).map(|r| r.needs_refresh(now, interval));

            match due {
                Some(false) => report.fresh.push(id.clone()),
                Some(true) => match fetch_telemetry(self.provider.as_ref(), id).await {
                    Ok(telemetry) => {
                        if let Some(record) = self.store.get_mut(id) {
                            record.apply_telemetry(telemetry, now);
                        }
                        self.journal.log(LogLevel::Scan, format!("Refreshed {}", id));
                        report.refreshed.push(id.clone());
                    }
                    Err(e) => {
                        self.journal.error(format!("Failed to refresh {}: {}", id, e));
                        report.failed.push(id.clone());
                    }
                },
                None => match fetch_telemetry(self.provider.as_ref(), id).await {
                    Ok(telemetry) => {
                        self.store.insert(NodeRecord::discovered(id.clone(), telemetry, now));
                        self.journal.log(LogLevel::Scan, format!("Discovered {}", id));
                        report.discovered.push(id.clone());
                    }
                    Err(e) => {
                        self.journal.error(format!("Failed to scan {}: {}", id, e));
                        report.failed.push(id.clone());
                    }
                },
            }
        }

        debug!(
            "Scanned {} neighbors of {}: {} new, {} refreshed, {} failed",
            neighbors.len(),
            self.caller.id,
            report.discovered.len(),
            report.refreshed.len(),
            report.failed.len()
        );

        self.visible = neighbors;
        Ok(report)
    }
}
