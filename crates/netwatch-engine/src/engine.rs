//! The orchestration loop.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use netwatch_core::{
    CallerCapability, CallerStats, Clock, NodeRecord, NodeState, Result, SystemClock,
};
use netwatch_provider::RemoteProvider;
use netwatch_state::{NetworkSnapshot, NodeStore};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::actions::ActionOutcome;
use crate::config::NetwatchConfig;
use crate::journal::Journal;
use crate::scanner::ScanReport;

/// Owns the node store and the caller snapshot, and drives the provider.
pub struct Netwatch {
    pub(crate) provider: Arc<dyn RemoteProvider>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) journal: Journal,
    pub(crate) config: NetwatchConfig,

    /// Captured once in [`Netwatch::connect`]; the loop never re-polls it.
    pub(crate) caller: CallerCapability,

    pub(crate) store: NodeStore,

    /// Neighbor ids returned by the latest scan, in provider order.
    pub(crate) visible: Vec<String>,

    cycles: u64,
}

/// Summary of one pass of [`Netwatch::run_cycle`].
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub id: Uuid,
    /// 1-based cycle number.
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub scan: ScanReport,
    pub visited: usize,
    /// Remote actions performed.
    pub applied: usize,
    /// Actions skipped by a precondition.
    pub skipped: usize,
}

impl CycleReport {
    fn new(cycle: u64, started_at: DateTime<Utc>, scan: ScanReport) -> Self {
        Self {
            id: Uuid::new_v4(),
            cycle,
            started_at,
            finished_at: started_at,
            scan,
            visited: 0,
            applied: 0,
            skipped: 0,
        }
    }

    fn count(&mut self, outcome: &ActionOutcome) {
        if outcome.is_applied() {
            self.applied += 1;
        } else {
            self.skipped += 1;
        }
    }
}

impl Netwatch {
    /// Capture the caller's own state and build an engine with an empty store.
    pub async fn connect(
        provider: Arc<dyn RemoteProvider>,
        journal: Journal,
        config: NetwatchConfig,
    ) -> Result<Self> {
        Self::connect_with_clock(provider, journal, config, Arc::new(SystemClock)).await
    }

    pub async fn connect_with_clock(
        provider: Arc<dyn RemoteProvider>,
        journal: Journal,
        config: NetwatchConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let id = provider.own_id().await?;
        let caller = CallerCapability {
            capability_level: provider.own_capability_level().await?,
            max_capacity: provider.max_capacity(&id).await?,
            used_capacity: provider.used_capacity(&id).await?,
            resource_balance: provider.resource_balance(&id).await?,
            id,
        };

        info!(
            "Netwatch attached to {} at capability level {}",
            caller.id, caller.capability_level
        );

        Ok(Self {
            provider,
            clock,
            journal,
            config,
            caller,
            store: NodeStore::new(),
            visible: Vec::new(),
            cycles: 0,
        })
    }

    /// Records in discovery order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.store.iter()
    }

    pub fn node(&self, id: &str) -> Option<&NodeRecord> {
        self.store.get(id)
    }

    /// Lifecycle state of `id` as known to this process.
    pub fn state_of(&self, id: &str) -> NodeState {
        self.store.state_of(id)
    }

    /// Ids returned by the latest scan.
    pub fn visible(&self) -> &[String] {
        &self.visible
    }

    /// The caller's own stats as captured at startup.
    pub fn stats(&self) -> CallerStats {
        self.caller.stats()
    }

    pub fn caller(&self) -> &CallerCapability {
        &self.caller
    }

    pub fn config(&self) -> &NetwatchConfig {
        &self.config
    }

    pub fn snapshot(&self) -> NetworkSnapshot {
        self.store.snapshot(self.stats(), self.clock.now())
    }

    /// Number of cycles started so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Nodes to visit this cycle: store order, restricted to the latest scan.
    fn cycle_targets(&self) -> Vec<String> {
        self.store
            .iter()
            .filter(|r| self.visible.contains(&r.id))
            .map(|r| r.id.clone())
            .collect()
    }

    /// One pass: scan, then elevate, grow, weaken to the floor and extract on
    /// every visible node in turn.
    ///
    /// A provider failure during an action ends the cycle early.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.cycles += 1;
        let started_at = self.clock.now();

        let scan = self.scan().await?;
        let mut report = CycleReport::new(self.cycles, started_at, scan);

        for id in self.cycle_targets() {
            report.visited += 1;

            let can_elevate = self
                .store
                .get(&id)
                .is_some_and(|r| self.caller.can_elevate(r));
            if can_elevate {
                let outcome = self.elevate(&id).await?;
                report.count(&outcome);
            }

            let elevated = self.store.get(&id).is_some_and(|r| r.has_elevated_access);
            if !elevated {
                continue;
            }

            let outcome = self.grow(&id).await?;
            report.count(&outcome);

            let weaken = self.weaken_to_floor(&id).await?;
            report.applied += weaken.attempts as usize;

            let outcome = self.extract(&id).await?;
            report.count(&outcome);
        }

        report.finished_at = self.clock.now();
        debug!(
            "Cycle {} visited {} nodes: {} applied, {} skipped",
            report.cycle, report.visited, report.applied, report.skipped
        );

        Ok(report)
    }

    /// Run cycles until the process is terminated, sleeping
    /// `cycle_delay_ms` between them. A failed cycle is journaled and the
    /// next one retries.
    pub async fn run_forever(&mut self) {
        info!(
            "Netwatch loop started on {} (cycle delay {}ms)",
            self.caller.id, self.config.cycle_delay_ms
        );

        loop {
            if let Err(e) = self.run_cycle().await {
                self.journal
                    .error(format!("Cycle {} aborted: {}", self.cycles, e));
            }

            self.provider.sleep(self.config.cycle_delay()).await;
        }
    }
}
