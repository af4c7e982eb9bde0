//! Action preconditions and executors.
//!
//! Every executor checks its preconditions against the cached record first.
//! A failed precondition is journaled and returned as [`ActionOutcome::Skipped`]
//! without any remote call. Provider failures propagate.

use netwatch_core::{ActionKind, LogLevel, NodeRecord, Result};

use crate::engine::Netwatch;

/// Why an action was not attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    NotFound,
    CapabilityTooLow { required: u32, level: u32 },
    NotElevated,
    AlreadyElevated,
    /// Resource or capacity already at its maximum.
    AlreadyMaxed,
    AlreadyWeakened,
}

impl Skip {
    /// Hard preconditions log as errors, already-satisfied states as warnings.
    pub fn level(&self) -> LogLevel {
        match self {
            Skip::NotFound | Skip::CapabilityTooLow { .. } | Skip::NotElevated => LogLevel::Error,
            Skip::AlreadyElevated | Skip::AlreadyMaxed | Skip::AlreadyWeakened => {
                LogLevel::Warning
            }
        }
    }

    pub fn message(&self, kind: ActionKind, node: &str) -> String {
        match self {
            Skip::NotFound => format!("Cannot {} {}, node not found", kind.verb(), node),
            Skip::CapabilityTooLow { required, .. } => format!(
                "Cannot {} {}, required capability level is {}",
                kind.verb(),
                node,
                required
            ),
            Skip::NotElevated => format!("Cannot {} {}, not elevated", kind.verb(), node),
            Skip::AlreadyElevated => format!("Already elevated on {}", node),
            Skip::AlreadyMaxed => format!("{} is already maxed out", node),
            Skip::AlreadyWeakened => format!("{} is already weakened", node),
        }
    }
}

/// Result of one action attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The remote primitive was called and the record updated.
    Applied,
    Skipped(Skip),
}

impl ActionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ActionOutcome::Applied)
    }
}

/// Why [`Netwatch::weaken_to_floor`] stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum WeakenStop {
    /// Defense is at the floor.
    Floor,
    /// A call left the defense level where it was.
    NoProgress { level: f64 },
    /// `max_weaken_attempts` calls were made without reaching the floor.
    AttemptLimit,
    /// A precondition stopped the first call.
    Skipped(Skip),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeakenReport {
    /// Remote weaken calls made.
    pub attempts: u32,
    pub stop: WeakenStop,
}

impl Netwatch {
    fn skip(&self, kind: ActionKind, node: &str, skip: Skip) -> ActionOutcome {
        self.journal.log(skip.level(), skip.message(kind, node));
        ActionOutcome::Skipped(skip)
    }

    /// The record for `id`, provided access on it is elevated.
    fn elevated_record(&self, id: &str) -> std::result::Result<&NodeRecord, Skip> {
        let record = self.store.get(id).ok_or(Skip::NotFound)?;
        if !record.has_elevated_access {
            return Err(Skip::NotElevated);
        }
        Ok(record)
    }

    /// Gain elevated access on a node.
    ///
    /// Open prerequisite ports are not checked here; if the provider refuses,
    /// the re-queried status simply stays false.
    pub async fn elevate(&mut self, id: &str) -> Result<ActionOutcome> {
        let kind = ActionKind::Elevate;
        let Some(record) = self.store.get(id) else {
            return Ok(self.skip(kind, id, Skip::NotFound));
        };

        if !self.caller.can_elevate(record) {
            let skip = Skip::CapabilityTooLow {
                required: record.required_capability,
                level: self.caller.capability_level,
            };
            return Ok(self.skip(kind, id, skip));
        }

        if record.has_elevated_access {
            return Ok(self.skip(kind, id, Skip::AlreadyElevated));
        }

        self.journal.info(format!("Elevating access on {}...", id));
        self.provider.elevate_access(id).await?;
        let granted = self.provider.has_elevated_access(id).await?;

        let record = self.store.require_mut(id)?;
        record.has_elevated_access |= granted;

        if granted {
            self.journal.info(format!("Elevated on {}", id));
        } else {
            self.journal.info(format!("Elevation on {} was not granted", id));
        }

        Ok(ActionOutcome::Applied)
    }

    /// Grow the node's resource toward its maximum.
    pub async fn grow(&mut self, id: &str) -> Result<ActionOutcome> {
        let kind = ActionKind::Grow;
        let record = match self.elevated_record(id) {
            Ok(record) => record,
            Err(skip) => return Ok(self.skip(kind, id, skip)),
        };

        if record.is_resource_maxed() {
            return Ok(self.skip(kind, id, Skip::AlreadyMaxed));
        }

        self.journal.log(LogLevel::Grow, format!("Growing {}...", id));
        self.provider.grow_resource(id).await?;
        let current = self.provider.resource_balance(id).await?;
        let now = self.clock.now();

        let record = self.store.require_mut(id)?;
        record.current_resource = current;
        record.mark_action(kind, now);

        Ok(ActionOutcome::Applied)
    }

    /// Lower the node's defense level by one provider call.
    pub async fn reduce_defense(&mut self, id: &str) -> Result<ActionOutcome> {
        let kind = ActionKind::ReduceDefense;
        let record = match self.elevated_record(id) {
            Ok(record) => record,
            Err(skip) => return Ok(self.skip(kind, id, skip)),
        };

        if record.is_fully_weakened() {
            return Ok(self.skip(kind, id, Skip::AlreadyWeakened));
        }

        self.journal.log(LogLevel::Weaken, format!("Weakening {}...", id));
        self.provider.reduce_defense(id).await?;
        let observed = self.provider.defense_level(id).await?;
        let now = self.clock.now();

        let record = self.store.require_mut(id)?;
        record.set_weakened_defense(observed);
        record.mark_action(kind, now);
        let level = record.defense_level;

        self.journal
            .info(format!("Defense level on {} is now {}", id, level));

        Ok(ActionOutcome::Applied)
    }

    /// Extract resource from the node.
    pub async fn extract(&mut self, id: &str) -> Result<ActionOutcome> {
        let kind = ActionKind::Extract;
        let record = match self.elevated_record(id) {
            Ok(record) => record,
            Err(skip) => return Ok(self.skip(kind, id, skip)),
        };

        if record.is_capacity_maxed() {
            return Ok(self.skip(kind, id, Skip::AlreadyMaxed));
        }

        self.journal.log(LogLevel::Hack, format!("Extracting from {}...", id));
        self.provider.extract_resource(id).await?;
        let used = self.provider.used_capacity(id).await?;
        let now = self.clock.now();

        let record = self.store.require_mut(id)?;
        record.used_capacity = used;
        record.mark_action(kind, now);

        Ok(ActionOutcome::Applied)
    }

    /// Call [`Netwatch::reduce_defense`] until the defense floor is reached.
    ///
    /// Bounded by `max_weaken_attempts`, and stops early when a call makes no
    /// progress.
    pub async fn weaken_to_floor(&mut self, id: &str) -> Result<WeakenReport> {
        let mut attempts = 0;

        loop {
            let before = match self.store.get(id) {
                Some(record) if record.is_fully_weakened() => {
                    return Ok(WeakenReport {
                        attempts,
                        stop: WeakenStop::Floor,
                    });
                }
                Some(record) => record.defense_level,
                None => {
                    let outcome = self.skip(ActionKind::ReduceDefense, id, Skip::NotFound);
                    return Ok(WeakenReport {
                        attempts,
                        stop: skipped(outcome),
                    });
                }
            };

            if attempts >= self.config.max_weaken_attempts {
                self.journal.warning(format!(
                    "Giving up on weakening {} after {} attempts, defense level is {}",
                    id, attempts, before
                ));
                return Ok(WeakenReport {
                    attempts,
                    stop: WeakenStop::AttemptLimit,
                });
            }

            let outcome = self.reduce_defense(id).await?;
            if !outcome.is_applied() {
                return Ok(WeakenReport {
                    attempts,
                    stop: skipped(outcome),
                });
            }
            attempts += 1;

            let after = self.store.get(id).map_or(before, |r| r.defense_level);
            if after >= before && after > netwatch_core::MIN_DEFENSE_LEVEL {
                self.journal.warning(format!(
                    "Weakening {} made no progress, defense level is {}",
                    id, after
                ));
                return Ok(WeakenReport {
                    attempts,
                    stop: WeakenStop::NoProgress { level: after },
                });
            }
        }
    }
}

fn skipped(outcome: ActionOutcome) -> WeakenStop {
    match outcome {
        ActionOutcome::Skipped(skip) => WeakenStop::Skipped(skip),
        ActionOutcome::Applied => WeakenStop::Floor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netwatch_provider::{Operation, SimulatedNetwork, SimulatedNode};

    use crate::test_support::{harness, home, Harness};

    async fn scanned(net: SimulatedNetwork) -> Harness {
        let mut h = harness(net).await;
        h.netwatch.scan().await.unwrap();
        h.sink.clear();
        h
    }

    #[tokio::test]
    async fn test_elevate_n00dles() {
        let net = SimulatedNetwork::new(home(), 5)
            .with_neighbor(SimulatedNode::new("n00dles").with_requirements(1, 0));
        let mut h = scanned(net).await;
        assert!(!h.netwatch.node("n00dles").unwrap().has_elevated_access);

        let outcome = h.netwatch.elevate("n00dles").await.unwrap();

        assert_eq!(outcome, ActionOutcome::Applied);
        assert_eq!(h.net.count(Operation::ElevateAccess, "n00dles").await, 1);
        assert!(h.netwatch.node("n00dles").unwrap().has_elevated_access);
        assert_eq!(
            h.sink.messages_at(LogLevel::Info),
            vec!["Elevating access on n00dles...", "Elevated on n00dles"]
        );
    }

    #[tokio::test]
    async fn test_elevate_refused_by_provider() {
        let net = SimulatedNetwork::new(home(), 5)
            .with_neighbor(SimulatedNode::new("CSEC").with_requirements(1, 1));
        let mut h = scanned(net).await;

        let outcome = h.netwatch.elevate("CSEC").await.unwrap();

        assert_eq!(outcome, ActionOutcome::Applied);
        assert!(!h.netwatch.node("CSEC").unwrap().has_elevated_access);
        assert!(h.sink.messages_at(LogLevel::Error).is_empty());
    }

    #[tokio::test]
    async fn test_elevate_capability_too_low() {
        let net = SimulatedNetwork::new(home(), 5)
            .with_neighbor(SimulatedNode::new("joesguns").with_requirements(10, 0));
        let mut h = scanned(net).await;
        let before = h.netwatch.node("joesguns").cloned();

        let outcome = h.netwatch.elevate("joesguns").await.unwrap();

        assert_eq!(
            outcome,
            ActionOutcome::Skipped(Skip::CapabilityTooLow {
                required: 10,
                level: 5
            })
        );
        assert_eq!(h.net.action_calls().await, 0);
        assert_eq!(h.netwatch.node("joesguns").cloned(), before);
        assert_eq!(
            h.sink.messages_at(LogLevel::Error),
            vec!["Cannot elevate joesguns, required capability level is 10"]
        );
    }

    #[tokio::test]
    async fn test_elevate_twice_warns() {
        let net = SimulatedNetwork::new(home(), 5).with_neighbor(SimulatedNode::new("n00dles"));
        let mut h = scanned(net).await;

        h.netwatch.elevate("n00dles").await.unwrap();
        let before = h.netwatch.node("n00dles").cloned();
        h.sink.clear();

        let outcome = h.netwatch.elevate("n00dles").await.unwrap();

        assert_eq!(outcome, ActionOutcome::Skipped(Skip::AlreadyElevated));
        assert_eq!(h.net.count(Operation::ElevateAccess, "n00dles").await, 1);
        assert_eq!(h.netwatch.node("n00dles").cloned(), before);
        assert_eq!(h.sink.levels(), vec![LogLevel::Warning]);
    }

    #[tokio::test]
    async fn test_elevate_ghost() {
        let net = SimulatedNetwork::new(home(), 5).with_neighbor(SimulatedNode::new("n00dles"));
        let mut h = scanned(net).await;
        h.net.clear_calls().await;

        let outcome = h.netwatch.elevate("ghost").await.unwrap();

        assert_eq!(outcome, ActionOutcome::Skipped(Skip::NotFound));
        assert!(h.net.calls().await.is_empty());
        assert_eq!(h.netwatch.nodes().count(), 1);
        assert_eq!(
            h.sink.messages_at(LogLevel::Error),
            vec!["Cannot elevate ghost, node not found"]
        );
    }

    #[tokio::test]
    async fn test_actions_require_elevation() {
        let net = SimulatedNetwork::new(home(), 5).with_neighbor(
            SimulatedNode::new("n00dles")
                .with_resource(0.0, 100.0)
                .with_defense(3.0),
        );
        let mut h = scanned(net).await;

        let grow = h.netwatch.grow("n00dles").await.unwrap();
        let weaken = h.netwatch.reduce_defense("n00dles").await.unwrap();
        let extract = h.netwatch.extract("n00dles").await.unwrap();

        for outcome in [grow, weaken, extract] {
            assert_eq!(outcome, ActionOutcome::Skipped(Skip::NotElevated));
        }
        assert_eq!(h.net.action_calls().await, 0);
        assert_eq!(
            h.sink.messages_at(LogLevel::Error),
            vec![
                "Cannot grow n00dles, not elevated",
                "Cannot weaken n00dles, not elevated",
                "Cannot extract from n00dles, not elevated",
            ]
        );
    }

    #[tokio::test]
    async fn test_foodnstuff_weaken_sequence() {
        let net = SimulatedNetwork::new(home(), 5)
            .with_neighbor(SimulatedNode::new("foodnstuff").elevated().with_defense(3.0));
        let mut h = scanned(net).await;

        let mut levels = vec![h.netwatch.node("foodnstuff").unwrap().defense_level];
        for _ in 0..2 {
            let outcome = h.netwatch.reduce_defense("foodnstuff").await.unwrap();
            assert!(outcome.is_applied());
            levels.push(h.netwatch.node("foodnstuff").unwrap().defense_level);
        }
        assert_eq!(levels, vec![3.0, 2.0, 1.0]);

        h.sink.clear();
        let outcome = h.netwatch.reduce_defense("foodnstuff").await.unwrap();

        assert_eq!(outcome, ActionOutcome::Skipped(Skip::AlreadyWeakened));
        assert_eq!(h.net.count(Operation::ReduceDefense, "foodnstuff").await, 2);
        assert_eq!(
            h.sink.messages_at(LogLevel::Warning),
            vec!["foodnstuff is already weakened"]
        );
    }

    #[tokio::test]
    async fn test_weaken_logs_tag_and_result() {
        let net = SimulatedNetwork::new(home(), 5)
            .with_neighbor(SimulatedNode::new("foodnstuff").elevated().with_defense(2.5));
        let mut h = scanned(net).await;

        h.netwatch.reduce_defense("foodnstuff").await.unwrap();

        assert_eq!(h.sink.levels(), vec![LogLevel::Weaken, LogLevel::Info]);
        assert_eq!(
            h.sink.messages_at(LogLevel::Info),
            vec!["Defense level on foodnstuff is now 1.5"]
        );
        let record = h.netwatch.node("foodnstuff").unwrap();
        assert_eq!(record.last_reduce_defense_at, h.clock_now());
    }

    #[tokio::test]
    async fn test_defense_clamped_to_floor() {
        let mut node = SimulatedNode::new("sigma-cosmetics")
            .elevated()
            .with_defense(1.5);
        node.min_defense = 0.0;
        let net = SimulatedNetwork::new(home(), 5).with_neighbor(node);
        let mut h = scanned(net).await;

        h.netwatch.reduce_defense("sigma-cosmetics").await.unwrap();

        assert_eq!(h.net.node("sigma-cosmetics").await.unwrap().defense, 0.5);
        assert_eq!(h.netwatch.node("sigma-cosmetics").unwrap().defense_level, 1.0);
    }

    #[tokio::test]
    async fn test_weaken_to_floor_is_monotonic() {
        let net = SimulatedNetwork::new(home(), 5).with_neighbor(
            SimulatedNode::new("joesguns")
                .elevated()
                .with_defense(7.5)
                .with_weaken_step(0.5),
        );
        let mut h = scanned(net).await;

        let report = h.netwatch.weaken_to_floor("joesguns").await.unwrap();

        assert_eq!(report.stop, WeakenStop::Floor);
        assert_eq!(report.attempts, 13);
        assert_eq!(h.netwatch.node("joesguns").unwrap().defense_level, 1.0);

        let weakens = h.sink.messages_at(LogLevel::Info);
        let levels: Vec<f64> = weakens
            .iter()
            .filter_map(|m| m.rsplit(' ').next())
            .filter_map(|l| l.parse().ok())
            .collect();
        assert_eq!(levels.len(), 13);
        assert!(levels.windows(2).all(|w| w[1] <= w[0]));
    }

    #[tokio::test]
    async fn test_weaken_to_floor_stops_without_progress() {
        let net = SimulatedNetwork::new(home(), 5).with_neighbor(
            SimulatedNode::new("hong-fang-tea")
                .elevated()
                .with_defense(5.0)
                .with_weaken_step(0.0),
        );
        let mut h = scanned(net).await;

        let report = h.netwatch.weaken_to_floor("hong-fang-tea").await.unwrap();

        assert_eq!(report.attempts, 1);
        assert_eq!(report.stop, WeakenStop::NoProgress { level: 5.0 });
        assert_eq!(h.sink.messages_at(LogLevel::Warning).len(), 1);
    }

    #[tokio::test]
    async fn test_weaken_to_floor_attempt_limit() {
        let net = SimulatedNetwork::new(home(), 5).with_neighbor(
            SimulatedNode::new("iron-gym")
                .elevated()
                .with_defense(30.0),
        );
        let mut h = scanned(net).await;
        h.netwatch.config.max_weaken_attempts = 4;

        let report = h.netwatch.weaken_to_floor("iron-gym").await.unwrap();

        assert_eq!(report.attempts, 4);
        assert_eq!(report.stop, WeakenStop::AttemptLimit);
        assert_eq!(h.netwatch.node("iron-gym").unwrap().defense_level, 26.0);
    }

    #[tokio::test]
    async fn test_weaken_to_floor_unknown_node() {
        let net = SimulatedNetwork::new(home(), 5);
        let mut h = scanned(net).await;

        let report = h.netwatch.weaken_to_floor("ghost").await.unwrap();

        assert_eq!(report.attempts, 0);
        assert_eq!(report.stop, WeakenStop::Skipped(Skip::NotFound));
        assert_eq!(h.sink.levels(), vec![LogLevel::Error]);
    }

    #[tokio::test]
    async fn test_grow_updates_resource_and_stamp() {
        let net = SimulatedNetwork::new(home(), 5).with_neighbor(
            SimulatedNode::new("n00dles")
                .elevated()
                .with_resource(1_000.0, 100_000.0)
                .with_grow_step(4_000.0),
        );
        let mut h = scanned(net).await;

        let outcome = h.netwatch.grow("n00dles").await.unwrap();

        assert!(outcome.is_applied());
        let record = h.netwatch.node("n00dles").unwrap();
        assert_eq!(record.current_resource, 5_000.0);
        assert_eq!(record.last_grow_at, h.clock_now());
        assert_eq!(h.sink.messages_at(LogLevel::Grow), vec!["Growing n00dles..."]);
    }

    #[tokio::test]
    async fn test_grow_and_extract_skip_when_maxed() {
        let net = SimulatedNetwork::new(home(), 5).with_neighbor(
            SimulatedNode::new("n00dles")
                .elevated()
                .with_resource(100.0, 100.0)
                .with_capacity(4.0, 4.0),
        );
        let mut h = scanned(net).await;

        let grow = h.netwatch.grow("n00dles").await.unwrap();
        let extract = h.netwatch.extract("n00dles").await.unwrap();

        assert_eq!(grow, ActionOutcome::Skipped(Skip::AlreadyMaxed));
        assert_eq!(extract, ActionOutcome::Skipped(Skip::AlreadyMaxed));
        assert_eq!(h.net.action_calls().await, 0);
        assert_eq!(
            h.sink.messages_at(LogLevel::Warning),
            vec!["n00dles is already maxed out", "n00dles is already maxed out"]
        );
    }

    #[tokio::test]
    async fn test_extract_updates_capacity() {
        let net = SimulatedNetwork::new(home(), 5).with_neighbor(
            SimulatedNode::new("n00dles")
                .elevated()
                .with_resource(1_000.0, 1_000.0)
                .with_capacity(0.0, 4.0),
        );
        let mut h = scanned(net).await;

        h.netwatch.extract("n00dles").await.unwrap();

        let record = h.netwatch.node("n00dles").unwrap();
        assert_eq!(record.used_capacity, 1.0);
        assert_eq!(record.last_extract_at, h.clock_now());
        assert_eq!(h.sink.levels(), vec![LogLevel::Hack]);
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let net = SimulatedNetwork::new(home(), 5)
            .with_neighbor(SimulatedNode::new("n00dles").elevated().with_resource(0.0, 10.0));
        let mut h = scanned(net).await;
        h.net.fail_on(Operation::GrowResource, "n00dles").await;

        let err = h.netwatch.grow("n00dles").await.unwrap_err();

        assert!(err.is_recoverable());
        assert_eq!(err.node_id(), Some("n00dles"));
        assert_eq!(h.netwatch.node("n00dles").unwrap().current_resource, 0.0);
    }

    #[test]
    fn test_skip_levels() {
        assert_eq!(Skip::NotFound.level(), LogLevel::Error);
        assert_eq!(Skip::NotElevated.level(), LogLevel::Error);
        assert_eq!(Skip::AlreadyWeakened.level(), LogLevel::Warning);
        assert_eq!(
            Skip::AlreadyMaxed.message(ActionKind::Extract, "n00dles"),
            "n00dles is already maxed out"
        );
    }
}
