//! The tuning cycle.
//!
//! One cycle, in order:
//! 1. judge every proposal in `Monitoring` (accept or roll back),
//! 2. conclude ready A/B tests and apply variant winners,
//! 3. optimize each rule's timeout,
//! 4. refine each rule's pattern sensitivities,
//! 5. adjust the global strictness.
//!
//! Steps 3 to 5 skip parameters under an A/B test, under monitoring, or in
//! cooldown. A/B winners skip the cooldown gate only.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use warden_core::config::{EngineConfig, TunerConfig};
use warden_core::constants::{sensitivity_parameter, timeout_parameter, STRICTNESS_PARAMETER};
use warden_core::errors::{WardenError, WardenResult};
use warden_core::models::{
    AbArm, AbTestOutcome, MetricsScope, OptimizationKind, OptimizationProposal, ParameterSpec,
    ParameterValue, ProposalState, RollbackRecord, RuleDescriptor, StatsSnapshot,
    StrictnessLevel,
};
use warden_observability::events;
use warden_storage::{LearningStore, ParameterStore};

use crate::ab_test::AbTestManager;
use crate::cooldown::CooldownTracker;
use crate::monitor::{MonitorVerdict, RollbackMonitor};
use crate::patterns::PatternRefiner;
use crate::report::{CycleReport, SkipReason};
use crate::strictness::StrictnessController;
use crate::timeout::TimeoutOptimizer;

/// Upper bound on monitored proposals judged per cycle.
const MONITORED_PROPOSAL_LIMIT: usize = 1_000;

struct TunerState {
    cycle: u64,
    strictness: StrictnessController,
}

pub struct Tuner {
    store: Arc<LearningStore>,
    parameters: Arc<ParameterStore>,
    ab_tests: Arc<AbTestManager>,
    rules: Vec<RuleDescriptor>,
    engine: EngineConfig,
    config: TunerConfig,
    cooldowns: CooldownTracker,
    timeouts: TimeoutOptimizer,
    patterns: PatternRefiner,
    monitor: RollbackMonitor,
    state: Mutex<TunerState>,
}

impl Tuner {
    /// Build a tuner over `rules`, restoring cooldowns from the parameter
    /// history.
    pub fn new(
        store: Arc<LearningStore>,
        parameters: Arc<ParameterStore>,
        ab_tests: Arc<AbTestManager>,
        rules: Vec<RuleDescriptor>,
        engine: EngineConfig,
        config: TunerConfig,
    ) -> WardenResult<Self> {
        let cooldowns = CooldownTracker::from_secs(config.cooldown_secs);
        cooldowns.hydrate(store.last_parameter_changes()?);

        Ok(Self {
            timeouts: TimeoutOptimizer::new(&config),
            patterns: PatternRefiner::new(&config),
            monitor: RollbackMonitor::new(&config),
            state: Mutex::new(TunerState {
                cycle: 0,
                strictness: StrictnessController::new(&config),
            }),
            store,
            parameters,
            ab_tests,
            rules,
            engine,
            config,
            cooldowns,
        })
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    pub fn ab_tests(&self) -> &Arc<AbTestManager> {
        &self.ab_tests
    }

    /// True once the cooldown of `parameter` has elapsed.
    pub fn can_optimize(&self, parameter: &str) -> bool {
        self.cooldowns.can_optimize(parameter, Utc::now())
    }

    pub fn run_cycle(&self) -> WardenResult<CycleReport> {
        self.run_cycle_at(Utc::now())
    }

    /// Run one cycle as if the clock read `now`.
    pub fn run_cycle_at(&self, now: DateTime<Utc>) -> WardenResult<CycleReport> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| WardenError::ConcurrencyError("tuner state lock poisoned".to_string()))?;
        state.cycle += 1;
        let _span = warden_observability::tuning_span!(state.cycle).entered();
        let mut report = CycleReport::new(state.cycle, now, self.config.dry_run);

        let monitoring = self.check_monitored(now, &mut report)?;
        self.conclude_ab_tests(now, &mut report)?;

        for rule in &self.rules {
            self.optimize_timeout(rule, now, &monitoring, &mut report)?;
            self.refine_patterns(rule, now, &monitoring, &mut report)?;
        }
        self.adjust_strictness(&mut state.strictness, now, &monitoring, &mut report)?;

        events::tuning_cycle_completed(
            report.cycle,
            report.applied.len(),
            report.skipped.len(),
            report.rollbacks.len(),
        );
        Ok(report)
    }

    /// Returns the parameters still under monitoring after this pass.
    fn check_monitored(
        &self,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> WardenResult<HashSet<String>> {
        let mut monitoring = HashSet::new();
        let proposals = self
            .store
            .proposals(Some(ProposalState::Monitoring), MONITORED_PROPOSAL_LIMIT)?;

        for mut proposal in proposals {
            let Some(applied_at) = proposal.applied_at else {
                monitoring.insert(proposal.parameter.clone());
                continue;
            };
            let (executions, successes) =
                self.store.success_counts(&proposal.scope, applied_at, now)?;

            match self.monitor.check(&proposal, executions, successes, now) {
                MonitorVerdict::Pending => {
                    monitoring.insert(proposal.parameter.clone());
                }
                MonitorVerdict::Accept { observed } => {
                    proposal.transition(ProposalState::Accepted, now)?;
                    self.store.save_proposal(&proposal)?;
                    events::proposal_accepted(&proposal.parameter, &proposal.id, observed);
                    report.accepted.push(proposal.id);
                }
                MonitorVerdict::Rollback {
                    baseline,
                    observed,
                    degradation,
                } => {
                    let rollback = self.roll_back(proposal, baseline, observed, degradation, now)?;
                    report.rollbacks.push(rollback);
                }
            }
        }
        Ok(monitoring)
    }

    fn roll_back(
        &self,
        mut proposal: OptimizationProposal,
        baseline: f64,
        observed: f64,
        degradation: f64,
        now: DateTime<Utc>,
    ) -> WardenResult<RollbackRecord> {
        proposal.transition(ProposalState::RolledBack, now)?;
        let mut rollback = RollbackRecord {
            id: 0,
            proposal_id: proposal.id.clone(),
            parameter: proposal.parameter.clone(),
            restored_value: proposal.old_value.clone(),
            abandoned_value: proposal.new_value.clone(),
            baseline_success_rate: baseline,
            observed_success_rate: observed,
            degradation,
            timestamp: now,
        };
        let reason = format!(
            "rollback of {}: success rate {baseline:.3} -> {observed:.3}",
            proposal.kind.as_str()
        );
        rollback.id = self.parameters.rollback(&rollback, &proposal, &reason)?;
        self.cooldowns.record(&proposal.parameter, now);

        events::rollback_triggered(
            &rollback.parameter,
            &rollback.restored_value.encode(),
            &rollback.abandoned_value.encode(),
            baseline,
            observed,
            degradation,
        );
        Ok(rollback)
    }

    fn conclude_ab_tests(&self, now: DateTime<Utc>, report: &mut CycleReport) -> WardenResult<()> {
        for status in self.ab_tests.statuses() {
            let Some(outcome) = self.ab_tests.conclude(&status.parameter, now) else {
                continue;
            };
            if outcome.winner == AbArm::Variant {
                let proposal = self.winner_proposal(&outcome);
                self.apply(proposal, now, report)?;
            }
            report.concluded_tests.push(outcome);
        }
        Ok(())
    }

    fn winner_proposal(&self, outcome: &AbTestOutcome) -> OptimizationProposal {
        let status = &outcome.status;
        let old_value = self
            .parameters
            .get(&status.parameter)
            .unwrap_or_else(|| status.control_value.clone());
        OptimizationProposal::new(
            status.parameter.clone(),
            OptimizationKind::AbTestWinner,
            old_value,
            status.variant_value.clone(),
            outcome.confidence,
            outcome.reason.clone(),
            StatsSnapshot::AbTest {
                control: status.control,
                variant: status.variant,
            },
            self.scope_for(&status.parameter),
        )
    }

    /// Rule scope for a `<rule>.` parameter, system scope otherwise.
    fn scope_for(&self, parameter: &str) -> MetricsScope {
        self.rules
            .iter()
            .find(|rule| {
                parameter
                    .strip_prefix(rule.name.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
            })
            .map(|rule| MetricsScope::Rule(rule.name.clone()))
            .unwrap_or(MetricsScope::System)
    }

    fn gate(
        &self,
        parameter: &str,
        now: DateTime<Utc>,
        monitoring: &HashSet<String>,
    ) -> Option<SkipReason> {
        if self.ab_tests.is_active(parameter) {
            return Some(SkipReason::UnderAbTest);
        }
        if monitoring.contains(parameter) {
            return Some(SkipReason::Monitoring);
        }
        self.cooldowns
            .remaining(parameter, now)
            .map(|remaining| SkipReason::CooldownActive {
                remaining_secs: remaining.num_seconds(),
            })
    }

    fn optimize_timeout(
        &self,
        rule: &RuleDescriptor,
        now: DateTime<Utc>,
        monitoring: &HashSet<String>,
        report: &mut CycleReport,
    ) -> WardenResult<()> {
        let parameter = timeout_parameter(&rule.name);
        if let Some(reason) = self.gate(&parameter, now, monitoring) {
            report.skip(&parameter, reason);
            return Ok(());
        }

        let default_ms = rule
            .default_timeout_ms
            .unwrap_or(self.engine.default_timeout_ms);
        let current = self
            .parameters
            .get_or_init(&ParameterSpec::timeout(&rule.name, default_ms));
        let Some(current_ms) = current.as_f64() else {
            report.skip(&parameter, SkipReason::NoChange);
            return Ok(());
        };

        let records = self
            .store
            .recent_executions(&rule.name, self.config.timeout_sample_size)?;
        let latencies = TimeoutOptimizer::samples(&records);
        let step = match self.timeouts.propose(current_ms, &latencies) {
            Ok(step) => step,
            Err(reason) => {
                report.skip(&parameter, reason);
                return Ok(());
            }
        };

        let proposal = OptimizationProposal::new(
            parameter,
            OptimizationKind::Timeout,
            current,
            ParameterValue::Numeric(step.applied_ms),
            step.confidence,
            format!(
                "p95 {:.1}ms, mean {:.1}ms, stddev {:.1}ms over {} executions; target {:.1}ms",
                step.stats.p95_ms,
                step.stats.mean_ms,
                step.stats.stddev_ms,
                step.stats.sample_size,
                step.target_ms
            ),
            StatsSnapshot::Latency {
                stats: step.stats,
                target_ms: step.target_ms,
            },
            MetricsScope::Rule(rule.name.clone()),
        );
        self.apply(proposal, now, report)?;
        Ok(())
    }

    fn refine_patterns(
        &self,
        rule: &RuleDescriptor,
        now: DateTime<Utc>,
        monitoring: &HashSet<String>,
        report: &mut CycleReport,
    ) -> WardenResult<()> {
        for effectiveness in self.store.pattern_effectiveness(&rule.name)? {
            let pattern = &effectiveness.stat.pattern;
            let parameter = sensitivity_parameter(&rule.name, pattern);
            if !rule.parameters.iter().any(|spec| spec.name == parameter) {
                report.skip(&parameter, SkipReason::Undeclared);
                continue;
            }
            if let Some(reason) = self.gate(&parameter, now, monitoring) {
                report.skip(&parameter, reason);
                continue;
            }
            let metrics = effectiveness.metrics;
            let sensitivity = match self.patterns.refine(&metrics) {
                Ok(sensitivity) => sensitivity,
                Err(reason) => {
                    report.skip(&parameter, reason);
                    continue;
                }
            };

            let current = self
                .parameters
                .get_or_init(&ParameterSpec::sensitivity(&rule.name, pattern));
            let proposed = ParameterValue::from(sensitivity);
            if current == proposed {
                report.skip(&parameter, SkipReason::NoChange);
                continue;
            }

            let proposal = OptimizationProposal::new(
                parameter,
                OptimizationKind::PatternSensitivity,
                current,
                proposed,
                metrics.confidence,
                format!(
                    "precision {:.3}, recall {:.3}, fpr {:.3}, fnr {:.3} over {} outcomes",
                    metrics.precision,
                    metrics.recall,
                    metrics.false_positive_rate,
                    metrics.false_negative_rate,
                    metrics.sample_size
                ),
                StatsSnapshot::Pattern { metrics },
                MetricsScope::Rule(rule.name.clone()),
            );
            self.apply(proposal, now, report)?;
        }
        Ok(())
    }

    fn adjust_strictness(
        &self,
        controller: &mut StrictnessController,
        now: DateTime<Utc>,
        monitoring: &HashSet<String>,
        report: &mut CycleReport,
    ) -> WardenResult<()> {
        if let Some(reason) = self.gate(STRICTNESS_PARAMETER, now, monitoring) {
            report.skip(STRICTNESS_PARAMETER, reason);
            return Ok(());
        }

        let current = self
            .parameters
            .get_or_init(&ParameterSpec::strictness(self.engine.default_strictness));
        let level = current
            .as_str()
            .and_then(|s| s.parse::<StrictnessLevel>().ok())
            .unwrap_or(self.engine.default_strictness);

        let since = now
            .checked_sub_signed(crate::secs(self.config.strictness_window_secs))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let (executions, successes) =
            self.store.success_counts(&MetricsScope::System, since, now)?;

        let step = match controller.evaluate(level, executions, successes) {
            Ok(step) => step,
            Err(reason) => {
                report.skip(STRICTNESS_PARAMETER, reason);
                return Ok(());
            }
        };

        let proposal = OptimizationProposal::new(
            STRICTNESS_PARAMETER,
            OptimizationKind::Strictness,
            current,
            ParameterValue::from(step.level),
            step.confidence,
            format!(
                "success rate {:.3} against baseline {:.3} over {} executions",
                step.current, step.baseline, step.samples
            ),
            StatsSnapshot::SuccessRate {
                baseline: step.baseline,
                current: step.current,
                samples: step.samples,
            },
            MetricsScope::System,
        );
        if self.apply(proposal, now, report)? {
            controller.reset_baseline(step.current);
        }
        Ok(())
    }

    /// Returns true when the proposal went live.
    fn apply(
        &self,
        mut proposal: OptimizationProposal,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> WardenResult<bool> {
        if proposal.confidence < self.config.min_confidence {
            report.skip(
                &proposal.parameter,
                SkipReason::LowConfidence {
                    confidence: proposal.confidence,
                },
            );
            return Ok(false);
        }

        if self.config.dry_run {
            events::optimization_proposed(
                &proposal.parameter,
                proposal.kind.as_str(),
                &proposal.old_value.encode(),
                &proposal.new_value.encode(),
                proposal.confidence,
            );
            report.proposed.push(proposal);
            return Ok(false);
        }

        let since = now
            .checked_sub_signed(self.monitor.window())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let (executions, successes) = self.store.success_counts(&proposal.scope, since, now)?;
        proposal.baseline_success_rate =
            (executions > 0).then(|| successes as f64 / executions as f64);

        proposal.transition(ProposalState::Applied, now)?;
        proposal.transition(ProposalState::Monitoring, now)?;
        self.parameters.apply_proposal(&proposal, now)?;
        self.cooldowns.record(&proposal.parameter, now);

        events::optimization_applied(
            &proposal.parameter,
            proposal.kind.as_str(),
            &proposal.old_value.encode(),
            &proposal.new_value.encode(),
            proposal.confidence,
            &proposal.rationale,
        );
        report.applied.push(proposal);
        Ok(true)
    }
}
