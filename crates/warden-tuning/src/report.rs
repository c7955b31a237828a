//! What one tuning cycle did.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use warden_core::models::{AbTestOutcome, OptimizationProposal, RollbackRecord};

/// Why an optimization was not applied. Routine, never an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    InsufficientSample { have: u64, need: u64 },
    CooldownActive { remaining_secs: i64 },
    BelowNoiseThreshold { relative_change: f64 },
    LowConfidence { confidence: f64 },
    NoChange,
    UnderAbTest,
    Monitoring,
    /// The rule does not declare the parameter, so it would never read a change.
    Undeclared,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientSample { .. } => "insufficient_sample",
            Self::CooldownActive { .. } => "cooldown_active",
            Self::BelowNoiseThreshold { .. } => "below_noise_threshold",
            Self::LowConfidence { .. } => "low_confidence",
            Self::NoChange => "no_change",
            Self::UnderAbTest => "under_ab_test",
            Self::Monitoring => "monitoring",
            Self::Undeclared => "undeclared",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedOptimization {
    pub parameter: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,
    /// Applied and now monitoring.
    pub applied: Vec<OptimizationProposal>,
    /// Computed but not applied because of dry-run mode.
    pub proposed: Vec<OptimizationProposal>,
    pub skipped: Vec<SkippedOptimization>,
    pub rollbacks: Vec<RollbackRecord>,
    /// Ids of proposals whose monitoring window closed without regression.
    pub accepted: Vec<String>,
    pub concluded_tests: Vec<AbTestOutcome>,
}

impl CycleReport {
    pub fn new(cycle: u64, started_at: DateTime<Utc>, dry_run: bool) -> Self {
        Self {
            cycle,
            started_at,
            dry_run,
            applied: Vec::new(),
            proposed: Vec::new(),
            skipped: Vec::new(),
            rollbacks: Vec::new(),
            accepted: Vec::new(),
            concluded_tests: Vec::new(),
        }
    }

    pub fn skip(&mut self, parameter: &str, reason: SkipReason) {
        warden_observability::events::optimization_skipped(parameter, reason.as_str());
        self.skipped.push(SkippedOptimization {
            parameter: parameter.to_string(),
            reason,
        });
    }

    pub fn applied_to(&self, parameter: &str) -> Option<&OptimizationProposal> {
        self.applied.iter().find(|p| p.parameter == parameter)
    }

    pub fn skip_reason(&self, parameter: &str) -> Option<&SkipReason> {
        self.skipped
            .iter()
            .find(|s| s.parameter == parameter)
            .map(|s| &s.reason)
    }
}
