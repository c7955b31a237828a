use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{WardenError, WardenResult};

use super::ab_test::ArmSummary;
use super::metrics::{LatencyStats, MetricsScope};
use super::parameter::ParameterValue;
use super::pattern::PatternMetrics;

/// Lifecycle of an optimization proposal:
/// `Proposed -> Applied -> Monitoring -> {Accepted | RolledBack}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalState {
    Proposed,
    Applied,
    Monitoring,
    Accepted,
    RolledBack,
}

impl ProposalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Applied => "applied",
            Self::Monitoring => "monitoring",
            Self::Accepted => "accepted",
            Self::RolledBack => "rolled_back",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::RolledBack)
    }

    pub fn can_transition_to(&self, next: ProposalState) -> bool {
        matches!(
            (self, next),
            (Self::Proposed, Self::Applied)
                | (Self::Applied, Self::Monitoring)
                | (Self::Monitoring, Self::Accepted)
                | (Self::Monitoring, Self::RolledBack)
        )
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proposed" => Ok(Self::Proposed),
            "applied" => Ok(Self::Applied),
            "monitoring" => Ok(Self::Monitoring),
            "accepted" => Ok(Self::Accepted),
            "rolled_back" => Ok(Self::RolledBack),
            other => Err(format!("unknown proposal state: {other}")),
        }
    }
}

/// Which optimizer produced a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationKind {
    Timeout,
    PatternSensitivity,
    Strictness,
    AbTestWinner,
}

impl OptimizationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::PatternSensitivity => "pattern_sensitivity",
            Self::Strictness => "strictness",
            Self::AbTestWinner => "ab_test_winner",
        }
    }
}

impl FromStr for OptimizationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "timeout" => Ok(Self::Timeout),
            "pattern_sensitivity" => Ok(Self::PatternSensitivity),
            "strictness" => Ok(Self::Strictness),
            "ab_test_winner" => Ok(Self::AbTestWinner),
            other => Err(format!("unknown optimization kind: {other}")),
        }
    }
}

/// Statistics a proposal was derived from, one variant per optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatsSnapshot {
    Latency {
        stats: LatencyStats,
        target_ms: f64,
    },
    Pattern {
        metrics: PatternMetrics,
    },
    SuccessRate {
        baseline: f64,
        current: f64,
        samples: u64,
    },
    AbTest {
        control: ArmSummary,
        variant: ArmSummary,
    },
}

/// A candidate parameter change with the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationProposal {
    pub id: String,
    pub parameter: String,
    pub kind: OptimizationKind,
    pub old_value: ParameterValue,
    pub new_value: ParameterValue,
    pub confidence: f64,
    pub rationale: String,
    pub stats: StatsSnapshot,
    /// Executions whose success rate guards this change while monitored.
    pub scope: MetricsScope,
    pub state: ProposalState,
    /// Success rate of `scope` captured when the change was applied.
    pub baseline_success_rate: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub applied_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl OptimizationProposal {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        parameter: impl Into<String>,
        kind: OptimizationKind,
        old_value: ParameterValue,
        new_value: ParameterValue,
        confidence: f64,
        rationale: impl Into<String>,
        stats: StatsSnapshot,
        scope: MetricsScope,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            parameter: parameter.into(),
            kind,
            old_value,
            new_value,
            confidence,
            rationale: rationale.into(),
            stats,
            scope,
            state: ProposalState::Proposed,
            baseline_success_rate: None,
            created_at: Utc::now(),
            applied_at: None,
            resolved_at: None,
        }
    }

    /// Advance the state machine, stamping the relevant timestamp.
    pub fn transition(&mut self, next: ProposalState, at: DateTime<Utc>) -> WardenResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(WardenError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        match next {
            ProposalState::Applied => self.applied_at = Some(at),
            ProposalState::Accepted | ProposalState::RolledBack => self.resolved_at = Some(at),
            ProposalState::Proposed | ProposalState::Monitoring => {}
        }
        self.state = next;
        Ok(())
    }
}
