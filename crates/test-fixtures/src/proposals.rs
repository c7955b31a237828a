//! Ready-made proposals for tests that need a logged parameter change.

use chrono::{DateTime, Utc};

use warden_core::constants::{STRICTNESS_PARAMETER, TIMEOUT_PARAMETER_SUFFIX};
use warden_core::models::{
    MetricsScope, OptimizationKind, OptimizationProposal, ParameterValue, ProposalState,
    StatsSnapshot,
};

/// A proposal changing `parameter` from `old` to `new`, applied at `at` and
/// already accepted, so no monitoring is pending for it.
pub fn accepted_change(
    parameter: &str,
    old: ParameterValue,
    new: ParameterValue,
    at: DateTime<Utc>,
) -> OptimizationProposal {
    let (kind, scope) = if parameter == STRICTNESS_PARAMETER {
        (OptimizationKind::Strictness, MetricsScope::System)
    } else {
        let rule = parameter.split('.').next().unwrap_or(parameter).to_string();
        let kind = if parameter.ends_with(TIMEOUT_PARAMETER_SUFFIX) {
            OptimizationKind::Timeout
        } else {
            OptimizationKind::PatternSensitivity
        };
        (kind, MetricsScope::Rule(rule))
    };
    let mut proposal = OptimizationProposal::new(
        parameter,
        kind,
        old,
        new,
        0.9,
        "operator change",
        StatsSnapshot::SuccessRate {
            baseline: 1.0,
            current: 1.0,
            samples: 0,
        },
        scope,
    );
    for state in [
        ProposalState::Applied,
        ProposalState::Monitoring,
        ProposalState::Accepted,
    ] {
        proposal.transition(state, at).unwrap();
    }
    proposal
}
