//! Data model shared by the engine, the learning store, and the tuner.

pub mod ab_test;
pub mod action;
pub mod confidence;
pub mod decision;
pub mod execution_record;
pub mod metrics;
pub mod parameter;
pub mod pattern;
pub mod proposal;
pub mod rule;

pub use ab_test::{AbArm, AbTestOutcome, AbTestStatus, ArmSummary};
pub use confidence::{ab_test_confidence, consistency_from_variation, sample_confidence};
pub use action::Action;
pub use decision::{Decision, RuleVerdict, Verdict};
pub use execution_record::{ExecutionRecord, ExecutionStatus, Outcome};
pub use metrics::{LatencyStats, MetricsScope, RollbackRecord, SystemMetrics};
pub use parameter::{
    ParameterChange, ParameterSpec, ParameterValue, RuleParameters, Sensitivity, StrictnessLevel,
};
pub use pattern::{PatternDelta, PatternKey, PatternKind, PatternMetrics, PatternStat};
pub use proposal::{OptimizationKind, OptimizationProposal, ProposalState, StatsSnapshot};
pub use rule::{RuleDescriptor, WILDCARD_CATEGORY};
