use std::time::Duration;

use crate::models::{AbArm, ParameterSpec, ParameterValue};

/// A parameter value as handed to one rule evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParameter {
    pub name: String,
    pub value: ParameterValue,
    /// Set when the value was drawn from a running A/B test.
    pub arm: Option<AbArm>,
}

/// Source of live parameter values for the execution engine.
///
/// `resolve` is on the decision hot path and must not block on I/O.
pub trait IParameterProvider: Send + Sync {
    /// Current value of `spec`, created with its default on first use.
    fn resolve(&self, spec: &ParameterSpec) -> ResolvedParameter;

    /// Report how the evaluation that used `resolved` went.
    fn observe(&self, resolved: &ResolvedParameter, success: bool, latency: Duration);
}
