use async_trait::async_trait;

use crate::errors::RuleError;
use crate::models::{Action, RuleDescriptor, RuleParameters, RuleVerdict};

/// A validator plugged into the execution engine.
///
/// Rules are polymorphic over this single capability. An evaluation may be
/// cancelled at any await point when its timeout expires or the caller
/// aborts the action.
#[async_trait]
pub trait IRule: Send + Sync {
    /// Identity, category, priority and declared parameters.
    fn descriptor(&self) -> RuleDescriptor;

    /// Judge one action with the parameter values currently in force.
    async fn evaluate(
        &self,
        action: &Action,
        parameters: &RuleParameters,
    ) -> Result<RuleVerdict, RuleError>;
}
