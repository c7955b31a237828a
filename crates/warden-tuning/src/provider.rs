//! The parameter provider handed to the execution engine.

use std::sync::Arc;
use std::time::Duration;

use warden_core::models::ParameterSpec;
use warden_core::traits::{IParameterProvider, ResolvedParameter};
use warden_storage::ParameterStore;

use crate::ab_test::AbTestManager;

/// Live values from the [`ParameterStore`], overridden per call by any
/// running A/B test.
pub struct TunedParameters {
    parameters: Arc<ParameterStore>,
    ab_tests: Arc<AbTestManager>,
}

impl TunedParameters {
    pub fn new(parameters: Arc<ParameterStore>, ab_tests: Arc<AbTestManager>) -> Self {
        Self {
            parameters,
            ab_tests,
        }
    }
}

impl IParameterProvider for TunedParameters {
    fn resolve(&self, spec: &ParameterSpec) -> ResolvedParameter {
        let current = self.parameters.get_or_init(spec);
        match self.ab_tests.assign(&spec.name) {
            Some((value, arm)) => ResolvedParameter {
                name: spec.name.clone(),
                value,
                arm: Some(arm),
            },
            None => ResolvedParameter {
                name: spec.name.clone(),
                value: current,
                arm: None,
            },
        }
    }

    fn observe(&self, resolved: &ResolvedParameter, success: bool, latency: Duration) {
        if let Some(arm) = resolved.arm {
            self.ab_tests.record(&resolved.name, arm, success, latency);
        }
    }
}
