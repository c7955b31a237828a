//! In-memory collaborators for engine tests: a recording execution sink and
//! a fixed parameter provider.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use warden_core::models::{AbArm, ExecutionRecord, ParameterSpec, ParameterValue};
use warden_core::traits::{IExecutionSink, IParameterProvider, ResolvedParameter};

/// Keeps every record it is handed.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<ExecutionRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ExecutionRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn for_rule(&self, rule: &str) -> Vec<ExecutionRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.rule == rule)
            .collect()
    }
}

impl IExecutionSink for MemorySink {
    fn record_execution(&self, record: ExecutionRecord) {
        self.records.lock().unwrap().push(record);
    }
}

/// One `observe` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub name: String,
    pub arm: Option<AbArm>,
    pub success: bool,
    pub latency: Duration,
}

/// Answers from a fixed map, falling back to each spec's default.
#[derive(Debug, Default)]
pub struct StaticParameters {
    values: Mutex<HashMap<String, (ParameterValue, Option<AbArm>)>>,
    observations: Mutex<Vec<Observation>>,
}

impl StaticParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, name: &str, value: impl Into<ParameterValue>) -> Self {
        self.values
            .lock()
            .unwrap()
            .insert(name.to_string(), (value.into(), None));
        self
    }

    /// Resolve `name` as if drawn from `arm` of a running A/B test.
    pub fn with_arm(self, name: &str, value: impl Into<ParameterValue>, arm: AbArm) -> Self {
        self.values
            .lock()
            .unwrap()
            .insert(name.to_string(), (value.into(), Some(arm)));
        self
    }

    pub fn observations(&self) -> Vec<Observation> {
        self.observations.lock().unwrap().clone()
    }
}

impl IParameterProvider for StaticParameters {
    fn resolve(&self, spec: &ParameterSpec) -> ResolvedParameter {
        let values = self.values.lock().unwrap();
        let (value, arm) = values
            .get(&spec.name)
            .cloned()
            .unwrap_or_else(|| (spec.default.clone(), None));
        ResolvedParameter {
            name: spec.name.clone(),
            value,
            arm,
        }
    }

    fn observe(&self, resolved: &ResolvedParameter, success: bool, latency: Duration) {
        self.observations.lock().unwrap().push(Observation {
            name: resolved.name.clone(),
            arm: resolved.arm,
            success,
            latency,
        });
    }
}
