//! Chain report types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A `depends_on` entry naming a rule that is not registered.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MissingDependency {
    pub rule: String,
    pub dependency: String,
}

/// One rule's place in the chain and its recent behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleStats {
    pub rule: String,
    pub category: String,
    pub priority: i32,
    pub dependencies: usize,
    pub dependents: usize,
    pub executions: u64,
    /// `None` without executions in the window.
    pub success_rate: Option<f64>,
    pub mean_latency_ms: f64,
    pub warned: u64,
    pub blocked: u64,
    pub errored: u64,
    pub timed_out: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainReport {
    pub generated_at: DateTime<Utc>,
    pub rule_count: usize,
    pub edge_count: usize,
    /// Rules grouped so every dependency sits in an earlier layer.
    pub layers: Vec<Vec<String>>,
    /// Rules that cannot be layered because of a cycle.
    pub unlayered: Vec<String>,
    pub cycles: Vec<Vec<String>>,
    pub missing_dependencies: Vec<MissingDependency>,
    /// Rule count per category.
    pub categories: BTreeMap<String, usize>,
    /// Parameter name to the rules that read it.
    pub parameter_usage: BTreeMap<String, Vec<String>>,
    /// Sorted by rule name. Empty when no store was consulted.
    pub rule_stats: Vec<RuleStats>,
}

impl ChainReport {
    pub fn is_acyclic(&self) -> bool {
        self.cycles.is_empty()
    }

    pub fn stats_for(&self, rule: &str) -> Option<&RuleStats> {
        self.rule_stats.iter().find(|s| s.rule == rule)
    }
}
