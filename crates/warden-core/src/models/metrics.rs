use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::parameter::ParameterValue;

/// Which executions a metrics query covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "rule", rename_all = "snake_case")]
pub enum MetricsScope {
    System,
    Rule(String),
}

impl MetricsScope {
    pub fn rule(&self) -> Option<&str> {
        match self {
            Self::System => None,
            Self::Rule(rule) => Some(rule),
        }
    }
}

impl fmt::Display for MetricsScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => f.write_str("system"),
            Self::Rule(rule) => write!(f, "rule:{rule}"),
        }
    }
}

/// Aggregate execution metrics over a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub scope: MetricsScope,
    pub since: DateTime<Utc>,
    pub total: u64,
    pub allowed: u64,
    pub warned: u64,
    pub blocked: u64,
    pub errored: u64,
    pub timed_out: u64,
    pub mean_latency_ms: f64,
}

impl SystemMetrics {
    pub fn empty(scope: MetricsScope, since: DateTime<Utc>) -> Self {
        Self {
            scope,
            since,
            total: 0,
            allowed: 0,
            warned: 0,
            blocked: 0,
            errored: 0,
            timed_out: 0,
            mean_latency_ms: 0.0,
        }
    }

    /// Share of executions that completed without error or timeout.
    /// `None` when there are no executions in the window.
    pub fn success_rate(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        let failures = self.errored + self.timed_out;
        Some(self.total.saturating_sub(failures) as f64 / self.total as f64)
    }

    pub fn error_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.errored as f64 / self.total as f64
        }
    }

    pub fn timeout_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.timed_out as f64 / self.total as f64
        }
    }
}

/// Latency distribution of a rule's recent executions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub sample_size: u64,
    pub mean_ms: f64,
    pub stddev_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

/// Appended whenever a monitored change is reverted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackRecord {
    pub id: i64,
    pub proposal_id: String,
    pub parameter: String,
    pub restored_value: ParameterValue,
    pub abandoned_value: ParameterValue,
    pub baseline_success_rate: f64,
    pub observed_success_rate: f64,
    pub degradation: f64,
    pub timestamp: DateTime<Utc>,
}
