use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::parameter::ParameterValue;

/// Arm of an A/B test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbArm {
    Control,
    Variant,
}

/// Counters of one arm at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmSummary {
    pub executions: u64,
    pub successes: u64,
    pub total_latency_ms: f64,
}

impl ArmSummary {
    pub fn success_rate(&self) -> f64 {
        if self.executions == 0 {
            0.0
        } else {
            self.successes as f64 / self.executions as f64
        }
    }

    pub fn mean_latency_ms(&self) -> f64 {
        if self.executions == 0 {
            0.0
        } else {
            self.total_latency_ms / self.executions as f64
        }
    }
}

/// Snapshot of a running test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbTestStatus {
    pub parameter: String,
    pub control_value: ParameterValue,
    pub variant_value: ParameterValue,
    pub started_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub sample_ratio: f64,
    pub control: ArmSummary,
    pub variant: ArmSummary,
}

/// Result of a concluded test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbTestOutcome {
    pub winner: AbArm,
    pub confidence: f64,
    pub reason: String,
    pub status: AbTestStatus,
}
