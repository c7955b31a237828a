//! Typed views of the scenario datasets under `data/scenarios/`.

use serde::Deserialize;

use warden_core::models::{AbArm, ArmSummary, PatternKey, PatternStat, Sensitivity};

#[derive(Debug, Clone, Deserialize)]
pub struct PatternScenario {
    pub name: String,
    pub tp: u64,
    pub fp: u64,
    pub tn: u64,
    #[serde(rename = "fn")]
    pub fneg: u64,
    pub expected: Option<Sensitivity>,
}

impl PatternScenario {
    pub fn stat(&self, rule: &str) -> PatternStat {
        PatternStat {
            rule: rule.to_string(),
            pattern: PatternKey::regex(self.name.clone()),
            true_positives: self.tp,
            false_positives: self.fp,
            true_negatives: self.tn,
            false_negatives: self.fneg,
            updated_at: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArmScenario {
    pub executions: u64,
    pub successes: u64,
    pub mean_latency_ms: f64,
}

impl ArmScenario {
    pub fn summary(&self) -> ArmSummary {
        ArmSummary {
            executions: self.executions,
            successes: self.successes,
            total_latency_ms: self.mean_latency_ms * self.executions as f64,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbScenario {
    pub name: String,
    pub control: ArmScenario,
    pub variant: ArmScenario,
    pub expected_winner: AbArm,
}

pub fn pattern_scenarios() -> Vec<PatternScenario> {
    crate::load_fixture("scenarios/pattern_stats.json")
}

pub fn ab_scenarios() -> Vec<AbScenario> {
    crate::load_fixture("scenarios/ab_tests.json")
}
