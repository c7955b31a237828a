use serde::{Deserialize, Serialize};

use crate::models::StrictnessLevel;

use super::defaults;

/// What a rule that exceeds its timeout contributes to the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Record and count the rule as `allow`, with a warning message.
    #[default]
    FailOpen,
    /// Record and count the rule as `block`.
    FailClosed,
}

impl TimeoutPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FailOpen => "fail_open",
            Self::FailClosed => "fail_closed",
        }
    }
}

/// Execution engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub timeout_policy: TimeoutPolicy,
    /// Upper bound on rules evaluated at once for one action. Rules beyond
    /// the bound wait for a slot inside their own timeout.
    pub max_parallel_rules: usize,
    /// Timeout given to a rule on first use when its descriptor names none.
    pub default_timeout_ms: u64,
    /// Strictness used on first use.
    pub default_strictness: StrictnessLevel,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout_policy: TimeoutPolicy::default(),
            max_parallel_rules: defaults::DEFAULT_MAX_PARALLEL_RULES,
            default_timeout_ms: defaults::DEFAULT_TIMEOUT_MS,
            default_strictness: StrictnessLevel::Standard,
        }
    }
}
