use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::Action;
use super::decision::Verdict;
use super::pattern::PatternKey;

/// Outcome column of an execution record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Allow,
    Warn,
    Block,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Warn => "warn",
            Self::Block => "block",
            Self::Error => "error",
        }
    }

    /// The verdict this outcome contributes to the aggregate decision.
    /// Errors fail open.
    pub fn verdict(&self) -> Verdict {
        match self {
            Self::Allow | Self::Error => Verdict::Allow,
            Self::Warn => Verdict::Warn,
            Self::Block => Verdict::Block,
        }
    }
}

impl From<Verdict> for Outcome {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Allow => Self::Allow,
            Verdict::Warn => Self::Warn,
            Verdict::Block => Self::Block,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(Self::Allow),
            "warn" => Ok(Self::Warn),
            "block" => Ok(Self::Block),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown outcome: {other}")),
        }
    }
}

/// How a rule evaluation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Completed,
    TimedOut,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::TimedOut => "timed_out",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(Self::Completed),
            "timed_out" => Ok(Self::TimedOut),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown execution status: {other}")),
        }
    }
}

/// Durable log entry for one rule's evaluation of one action.
///
/// Exactly one record exists per (rule, action) pair, whatever the
/// evaluation's fate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub rule: String,
    pub category: String,
    pub action_id: String,
    pub action_hash: String,
    pub outcome: Outcome,
    pub status: ExecutionStatus,
    pub latency_ms: f64,
    pub error: Option<String>,
    pub pattern: Option<PatternKey>,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionRecord {
    /// Start a record for `rule` evaluating `action`; outcome defaults to allow.
    pub fn for_action(rule: &str, category: &str, action: &Action) -> Self {
        Self {
            rule: rule.to_string(),
            category: category.to_string(),
            action_id: action.id.clone(),
            action_hash: action.context_hash(),
            outcome: Outcome::Allow,
            status: ExecutionStatus::Completed,
            latency_ms: 0.0,
            error: None,
            pattern: None,
            timestamp: Utc::now(),
        }
    }

    /// A rule "succeeded" when it completed without error or timeout,
    /// whatever verdict it reached.
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }
}
