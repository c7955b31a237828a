use std::fmt;

use serde::{Deserialize, Serialize};

use super::pattern::PatternKey;

/// Allow/warn/block verdict. Ordered so that `Block > Warn > Allow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Allow,
    Warn,
    Block,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Warn => "warn",
            Self::Block => "block",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a single rule returns for one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleVerdict {
    pub verdict: Verdict,
    pub message: Option<String>,
    /// Pattern that produced the verdict, used to attribute feedback later.
    pub pattern: Option<PatternKey>,
}

impl RuleVerdict {
    pub fn allow() -> Self {
        Self {
            verdict: Verdict::Allow,
            message: None,
            pattern: None,
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Warn,
            message: Some(message.into()),
            pattern: None,
        }
    }

    pub fn block(message: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Block,
            message: Some(message.into()),
            pattern: None,
        }
    }

    pub fn with_pattern(mut self, pattern: PatternKey) -> Self {
        self.pattern = Some(pattern);
        self
    }
}

/// Aggregated verdict for one action. Never persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action_id: String,
    pub outcome: Verdict,
    pub messages: Vec<String>,
}

impl Decision {
    /// Decision for an action no rule applies to.
    pub fn allow(action_id: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            outcome: Verdict::Allow,
            messages: Vec::new(),
        }
    }

    /// Fold verdicts into one decision: the most severe verdict wins.
    ///
    /// Messages keep the order of the input iterator.
    pub fn aggregate<'a, I>(action_id: impl Into<String>, verdicts: I) -> Self
    where
        I: IntoIterator<Item = (Verdict, Option<&'a str>)>,
    {
        let mut outcome = Verdict::Allow;
        let mut messages = Vec::new();
        for (verdict, message) in verdicts {
            outcome = outcome.max(verdict);
            if let Some(message) = message {
                messages.push(message.to_string());
            }
        }
        Self {
            action_id: action_id.into(),
            outcome,
            messages,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.outcome == Verdict::Block
    }
}
