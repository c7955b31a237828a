use serde::{Deserialize, Serialize};

use super::parameter::ParameterSpec;

/// Category matching every action.
pub const WILDCARD_CATEGORY: &str = "*";

/// Static identity of a rule. Registered once; parameter bindings change,
/// the descriptor does not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDescriptor {
    pub name: String,
    pub category: String,
    /// Higher priorities have their messages listed first.
    pub priority: i32,
    /// Rules this one relies on. Only the chain analyzer reads this.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Parameters beyond timeout and strictness the rule wants resolved.
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    /// Overrides the engine-wide default timeout on first use.
    pub default_timeout_ms: Option<u64>,
}

impl RuleDescriptor {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            priority: 0,
            depends_on: Vec::new(),
            parameters: Vec::new(),
            default_timeout_ms: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn depends_on(mut self, rule: impl Into<String>) -> Self {
        self.depends_on.push(rule.into());
        self
    }

    pub fn with_parameter(mut self, spec: ParameterSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    pub fn with_default_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn applies_to(&self, category: &str) -> bool {
        self.category == WILDCARD_CATEGORY || self.category == category
    }
}
