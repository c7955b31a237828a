//! RuleRegistry: rules registered once at startup.

use std::sync::Arc;

use warden_core::errors::{WardenError, WardenResult};
use warden_core::models::RuleDescriptor;
use warden_core::traits::IRule;

/// A rule together with the descriptor captured when it was registered.
#[derive(Clone)]
pub struct RegisteredRule {
    pub descriptor: RuleDescriptor,
    pub rule: Arc<dyn IRule>,
    /// Position in registration order, used to break priority ties.
    pub order: usize,
}

impl std::fmt::Debug for RegisteredRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredRule")
            .field("descriptor", &self.descriptor)
            .field("order", &self.order)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: Vec<RegisteredRule>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule. Names are unique.
    pub fn register(&mut self, rule: Arc<dyn IRule>) -> WardenResult<()> {
        let descriptor = rule.descriptor();
        if self.get(&descriptor.name).is_some() {
            return Err(WardenError::DuplicateRule {
                name: descriptor.name,
            });
        }
        tracing::debug!(rule = %descriptor.name, category = %descriptor.category, "rule registered");
        let order = self.rules.len();
        self.rules.push(RegisteredRule {
            descriptor,
            rule,
            order,
        });
        Ok(())
    }

    /// Build a registry from a list of rules.
    pub fn with_rules(rules: impl IntoIterator<Item = Arc<dyn IRule>>) -> WardenResult<Self> {
        let mut registry = Self::new();
        for rule in rules {
            registry.register(rule)?;
        }
        Ok(registry)
    }

    /// Rules applying to `category`, highest priority first, ties in
    /// registration order.
    pub fn applicable(&self, category: &str) -> Vec<&RegisteredRule> {
        let mut rules: Vec<&RegisteredRule> = self
            .rules
            .iter()
            .filter(|r| r.descriptor.applies_to(category))
            .collect();
        rules.sort_by(|a, b| {
            b.descriptor
                .priority
                .cmp(&a.descriptor.priority)
                .then(a.order.cmp(&b.order))
        });
        rules
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredRule> {
        self.rules.iter().find(|r| r.descriptor.name == name)
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> Vec<RuleDescriptor> {
        self.rules.iter().map(|r| r.descriptor.clone()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.descriptor.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
