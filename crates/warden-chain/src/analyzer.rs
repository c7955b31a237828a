//! Builds [`ChainReport`]s from rule descriptors and the learning store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use warden_core::constants::{timeout_parameter, STRICTNESS_PARAMETER};
use warden_core::errors::StorageError;
use warden_core::models::{MetricsScope, RuleDescriptor};
use warden_storage::LearningStore;

use crate::graph::RuleGraph;
use crate::types::{ChainReport, RuleStats};

pub struct ChainAnalyzer {
    descriptors: Vec<RuleDescriptor>,
}

impl ChainAnalyzer {
    pub fn new(descriptors: Vec<RuleDescriptor>) -> Self {
        Self { descriptors }
    }

    /// Structure only: graph, layers, cycles, categories, parameters.
    pub fn analyze(&self) -> ChainReport {
        let graph = RuleGraph::build(&self.descriptors);
        let (layers, unlayered) = graph.layers();

        let mut categories: BTreeMap<String, usize> = BTreeMap::new();
        for descriptor in &self.descriptors {
            *categories.entry(descriptor.category.clone()).or_default() += 1;
        }

        let report = ChainReport {
            generated_at: Utc::now(),
            rule_count: graph.graph.node_count(),
            edge_count: graph.graph.edge_count(),
            layers,
            unlayered,
            cycles: graph.cycles(),
            missing_dependencies: graph.missing_dependencies().to_vec(),
            categories,
            parameter_usage: self.parameter_usage(),
            rule_stats: Vec::new(),
        };
        if !report.is_acyclic() || !report.missing_dependencies.is_empty() {
            tracing::warn!(
                cycles = report.cycles.len(),
                missing = report.missing_dependencies.len(),
                "rule chain has unresolved dependencies"
            );
        }
        report
    }

    /// [`analyze`](Self::analyze) plus execution statistics for each rule
    /// since `since`.
    pub fn analyze_with_stats(
        &self,
        store: &LearningStore,
        since: DateTime<Utc>,
    ) -> Result<ChainReport, StorageError> {
        let mut report = self.analyze();
        let graph = RuleGraph::build(&self.descriptors);

        let mut stats = Vec::with_capacity(self.descriptors.len());
        for descriptor in &self.descriptors {
            let metrics =
                store.scope_metrics(&MetricsScope::Rule(descriptor.name.clone()), since)?;
            let (dependencies, dependents) = graph
                .node(&descriptor.name)
                .map(|n| (graph.dependency_count(n), graph.dependent_count(n)))
                .unwrap_or_default();
            stats.push(RuleStats {
                rule: descriptor.name.clone(),
                category: descriptor.category.clone(),
                priority: descriptor.priority,
                dependencies,
                dependents,
                executions: metrics.total,
                success_rate: metrics.success_rate(),
                mean_latency_ms: metrics.mean_latency_ms,
                warned: metrics.warned,
                blocked: metrics.blocked,
                errored: metrics.errored,
                timed_out: metrics.timed_out,
            });
        }
        stats.sort_by(|a, b| a.rule.cmp(&b.rule));
        report.rule_stats = stats;
        Ok(report)
    }

    /// Every rule reads its timeout and the global strictness, plus the
    /// parameters its descriptor declares.
    fn parameter_usage(&self) -> BTreeMap<String, Vec<String>> {
        let mut usage: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for descriptor in &self.descriptors {
            let names = [timeout_parameter(&descriptor.name), STRICTNESS_PARAMETER.to_string()]
                .into_iter()
                .chain(descriptor.parameters.iter().map(|p| p.name.clone()));
            for name in names {
                let rules = usage.entry(name).or_default();
                if !rules.contains(&descriptor.name) {
                    rules.push(descriptor.name.clone());
                }
            }
        }
        for rules in usage.values_mut() {
            rules.sort();
        }
        usage
    }
}
