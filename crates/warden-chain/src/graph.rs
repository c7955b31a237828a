//! Rule dependency graph.
//!
//! Edges point from a dependency to the rule that depends on it, so a
//! topological walk visits dependencies first.

use std::collections::{BTreeMap, VecDeque};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use warden_core::models::RuleDescriptor;

use crate::types::MissingDependency;

pub struct RuleGraph {
    pub graph: DiGraph<RuleDescriptor, ()>,
    index: BTreeMap<String, NodeIndex>,
    missing: Vec<MissingDependency>,
}

impl RuleGraph {
    pub fn build(descriptors: &[RuleDescriptor]) -> Self {
        let mut graph = DiGraph::with_capacity(descriptors.len(), descriptors.len());
        let mut index = BTreeMap::new();
        for descriptor in descriptors {
            let node = graph.add_node(descriptor.clone());
            index.insert(descriptor.name.clone(), node);
        }

        let mut missing = Vec::new();
        for descriptor in descriptors {
            let rule = index[&descriptor.name];
            for dependency in &descriptor.depends_on {
                match index.get(dependency) {
                    Some(&dep) => {
                        graph.update_edge(dep, rule, ());
                    }
                    None => missing.push(MissingDependency {
                        rule: descriptor.name.clone(),
                        dependency: dependency.clone(),
                    }),
                }
            }
        }
        missing.sort();

        Self {
            graph,
            index,
            missing,
        }
    }

    pub fn node(&self, rule: &str) -> Option<NodeIndex> {
        self.index.get(rule).copied()
    }

    pub fn name(&self, node: NodeIndex) -> &str {
        &self.graph[node].name
    }

    pub fn missing_dependencies(&self) -> &[MissingDependency] {
        &self.missing
    }

    /// Strongly connected components that form a cycle, including
    /// self-dependencies. Names are sorted within and across cycles.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<String>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.graph.find_edge(scc[0], scc[0]).is_some()
            })
            .map(|scc| {
                let mut names: Vec<String> =
                    scc.into_iter().map(|n| self.name(n).to_string()).collect();
                names.sort();
                names
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Evaluation layers: every rule's dependencies sit in earlier layers.
    /// Rules on or behind a cycle are returned separately.
    pub fn layers(&self) -> (Vec<Vec<String>>, Vec<String>) {
        let mut indegree: BTreeMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|n| (n, self.graph.neighbors_directed(n, Direction::Incoming).count()))
            .collect();

        let mut current: VecDeque<NodeIndex> = indegree
            .iter()
            .filter(|(_, &d)| d == 0)
            .map(|(&n, _)| n)
            .collect();

        let mut layers = Vec::new();
        while !current.is_empty() {
            let mut layer = Vec::with_capacity(current.len());
            let mut next = VecDeque::new();
            for node in current.drain(..) {
                indegree.remove(&node);
                layer.push(self.name(node).to_string());
                for dependent in self.graph.neighbors_directed(node, Direction::Outgoing) {
                    if let Some(d) = indegree.get_mut(&dependent) {
                        *d -= 1;
                        if *d == 0 {
                            next.push_back(dependent);
                        }
                    }
                }
            }
            layer.sort();
            layers.push(layer);
            current = next;
        }

        let mut unlayered: Vec<String> = indegree
            .keys()
            .map(|&n| self.name(n).to_string())
            .collect();
        unlayered.sort();
        (layers, unlayered)
    }

    pub fn dependency_count(&self, node: NodeIndex) -> usize {
        self.graph.neighbors_directed(node, Direction::Incoming).count()
    }

    pub fn dependent_count(&self, node: NodeIndex) -> usize {
        self.graph.neighbors_directed(node, Direction::Outgoing).count()
    }
}
