//! # warden-chain
//!
//! Chain analyzer: a read-only report over the registered rules. Builds the
//! dependency graph, finds cycles and missing dependencies, orders rules into
//! evaluation layers, and joins in per-rule execution statistics.

pub mod analyzer;
pub mod graph;
pub mod types;

pub use analyzer::ChainAnalyzer;
pub use graph::RuleGraph;
pub use types::{ChainReport, MissingDependency, RuleStats};
