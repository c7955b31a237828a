//! # warden-engine
//!
//! Runs every applicable rule against an action concurrently, each under its
//! own timeout, folds the verdicts into one decision, and hands one execution
//! record per rule to the learning store without waiting on it.

pub mod cancellation;
pub mod engine;
mod evaluation;
pub mod registry;

pub use cancellation::CancellationToken;
pub use engine::ExecutionEngine;
pub use registry::{RegisteredRule, RuleRegistry};
