//! # warden-core
//!
//! Foundation crate for the Warden enforcement pipeline.
//! Defines all types, traits, errors, config, and constants.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::WardenConfig;
pub use errors::{WardenError, WardenResult};
pub use models::{
    Action, Decision, ExecutionRecord, Outcome, ParameterValue, PatternKey, RuleDescriptor,
    RuleVerdict,
};
pub use traits::{IExecutionSink, IParameterProvider, IRule};
