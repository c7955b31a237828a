//! # warden-observability
//!
//! Tracing subscriber setup and the structured events every other crate
//! emits. Faults absorbed at the rule boundary or in the write path surface
//! here, with enough context for offline analysis.

pub mod tracing_setup;

pub use tracing_setup::events;
pub use tracing_setup::spans;
pub use tracing_setup::{init_tracing, init_tracing_with_filter, LOG_ENV_VAR};
