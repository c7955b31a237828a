//! # warden-tuning
//!
//! The adaptive parameter tuner. On its own schedule it reads aggregated
//! outcomes from the learning store, proposes bounded parameter changes,
//! applies them through the parameter store, and watches each applied change
//! until it is accepted or rolled back.

pub mod ab_test;
pub mod cooldown;
pub mod monitor;
pub mod patterns;
pub mod provider;
pub mod report;
pub mod scheduler;
pub mod stats;
pub mod strictness;
pub mod timeout;
pub mod tuner;

pub use ab_test::AbTestManager;
pub use cooldown::CooldownTracker;
pub use provider::TunedParameters;
pub use report::{CycleReport, SkipReason, SkippedOptimization};
pub use tuner::Tuner;

/// Whole seconds as a chrono duration, saturating at `TimeDelta::MAX`.
pub(crate) fn secs(secs: u64) -> chrono::TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::TimeDelta::try_seconds)
        .unwrap_or(chrono::TimeDelta::MAX)
}
