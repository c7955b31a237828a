use serde::{Deserialize, Serialize};

use super::defaults;

/// A/B test configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AbTestConfig {
    /// A test concludes once both arms reach this many executions.
    pub min_samples_per_arm: u64,
    /// Duration used when a test is started without one (seconds).
    pub default_duration_secs: u64,
    /// Share of calls routed to the variant when none is given.
    pub default_sample_ratio: f64,
    /// Success-rate lead (fraction) the variant needs to win outright.
    pub success_margin: f64,
    /// Latency reduction (fraction) that lets a tied variant win.
    pub latency_improvement: f64,
}

impl Default for AbTestConfig {
    fn default() -> Self {
        Self {
            min_samples_per_arm: defaults::DEFAULT_MIN_SAMPLES_PER_ARM,
            default_duration_secs: defaults::DEFAULT_AB_DURATION_SECS,
            default_sample_ratio: defaults::DEFAULT_SAMPLE_RATIO,
            success_margin: defaults::DEFAULT_SUCCESS_MARGIN,
            latency_improvement: defaults::DEFAULT_LATENCY_IMPROVEMENT,
        }
    }
}
