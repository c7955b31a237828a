//! Pattern sensitivity refinement from confusion-matrix counters.

use warden_core::config::TunerConfig;
use warden_core::models::{PatternMetrics, Sensitivity};

use crate::report::SkipReason;

#[derive(Debug, Clone)]
pub struct PatternRefiner {
    min_samples: u64,
    precision_threshold: f64,
    recall_threshold: f64,
    false_positive_rate_threshold: f64,
    false_negative_rate_threshold: f64,
}

impl PatternRefiner {
    pub fn new(config: &TunerConfig) -> Self {
        Self {
            min_samples: config.min_pattern_samples,
            precision_threshold: config.precision_threshold,
            recall_threshold: config.recall_threshold,
            false_positive_rate_threshold: config.false_positive_rate_threshold,
            false_negative_rate_threshold: config.false_negative_rate_threshold,
        }
    }

    /// Sensitivity the metrics call for. A noisy pattern is reduced before a
    /// leaky one is increased.
    pub fn refine(&self, metrics: &PatternMetrics) -> Result<Sensitivity, SkipReason> {
        if metrics.sample_size < self.min_samples {
            return Err(SkipReason::InsufficientSample {
                have: metrics.sample_size,
                need: self.min_samples,
            });
        }
        if metrics.precision < self.precision_threshold
            && metrics.false_positive_rate > self.false_positive_rate_threshold
        {
            return Ok(Sensitivity::Reduced);
        }
        if metrics.recall < self.recall_threshold
            && metrics.false_negative_rate > self.false_negative_rate_threshold
        {
            return Ok(Sensitivity::Increased);
        }
        Err(SkipReason::NoChange)
    }
}
