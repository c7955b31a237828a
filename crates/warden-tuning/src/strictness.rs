//! Global strictness adjustment.
//!
//! The rolling success rate is compared against a baseline captured on the
//! first measurement. A drop beyond `delta` relaxes one level; an improvement
//! beyond `delta` tightens one level while the rate is still under
//! `headroom`. The baseline is re-captured whenever a change is applied.

use warden_core::config::TunerConfig;
use warden_core::models::{sample_confidence, StrictnessLevel};

use crate::report::SkipReason;
use crate::stats::proportion_std_error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrictnessStep {
    pub level: StrictnessLevel,
    pub baseline: f64,
    pub current: f64,
    pub samples: u64,
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct StrictnessController {
    delta: f64,
    headroom: f64,
    min_samples: u64,
    baseline: Option<f64>,
}

impl StrictnessController {
    pub fn new(config: &TunerConfig) -> Self {
        Self {
            delta: config.strictness_delta,
            headroom: config.strictness_headroom,
            min_samples: config.min_strictness_samples,
            baseline: None,
        }
    }

    pub fn baseline(&self) -> Option<f64> {
        self.baseline
    }

    pub fn reset_baseline(&mut self, rate: f64) {
        self.baseline = Some(rate);
    }

    pub fn evaluate(
        &mut self,
        current: StrictnessLevel,
        executions: u64,
        successes: u64,
    ) -> Result<StrictnessStep, SkipReason> {
        if executions == 0 || executions < self.min_samples {
            return Err(SkipReason::InsufficientSample {
                have: executions,
                need: self.min_samples,
            });
        }
        let rate = successes as f64 / executions as f64;
        let Some(baseline) = self.baseline else {
            self.baseline = Some(rate);
            return Err(SkipReason::NoChange);
        };

        let diff = rate - baseline;
        let next = if diff < -self.delta {
            current.relax()
        } else if diff > self.delta && rate < self.headroom {
            current.tighten()
        } else {
            None
        };
        let level = next.ok_or(SkipReason::NoChange)?;

        let std_error = proportion_std_error(rate, executions);
        let consistency = 1.0 - (std_error / diff.abs()).min(1.0);
        Ok(StrictnessStep {
            level,
            baseline,
            current: rate,
            samples: executions,
            confidence: sample_confidence(executions, consistency),
        })
    }
}
