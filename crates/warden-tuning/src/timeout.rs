//! Timeout optimization.
//!
//! The target is `max(p95 * p95_multiplier, mean + stddev_multiplier * stddev, floor)`.
//! One invocation moves the live value at most `max_change_rate * current`
//! toward it; moves smaller than the noise threshold are skipped.

use warden_core::config::TunerConfig;
use warden_core::constants::MIN_TIMEOUT_SAMPLE;
use warden_core::models::{
    consistency_from_variation, sample_confidence, ExecutionRecord, ExecutionStatus, LatencyStats,
};

use crate::report::SkipReason;
use crate::stats::latency_stats;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeoutStep {
    pub current_ms: f64,
    pub target_ms: f64,
    pub applied_ms: f64,
    pub confidence: f64,
    pub stats: LatencyStats,
}

#[derive(Debug, Clone)]
pub struct TimeoutOptimizer {
    floor_ms: f64,
    p95_multiplier: f64,
    stddev_multiplier: f64,
    max_change_rate: f64,
    noise_threshold: f64,
    min_samples: usize,
}

impl TimeoutOptimizer {
    pub fn new(config: &TunerConfig) -> Self {
        Self {
            floor_ms: config.timeout_floor_ms,
            p95_multiplier: config.p95_multiplier,
            stddev_multiplier: config.stddev_multiplier,
            max_change_rate: config.max_change_rate,
            noise_threshold: config.noise_threshold,
            min_samples: config.min_timeout_samples.max(MIN_TIMEOUT_SAMPLE),
        }
    }

    pub fn target_ms(&self, stats: &LatencyStats) -> f64 {
        (stats.p95_ms * self.p95_multiplier)
            .max(stats.mean_ms + self.stddev_multiplier * stats.stddev_ms)
            .max(self.floor_ms)
    }

    /// `current` moved toward `target` by at most `max_change_rate * current`,
    /// never below the floor.
    ///
    /// The floor is applied after the rate bound. A value already under the
    /// floor, such as a rule default shorter than `timeout_floor_ms`, is
    /// lifted to the floor in a single step regardless of `max_change_rate`.
    pub fn bounded_step(&self, current_ms: f64, target_ms: f64) -> f64 {
        let limit = self.max_change_rate * current_ms.abs();
        let step = (target_ms - current_ms).clamp(-limit, limit);
        (current_ms + step).max(self.floor_ms)
    }

    /// Latency samples usable for timeout analysis. Failed evaluations
    /// return early and would drag the distribution down.
    pub fn samples(records: &[ExecutionRecord]) -> Vec<f64> {
        records
            .iter()
            .filter(|r| r.status != ExecutionStatus::Failed)
            .map(|r| r.latency_ms)
            .collect()
    }

    pub fn propose(&self, current_ms: f64, latencies: &[f64]) -> Result<TimeoutStep, SkipReason> {
        if latencies.len() < self.min_samples {
            return Err(SkipReason::InsufficientSample {
                have: latencies.len() as u64,
                need: self.min_samples as u64,
            });
        }
        let stats = latency_stats(latencies).ok_or(SkipReason::NoChange)?;
        let target_ms = self.target_ms(&stats);
        let applied_ms = self.bounded_step(current_ms, target_ms);

        let relative_change = (applied_ms - current_ms).abs() / current_ms.abs().max(1.0);
        if relative_change < self.noise_threshold {
            return Err(SkipReason::BelowNoiseThreshold { relative_change });
        }

        let confidence = sample_confidence(
            stats.sample_size,
            consistency_from_variation(stats.mean_ms, stats.stddev_ms),
        );
        Ok(TimeoutStep {
            current_ms,
            target_ms,
            applied_ms,
            confidence,
            stats,
        })
    }
}
