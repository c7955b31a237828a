//! Confidence scoring shared by every optimizer.
//!
//! A score starts at 0.5, earns +0.1 at each sample-size step (50, 100, 500
//! executions), adds up to 0.15 for consistency, and is capped at 0.95.

use crate::constants::{CONFIDENCE_SAMPLE_STEPS, MAX_CONFIDENCE};

const BASE_CONFIDENCE: f64 = 0.5;
const SAMPLE_STEP_BONUS: f64 = 0.1;
const CONSISTENCY_WEIGHT: f64 = 0.15;
const BALANCE_WEIGHT: f64 = 0.15;

/// Score from sample size and a consistency term in `[0, 1]`.
pub fn sample_confidence(samples: u64, consistency: f64) -> f64 {
    let steps = CONFIDENCE_SAMPLE_STEPS
        .iter()
        .filter(|&&step| samples >= step)
        .count() as f64;
    let consistency = if consistency.is_finite() {
        consistency.clamp(0.0, 1.0)
    } else {
        0.0
    };
    (BASE_CONFIDENCE + steps * SAMPLE_STEP_BONUS + consistency * CONSISTENCY_WEIGHT)
        .min(MAX_CONFIDENCE)
}

/// Consistency from a coefficient of variation: 1 for zero spread, 0 once
/// the standard deviation reaches the mean.
pub fn consistency_from_variation(mean: f64, stddev: f64) -> f64 {
    if mean <= 0.0 {
        return 0.0;
    }
    1.0 - (stddev / mean).clamp(0.0, 1.0)
}

/// A/B test confidence: sample-size steps on the combined arms plus a
/// balance term rewarding arms of similar size.
pub fn ab_test_confidence(control_samples: u64, variant_samples: u64) -> f64 {
    let total = control_samples + variant_samples;
    let larger = control_samples.max(variant_samples);
    let balance = if larger == 0 {
        0.0
    } else {
        control_samples.min(variant_samples) as f64 / larger as f64
    };
    let steps = CONFIDENCE_SAMPLE_STEPS
        .iter()
        .filter(|&&step| total >= step)
        .count() as f64;
    (BASE_CONFIDENCE + steps * SAMPLE_STEP_BONUS + balance * BALANCE_WEIGHT).min(MAX_CONFIDENCE)
}
