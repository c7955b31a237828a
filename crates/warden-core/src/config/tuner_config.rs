use serde::{Deserialize, Serialize};

use super::defaults;

/// Adaptive parameter tuner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Run the scheduled tuning loop.
    pub enabled: bool,
    /// Seconds between scheduled tuning cycles.
    pub interval_secs: u64,
    /// Minimum seconds between two changes of the same parameter.
    pub cooldown_secs: u64,
    /// Largest fraction of the current value one step may move a numeric parameter.
    pub max_change_rate: f64,
    /// Relative changes below this fraction are skipped as noise.
    pub noise_threshold: f64,
    /// Lowest timeout the optimizer will propose (ms).
    pub timeout_floor_ms: f64,
    /// Recent executions pulled for timeout analysis.
    pub timeout_sample_size: usize,
    /// Executions required before a timeout is optimized (at least 50).
    pub min_timeout_samples: usize,
    pub p95_multiplier: f64,
    pub stddev_multiplier: f64,
    /// Labelled outcomes required before a pattern is refined.
    pub min_pattern_samples: u64,
    pub precision_threshold: f64,
    pub recall_threshold: f64,
    pub false_positive_rate_threshold: f64,
    pub false_negative_rate_threshold: f64,
    /// Window of the rolling success rate used for strictness (seconds).
    pub strictness_window_secs: u64,
    /// Success-rate movement (fraction) that triggers a strictness change.
    pub strictness_delta: f64,
    /// Tightening only happens while the success rate is below this.
    pub strictness_headroom: f64,
    pub min_strictness_samples: u64,
    /// Proposals below this confidence are not applied.
    pub min_confidence: f64,
    /// Post-change observation window (seconds).
    pub monitor_window_secs: u64,
    /// Success-rate drop (fraction) relative to baseline that reverts a change.
    pub rollback_threshold: f64,
    /// Executions required in the monitoring window before judging it.
    pub min_monitor_samples: u64,
    /// Compute and log proposals without applying them.
    pub dry_run: bool,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::DEFAULT_TUNER_ENABLED,
            interval_secs: defaults::DEFAULT_TUNER_INTERVAL_SECS,
            cooldown_secs: defaults::DEFAULT_COOLDOWN_SECS,
            max_change_rate: defaults::DEFAULT_MAX_CHANGE_RATE,
            noise_threshold: defaults::DEFAULT_NOISE_THRESHOLD,
            timeout_floor_ms: defaults::DEFAULT_TIMEOUT_FLOOR_MS,
            timeout_sample_size: defaults::DEFAULT_TIMEOUT_SAMPLE_SIZE,
            min_timeout_samples: defaults::DEFAULT_MIN_TIMEOUT_SAMPLES,
            p95_multiplier: defaults::DEFAULT_P95_MULTIPLIER,
            stddev_multiplier: defaults::DEFAULT_STDDEV_MULTIPLIER,
            min_pattern_samples: defaults::DEFAULT_MIN_PATTERN_SAMPLES,
            precision_threshold: defaults::DEFAULT_PRECISION_THRESHOLD,
            recall_threshold: defaults::DEFAULT_RECALL_THRESHOLD,
            false_positive_rate_threshold: defaults::DEFAULT_FALSE_POSITIVE_RATE_THRESHOLD,
            false_negative_rate_threshold: defaults::DEFAULT_FALSE_NEGATIVE_RATE_THRESHOLD,
            strictness_window_secs: defaults::DEFAULT_STRICTNESS_WINDOW_SECS,
            strictness_delta: defaults::DEFAULT_STRICTNESS_DELTA,
            strictness_headroom: defaults::DEFAULT_STRICTNESS_HEADROOM,
            min_strictness_samples: defaults::DEFAULT_MIN_STRICTNESS_SAMPLES,
            min_confidence: defaults::DEFAULT_MIN_CONFIDENCE,
            monitor_window_secs: defaults::DEFAULT_MONITOR_WINDOW_SECS,
            rollback_threshold: defaults::DEFAULT_ROLLBACK_THRESHOLD,
            min_monitor_samples: defaults::DEFAULT_MIN_MONITOR_SAMPLES,
            dry_run: defaults::DEFAULT_DRY_RUN,
        }
    }
}
