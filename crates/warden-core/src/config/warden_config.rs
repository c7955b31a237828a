//! Top-level Warden configuration with layered resolution.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{
    AbTestConfig, EngineConfig, ObservabilityConfig, StorageConfig, TimeoutPolicy, TunerConfig,
};
use crate::errors::ConfigError;

/// File name looked up in the project root.
pub const CONFIG_FILENAME: &str = "warden.toml";

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. Environment variables (`WARDEN_*`)
/// 2. Project config (`warden.toml` in project root)
/// 3. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WardenConfig {
    pub engine: EngineConfig,
    pub storage: StorageConfig,
    pub tuner: TunerConfig,
    pub ab_test: AbTestConfig,
    pub observability: ObservabilityConfig,
}

impl WardenConfig {
    /// Load configuration from `root/warden.toml` (if present) and the
    /// process environment, then validate.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILENAME);
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load configuration from a TOML string. Missing keys take defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    /// Apply `WARDEN_*` overrides read through `lookup`. Unparseable values
    /// are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
            lookup(key).and_then(|v| v.trim().parse().ok())
        }

        if let Some(v) = lookup("WARDEN_TIMEOUT_POLICY") {
            match v.trim() {
                "fail_open" => self.engine.timeout_policy = TimeoutPolicy::FailOpen,
                "fail_closed" => self.engine.timeout_policy = TimeoutPolicy::FailClosed,
                _ => {}
            }
        }
        if let Some(v) = parsed(&lookup, "WARDEN_MAX_PARALLEL_RULES") {
            self.engine.max_parallel_rules = v;
        }
        if let Some(v) = parsed(&lookup, "WARDEN_DEFAULT_TIMEOUT_MS") {
            self.engine.default_timeout_ms = v;
        }
        if let Some(v) = lookup("WARDEN_DB_PATH") {
            self.storage.db_path = v;
        }
        if let Some(v) = parsed(&lookup, "WARDEN_RETENTION_DAYS") {
            self.storage.retention_days = v;
        }
        if let Some(v) = parsed(&lookup, "WARDEN_READ_POOL_SIZE") {
            self.storage.read_pool_size = v;
        }
        if let Some(v) = parsed(&lookup, "WARDEN_TUNER_ENABLED") {
            self.tuner.enabled = v;
        }
        if let Some(v) = parsed(&lookup, "WARDEN_TUNER_INTERVAL_SECS") {
            self.tuner.interval_secs = v;
        }
        if let Some(v) = parsed(&lookup, "WARDEN_COOLDOWN_SECS") {
            self.tuner.cooldown_secs = v;
        }
        if let Some(v) = parsed(&lookup, "WARDEN_MAX_CHANGE_RATE") {
            self.tuner.max_change_rate = v;
        }
        if let Some(v) = parsed(&lookup, "WARDEN_MIN_CONFIDENCE") {
            self.tuner.min_confidence = v;
        }
        if let Some(v) = parsed(&lookup, "WARDEN_DRY_RUN") {
            self.tuner.dry_run = v;
        }
        if let Some(v) = lookup("WARDEN_LOG_LEVEL") {
            self.observability.log_level = v;
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn fraction(field: &str, value: f64) -> Result<(), ConfigError> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::ValidationFailed {
                    field: field.to_string(),
                    message: "must be between 0.0 and 1.0".to_string(),
                })
            }
        }
        fn positive(field: &str, value: u64) -> Result<(), ConfigError> {
            if value > 0 {
                Ok(())
            } else {
                Err(ConfigError::ValidationFailed {
                    field: field.to_string(),
                    message: "must be greater than 0".to_string(),
                })
            }
        }

        fn window(field: &str, value: u64) -> Result<(), ConfigError> {
            if value <= crate::constants::MAX_WINDOW_SECS {
                Ok(())
            } else {
                Err(ConfigError::ValidationFailed {
                    field: field.to_string(),
                    message: format!(
                        "must be at most {} seconds",
                        crate::constants::MAX_WINDOW_SECS
                    ),
                })
            }
        }

        positive("engine.max_parallel_rules", self.engine.max_parallel_rules as u64)?;
        positive("engine.default_timeout_ms", self.engine.default_timeout_ms)?;
        positive("storage.read_pool_size", self.storage.read_pool_size as u64)?;
        positive(
            "storage.writer_queue_capacity",
            self.storage.writer_queue_capacity as u64,
        )?;
        positive("storage.writer_batch_size", self.storage.writer_batch_size as u64)?;
        positive("tuner.interval_secs", self.tuner.interval_secs)?;
        window("tuner.interval_secs", self.tuner.interval_secs)?;
        window("tuner.cooldown_secs", self.tuner.cooldown_secs)?;
        window("tuner.strictness_window_secs", self.tuner.strictness_window_secs)?;
        window("tuner.monitor_window_secs", self.tuner.monitor_window_secs)?;
        window("storage.purge_interval_secs", self.storage.purge_interval_secs)?;

        let tuner = &self.tuner;
        if tuner.max_change_rate <= 0.0 || tuner.max_change_rate > 1.0 {
            return Err(ConfigError::ValidationFailed {
                field: "tuner.max_change_rate".to_string(),
                message: "must be in (0.0, 1.0]".to_string(),
            });
        }
        fraction("tuner.noise_threshold", tuner.noise_threshold)?;
        fraction("tuner.min_confidence", tuner.min_confidence)?;
        fraction("tuner.rollback_threshold", tuner.rollback_threshold)?;
        fraction("tuner.strictness_delta", tuner.strictness_delta)?;
        fraction("tuner.strictness_headroom", tuner.strictness_headroom)?;
        fraction("tuner.precision_threshold", tuner.precision_threshold)?;
        fraction("tuner.recall_threshold", tuner.recall_threshold)?;
        fraction(
            "tuner.false_positive_rate_threshold",
            tuner.false_positive_rate_threshold,
        )?;
        fraction(
            "tuner.false_negative_rate_threshold",
            tuner.false_negative_rate_threshold,
        )?;
        if tuner.timeout_floor_ms <= 0.0 {
            return Err(ConfigError::ValidationFailed {
                field: "tuner.timeout_floor_ms".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if tuner.min_timeout_samples < crate::constants::MIN_TIMEOUT_SAMPLE {
            return Err(ConfigError::ValidationFailed {
                field: "tuner.min_timeout_samples".to_string(),
                message: format!("must be at least {}", crate::constants::MIN_TIMEOUT_SAMPLE),
            });
        }
        if tuner.timeout_sample_size < tuner.min_timeout_samples {
            return Err(ConfigError::ValidationFailed {
                field: "tuner.timeout_sample_size".to_string(),
                message: "must be at least tuner.min_timeout_samples".to_string(),
            });
        }

        let ab = &self.ab_test;
        if ab.default_sample_ratio <= 0.0 || ab.default_sample_ratio >= 1.0 {
            return Err(ConfigError::ValidationFailed {
                field: "ab_test.default_sample_ratio".to_string(),
                message: "must be in (0.0, 1.0)".to_string(),
            });
        }
        positive("ab_test.min_samples_per_arm", ab.min_samples_per_arm)?;
        positive("ab_test.default_duration_secs", ab.default_duration_secs)?;
        window("ab_test.default_duration_secs", ab.default_duration_secs)?;
        fraction("ab_test.success_margin", ab.success_margin)?;
        fraction("ab_test.latency_improvement", ab.latency_improvement)?;

        Ok(())
    }
}
