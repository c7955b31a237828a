//! A/B tests on live parameters.
//!
//! While a test runs, every `resolve` of its parameter draws an arm with
//! `random() < sample_ratio` selecting the variant. Arm counters are plain
//! atomics; concurrent increments may interleave but are never lost.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use warden_core::config::AbTestConfig;
use warden_core::constants::MAX_WINDOW_SECS;
use warden_core::errors::{WardenError, WardenResult};
use warden_core::models::{
    ab_test_confidence, AbArm, AbTestOutcome, AbTestStatus, ArmSummary, ParameterValue,
};
use warden_observability::events;

#[derive(Default)]
struct ArmCounters {
    executions: AtomicU64,
    successes: AtomicU64,
    total_latency_us: AtomicU64,
}

impl ArmCounters {
    fn record(&self, success: bool, latency: Duration) {
        self.executions.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successes.fetch_add(1, Ordering::Relaxed);
        }
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.total_latency_us.fetch_add(micros, Ordering::Relaxed);
    }

    fn summary(&self) -> ArmSummary {
        ArmSummary {
            executions: self.executions.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            total_latency_ms: self.total_latency_us.load(Ordering::Relaxed) as f64 / 1_000.0,
        }
    }
}

struct ActiveTest {
    control_value: ParameterValue,
    variant_value: ParameterValue,
    started_at: DateTime<Utc>,
    duration_secs: u64,
    sample_ratio: f64,
    control: ArmCounters,
    variant: ArmCounters,
}

impl ActiveTest {
    fn status(&self, parameter: &str) -> AbTestStatus {
        AbTestStatus {
            parameter: parameter.to_string(),
            control_value: self.control_value.clone(),
            variant_value: self.variant_value.clone(),
            started_at: self.started_at,
            duration_secs: self.duration_secs,
            sample_ratio: self.sample_ratio,
            control: self.control.summary(),
            variant: self.variant.summary(),
        }
    }

    fn arm(&self, arm: AbArm) -> &ArmCounters {
        match arm {
            AbArm::Control => &self.control,
            AbArm::Variant => &self.variant,
        }
    }
}

pub struct AbTestManager {
    config: AbTestConfig,
    tests: DashMap<String, ActiveTest>,
}

impl AbTestManager {
    pub fn new(config: AbTestConfig) -> Self {
        Self {
            config,
            tests: DashMap::new(),
        }
    }

    pub fn config(&self) -> &AbTestConfig {
        &self.config
    }

    /// Start a test of `variant_value` against the current `control_value`.
    /// Missing duration and ratio take the configured defaults.
    pub fn start(
        &self,
        parameter: &str,
        control_value: ParameterValue,
        variant_value: ParameterValue,
        duration_secs: Option<u64>,
        sample_ratio: Option<f64>,
        now: DateTime<Utc>,
    ) -> WardenResult<AbTestStatus> {
        if control_value.kind() != variant_value.kind() {
            return Err(WardenError::ParameterTypeMismatch {
                name: parameter.to_string(),
                expected: control_value.kind().to_string(),
            });
        }
        if control_value == variant_value {
            return Err(WardenError::ValidationError(format!(
                "variant of {parameter} equals its current value"
            )));
        }
        let sample_ratio = sample_ratio.unwrap_or(self.config.default_sample_ratio);
        if !(sample_ratio > 0.0 && sample_ratio < 1.0) {
            return Err(WardenError::ValidationError(format!(
                "sample ratio must be in (0, 1), got {sample_ratio}"
            )));
        }
        let duration_secs = duration_secs.unwrap_or(self.config.default_duration_secs);
        if duration_secs == 0 || duration_secs > MAX_WINDOW_SECS {
            return Err(WardenError::ValidationError(format!(
                "A/B test duration must be in 1..={MAX_WINDOW_SECS} seconds, got {duration_secs}"
            )));
        }

        let entry = match self.tests.entry(parameter.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(WardenError::AbTestAlreadyActive {
                    parameter: parameter.to_string(),
                })
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => vacant.insert(ActiveTest {
                control_value,
                variant_value,
                started_at: now,
                duration_secs,
                sample_ratio,
                control: ArmCounters::default(),
                variant: ArmCounters::default(),
            }),
        };
        let status = entry.status(parameter);
        drop(entry);

        events::ab_test_started(
            parameter,
            &status.control_value.encode(),
            &status.variant_value.encode(),
            duration_secs,
            sample_ratio,
        );
        Ok(status)
    }

    pub fn is_active(&self, parameter: &str) -> bool {
        self.tests.contains_key(parameter)
    }

    /// Draw an arm for one call, or `None` when no test is running.
    pub fn assign(&self, parameter: &str) -> Option<(ParameterValue, AbArm)> {
        if !self.tests.contains_key(parameter) {
            return None;
        }
        self.assign_with(parameter, rand::random::<f64>())
    }

    /// [`assign`](Self::assign) with the uniform draw supplied by the caller.
    pub fn assign_with(&self, parameter: &str, draw: f64) -> Option<(ParameterValue, AbArm)> {
        let test = self.tests.get(parameter)?;
        if draw < test.sample_ratio {
            Some((test.variant_value.clone(), AbArm::Variant))
        } else {
            Some((test.control_value.clone(), AbArm::Control))
        }
    }

    /// Count one evaluation on `arm`. Ignored once the test is gone.
    pub fn record(&self, parameter: &str, arm: AbArm, success: bool, latency: Duration) {
        if let Some(test) = self.tests.get(parameter) {
            test.arm(arm).record(success, latency);
        }
    }

    pub fn status(&self, parameter: &str) -> Option<AbTestStatus> {
        self.tests.get(parameter).map(|test| test.status(parameter))
    }

    pub fn statuses(&self) -> Vec<AbTestStatus> {
        let mut statuses: Vec<AbTestStatus> = self
            .tests
            .iter()
            .map(|entry| entry.value().status(entry.key()))
            .collect();
        statuses.sort_by(|a, b| a.parameter.cmp(&b.parameter));
        statuses
    }

    /// Stop a test without applying anything.
    pub fn stop(&self, parameter: &str) -> WardenResult<AbTestStatus> {
        self.tests
            .remove(parameter)
            .map(|(name, test)| test.status(&name))
            .ok_or_else(|| WardenError::AbTestNotFound {
                parameter: parameter.to_string(),
            })
    }

    /// Both arms reached the minimum sample, or the duration elapsed.
    pub fn ready(&self, parameter: &str, now: DateTime<Utc>) -> bool {
        self.status(parameter)
            .is_some_and(|status| self.is_ready(&status, now))
    }

    fn is_ready(&self, status: &AbTestStatus, now: DateTime<Utc>) -> bool {
        let min = self.config.min_samples_per_arm;
        if status.control.executions >= min && status.variant.executions >= min {
            return true;
        }
        let ends_at = status
            .started_at
            .checked_add_signed(crate::secs(status.duration_secs))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        now >= ends_at
    }

    /// Remove and judge the test if it is ready.
    pub fn conclude(&self, parameter: &str, now: DateTime<Utc>) -> Option<AbTestOutcome> {
        let status = self.status(parameter)?;
        if !self.is_ready(&status, now) {
            return None;
        }
        let (_, test) = self.tests.remove(parameter)?;
        let status = test.status(parameter);

        let (winner, reason) = select_winner(&status.control, &status.variant, &self.config);
        let confidence = ab_test_confidence(status.control.executions, status.variant.executions);
        events::ab_test_concluded(
            parameter,
            arm_name(winner),
            confidence,
            status.control.success_rate(),
            status.variant.success_rate(),
        );
        Some(AbTestOutcome {
            winner,
            confidence,
            reason,
            status,
        })
    }
}

/// The variant wins on a success-rate lead above `success_margin`, or on a
/// latency reduction of at least `latency_improvement` while the rates are
/// within the margin. Control wins otherwise.
pub fn select_winner(
    control: &ArmSummary,
    variant: &ArmSummary,
    config: &AbTestConfig,
) -> (AbArm, String) {
    let control_rate = control.success_rate();
    let variant_rate = variant.success_rate();
    let diff = variant_rate - control_rate;

    if variant.executions == 0 {
        return (AbArm::Control, "variant has no executions".to_string());
    }
    if diff > config.success_margin {
        return (
            AbArm::Variant,
            format!("variant success rate {variant_rate:.3} beats control {control_rate:.3}"),
        );
    }
    if diff.abs() <= config.success_margin {
        let control_latency = control.mean_latency_ms();
        let variant_latency = variant.mean_latency_ms();
        if control.executions > 0
            && variant_latency <= control_latency * (1.0 - config.latency_improvement)
        {
            return (
                AbArm::Variant,
                format!(
                    "success rates within margin; variant latency {variant_latency:.1}ms vs {control_latency:.1}ms"
                ),
            );
        }
    }
    (
        AbArm::Control,
        format!("variant {variant_rate:.3} did not beat control {control_rate:.3}"),
    )
}

pub fn arm_name(arm: AbArm) -> &'static str {
    match arm {
        AbArm::Control => "control",
        AbArm::Variant => "variant",
    }
}
