//! Post-change monitoring.
//!
//! A change in `Monitoring` is rolled back as soon as the window holds enough
//! executions and the observed success rate sits at least
//! `rollback_threshold` below the baseline. It is accepted once the window
//! closes without that happening.

use chrono::{DateTime, Duration, Utc};

use warden_core::config::TunerConfig;
use warden_core::models::OptimizationProposal;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MonitorVerdict {
    Pending,
    Accept {
        observed: Option<f64>,
    },
    Rollback {
        baseline: f64,
        observed: f64,
        degradation: f64,
    },
}

#[derive(Debug, Clone)]
pub struct RollbackMonitor {
    window: Duration,
    rollback_threshold: f64,
    min_samples: u64,
}

impl RollbackMonitor {
    pub fn new(config: &TunerConfig) -> Self {
        Self {
            window: crate::secs(config.monitor_window_secs),
            rollback_threshold: config.rollback_threshold,
            min_samples: config.min_monitor_samples,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Judge `proposal` given the `(executions, successes)` of its scope
    /// since it was applied.
    pub fn check(
        &self,
        proposal: &OptimizationProposal,
        executions: u64,
        successes: u64,
        now: DateTime<Utc>,
    ) -> MonitorVerdict {
        let Some(applied_at) = proposal.applied_at else {
            return MonitorVerdict::Pending;
        };
        let observed = (executions > 0).then(|| successes as f64 / executions as f64);

        if let (Some(baseline), Some(observed)) = (proposal.baseline_success_rate, observed) {
            let degradation = baseline - observed;
            if executions >= self.min_samples && degradation >= self.rollback_threshold {
                return MonitorVerdict::Rollback {
                    baseline,
                    observed,
                    degradation,
                };
            }
        }

        let closes_at = applied_at
            .checked_add_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        if now >= closes_at {
            MonitorVerdict::Accept { observed }
        } else {
            MonitorVerdict::Pending
        }
    }
}
