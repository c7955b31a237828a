//! Per-parameter cooldowns.
//!
//! A parameter that changed at `t` may not be optimized again before
//! `t + period`. Rollbacks count as changes. The tracker is hydrated from
//! `parameter_history` so cooldowns survive restarts.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

pub struct CooldownTracker {
    period: Duration,
    last_change: DashMap<String, DateTime<Utc>>,
}

impl CooldownTracker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_change: DashMap::new(),
        }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(crate::secs(secs))
    }

    /// Seed from `(parameter, last change)` pairs, keeping the latest per name.
    pub fn hydrate(&self, changes: impl IntoIterator<Item = (String, DateTime<Utc>)>) {
        for (name, at) in changes {
            self.record(&name, at);
        }
    }

    pub fn record(&self, parameter: &str, at: DateTime<Utc>) {
        self.last_change
            .entry(parameter.to_string())
            .and_modify(|last| {
                if at > *last {
                    *last = at;
                }
            })
            .or_insert(at);
    }

    /// False for exactly `period` after the last change, true from then on.
    pub fn can_optimize(&self, parameter: &str, now: DateTime<Utc>) -> bool {
        self.remaining(parameter, now).is_none()
    }

    /// Time left before `parameter` may change again.
    pub fn remaining(&self, parameter: &str, now: DateTime<Utc>) -> Option<Duration> {
        let last = *self.last_change.get(parameter)?;
        let ready_at = last
            .checked_add_signed(self.period)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        (now < ready_at).then(|| ready_at - now)
    }

    pub fn last_change(&self, parameter: &str) -> Option<DateTime<Utc>> {
        self.last_change.get(parameter).map(|at| *at)
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}
