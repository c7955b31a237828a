//! Builders for execution records.

use chrono::{DateTime, Duration, Utc};

use warden_core::models::{ExecutionRecord, ExecutionStatus, Outcome, PatternKey};

/// Start building a completed `allow` record for `rule`.
pub fn execution(rule: &str) -> ExecutionBuilder {
    ExecutionBuilder {
        record: ExecutionRecord {
            rule: rule.to_string(),
            category: "file_write".to_string(),
            action_id: format!("{rule}-action"),
            action_hash: format!("{rule}-hash"),
            outcome: Outcome::Allow,
            status: ExecutionStatus::Completed,
            latency_ms: 10.0,
            error: None,
            pattern: None,
            timestamp: Utc::now(),
        },
    }
}

pub struct ExecutionBuilder {
    record: ExecutionRecord,
}

impl ExecutionBuilder {
    pub fn category(mut self, category: &str) -> Self {
        self.record.category = category.to_string();
        self
    }

    pub fn action_id(mut self, action_id: &str) -> Self {
        self.record.action_id = action_id.to_string();
        self
    }

    pub fn outcome(mut self, outcome: Outcome) -> Self {
        self.record.outcome = outcome;
        self
    }

    pub fn latency_ms(mut self, latency_ms: f64) -> Self {
        self.record.latency_ms = latency_ms;
        self
    }

    pub fn pattern(mut self, pattern: PatternKey) -> Self {
        self.record.pattern = Some(pattern);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.record.timestamp = timestamp;
        self
    }

    pub fn ago(self, age: Duration) -> Self {
        self.at(Utc::now() - age)
    }

    pub fn timed_out(mut self) -> Self {
        self.record.status = ExecutionStatus::TimedOut;
        self.record.error = Some("timed out".to_string());
        self
    }

    pub fn failed(mut self, error: &str) -> Self {
        self.record.outcome = Outcome::Error;
        self.record.status = ExecutionStatus::Failed;
        self.record.error = Some(error.to_string());
        self
    }

    pub fn build(self) -> ExecutionRecord {
        self.record
    }
}

/// One completed record per latency, a millisecond apart, oldest first.
pub fn with_latencies(rule: &str, latencies: &[f64]) -> Vec<ExecutionRecord> {
    let start = Utc::now() - Duration::milliseconds(latencies.len() as i64 + 1);
    latencies
        .iter()
        .enumerate()
        .map(|(i, &latency)| {
            execution(rule)
                .action_id(&format!("{rule}-{i}"))
                .latency_ms(latency)
                .at(start + Duration::milliseconds(i as i64))
                .build()
        })
        .collect()
}

/// `100, 102, ..., 298`: a uniform spread over 100 to 300ms.
pub fn uniform_latencies() -> Vec<f64> {
    (0..100).map(|i| 100.0 + 2.0 * i as f64).collect()
}

/// `total` records of which `successes` completed and the rest failed.
pub fn with_success_rate(rule: &str, total: usize, successes: usize) -> Vec<ExecutionRecord> {
    (0..total)
        .map(|i| {
            let builder = execution(rule).action_id(&format!("{rule}-sr-{i}"));
            if i < successes {
                builder.build()
            } else {
                builder.failed("fixture failure").build()
            }
        })
        .collect()
}
