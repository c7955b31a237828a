//! One rule's evaluation of one action, from deadline to execution record.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tracing::Instrument;

use warden_core::config::TimeoutPolicy;
use warden_core::errors::RuleError;
use warden_core::models::{
    Action, ExecutionRecord, ExecutionStatus, Outcome, RuleDescriptor, RuleParameters,
};
use warden_core::traits::{IRule, ResolvedParameter};
use warden_observability::events;

/// What the engine keeps from one evaluation.
pub(crate) struct RuleRun {
    pub record: ExecutionRecord,
    pub message: Option<String>,
    pub resolved: Vec<ResolvedParameter>,
    pub latency: Duration,
}

impl RuleRun {
    /// Stand-in for an evaluation whose task vanished without reporting.
    pub fn lost(descriptor: &RuleDescriptor, action: &Action, reason: &str) -> Self {
        let mut record = ExecutionRecord::for_action(&descriptor.name, &descriptor.category, action);
        mark_failed(&mut record, format!("evaluation task lost: {reason}"));
        Self {
            record,
            message: None,
            resolved: Vec::new(),
            latency: Duration::ZERO,
        }
    }
}

pub(crate) struct RuleTask {
    pub rule: Arc<dyn IRule>,
    pub descriptor: RuleDescriptor,
    pub action: Arc<Action>,
    pub parameters: RuleParameters,
    pub resolved: Vec<ResolvedParameter>,
    pub timeout: Duration,
    /// Fixed when the task is created; the permit wait counts against it.
    pub deadline: tokio::time::Instant,
    pub policy: TimeoutPolicy,
    pub permits: Arc<Semaphore>,
}

/// Aborts the wrapped task when dropped, so cancelling the owner also stops
/// the rule.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl RuleTask {
    pub async fn run(self) -> RuleRun {
        let RuleTask {
            rule,
            descriptor,
            action,
            parameters,
            resolved,
            timeout,
            deadline,
            policy,
            permits,
        } = self;

        let mut record = ExecutionRecord::for_action(&descriptor.name, &descriptor.category, &action);
        let started = Instant::now();

        // A closed semaphore only lifts the parallelism bound.
        let joined = match tokio::time::timeout_at(deadline, permits.acquire_owned()).await {
            Ok(permit) => {
                let _permit = permit.ok();
                let span = warden_observability::rule_span!(descriptor.name, action.id);
                let evaluation = {
                    let action = Arc::clone(&action);
                    tokio::spawn(
                        async move { rule.evaluate(&action, &parameters).await }.instrument(span),
                    )
                };
                let mut handle = AbortOnDrop(evaluation);
                tokio::time::timeout_at(deadline, &mut handle.0).await
            }
            Err(elapsed) => Err(elapsed),
        };
        let latency = started.elapsed();
        record.latency_ms = latency.as_secs_f64() * 1000.0;

        let message = match joined {
            Ok(Ok(Ok(verdict))) => {
                record.outcome = Outcome::from(verdict.verdict);
                record.pattern = verdict.pattern;
                verdict.message
            }
            Ok(Ok(Err(err))) => {
                events::rule_failed(&descriptor.name, &action.id, record.latency_ms, &err.to_string());
                mark_failed(&mut record, err.to_string());
                None
            }
            Ok(Err(join_err)) => {
                let err = RuleError::Panicked {
                    rule: descriptor.name.clone(),
                    message: panic_message(join_err),
                };
                events::rule_failed(&descriptor.name, &action.id, record.latency_ms, &err.to_string());
                mark_failed(&mut record, err.to_string());
                None
            }
            Err(_elapsed) => {
                let timeout_ms = timeout.as_millis() as u64;
                let err = RuleError::Timeout {
                    rule: descriptor.name.clone(),
                    timeout_ms,
                };
                let (outcome, effect) = match policy {
                    TimeoutPolicy::FailOpen => (Outcome::Allow, "allowed"),
                    TimeoutPolicy::FailClosed => (Outcome::Block, "blocked"),
                };
                events::rule_timed_out(&descriptor.name, &action.id, timeout_ms, policy.as_str());
                record.outcome = outcome;
                record.status = ExecutionStatus::TimedOut;
                record.error = Some(err.to_string());
                Some(format!(
                    "{} timed out after {timeout_ms}ms; action {effect}",
                    descriptor.name
                ))
            }
        };

        RuleRun {
            record,
            message,
            resolved,
            latency,
        }
    }
}

/// Deadline `timeout` from now. Saturates about thirty years out, as
/// `tokio::time::timeout` does.
pub(crate) fn deadline_after(timeout: Duration) -> tokio::time::Instant {
    let now = tokio::time::Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(86_400 * 365 * 30))
}

fn mark_failed(record: &mut ExecutionRecord, error: String) {
    record.outcome = Outcome::Error;
    record.status = ExecutionStatus::Failed;
    record.error = Some(error);
}

fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
