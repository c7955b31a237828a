//! Structured log events for key pipeline operations.
//!
//! Each function emits a `tracing` event with structured fields. Values are
//! passed pre-rendered so callers decide their own formatting.

/// A rule exceeded its timeout and was cancelled.
pub fn rule_timed_out(rule: &str, action_id: &str, timeout_ms: u64, policy: &str) {
    tracing::warn!(
        event = "rule_timed_out",
        rule = %rule,
        action_id = %action_id,
        latency_ms = timeout_ms,
        timeout_ms = timeout_ms,
        policy = %policy,
        "rule timed out"
    );
}

/// A rule returned an error or panicked. The decision failed open.
pub fn rule_failed(rule: &str, action_id: &str, latency_ms: f64, error: &str) {
    tracing::error!(
        event = "rule_failed",
        rule = %rule,
        action_id = %action_id,
        latency_ms = latency_ms,
        error = %error,
        "rule failed"
    );
}

/// An execution record could not be queued or written.
pub fn execution_write_failed(rule: &str, action_id: &str, latency_ms: f64, error: &str) {
    tracing::error!(
        event = "persistence_write_failed",
        rule = %rule,
        action_id = %action_id,
        latency_ms = latency_ms,
        error = %error,
        "execution record dropped"
    );
}

/// Any other learning store write that was dropped.
pub fn persistence_write_failed(operation: &str, error: &str) {
    tracing::error!(
        event = "persistence_write_failed",
        operation = %operation,
        error = %error,
        "learning store write dropped"
    );
}

/// A batch transaction failed and is being replayed command by command.
pub fn batch_write_failed(commands: usize, error: &str) {
    tracing::warn!(
        event = "batch_write_failed",
        commands = commands,
        error = %error,
        "batch commit failed, replaying individually"
    );
}

pub fn decision_made(action_id: &str, outcome: &str, rules: usize, latency_ms: f64) {
    tracing::debug!(
        event = "decision_made",
        action_id = %action_id,
        outcome = %outcome,
        rules = rules,
        latency_ms = latency_ms,
        "decision made"
    );
}

/// The caller aborted an action while rules were in flight.
pub fn submit_cancelled(action_id: &str, in_flight: usize) {
    tracing::info!(
        event = "submit_cancelled",
        action_id = %action_id,
        in_flight = in_flight,
        "submit cancelled"
    );
}

pub fn optimization_applied(
    parameter: &str,
    kind: &str,
    old_value: &str,
    new_value: &str,
    confidence: f64,
    rationale: &str,
) {
    tracing::info!(
        event = "optimization_applied",
        parameter = %parameter,
        kind = %kind,
        old_value = %old_value,
        new_value = %new_value,
        confidence = confidence,
        rationale = %rationale,
        "optimization applied"
    );
}

/// A proposal computed in dry-run mode.
pub fn optimization_proposed(
    parameter: &str,
    kind: &str,
    old_value: &str,
    new_value: &str,
    confidence: f64,
) {
    tracing::info!(
        event = "optimization_proposed",
        parameter = %parameter,
        kind = %kind,
        old_value = %old_value,
        new_value = %new_value,
        confidence = confidence,
        dry_run = true,
        "optimization proposed (dry run)"
    );
}

/// Skips are routine outcomes of the cooldown and sample-size gates.
pub fn optimization_skipped(parameter: &str, reason: &str) {
    tracing::debug!(
        event = "optimization_skipped",
        parameter = %parameter,
        reason = %reason,
        "optimization skipped"
    );
}

pub fn rollback_triggered(
    parameter: &str,
    restored_value: &str,
    abandoned_value: &str,
    baseline_success_rate: f64,
    observed_success_rate: f64,
    degradation: f64,
) {
    tracing::warn!(
        event = "rollback_triggered",
        parameter = %parameter,
        restored_value = %restored_value,
        abandoned_value = %abandoned_value,
        baseline_success_rate = baseline_success_rate,
        observed_success_rate = observed_success_rate,
        degradation = degradation,
        "optimization rolled back"
    );
}

pub fn proposal_accepted(parameter: &str, proposal_id: &str, observed_success_rate: Option<f64>) {
    tracing::info!(
        event = "proposal_accepted",
        parameter = %parameter,
        proposal_id = %proposal_id,
        observed_success_rate = ?observed_success_rate,
        "optimization accepted"
    );
}

pub fn ab_test_started(
    parameter: &str,
    control_value: &str,
    variant_value: &str,
    duration_secs: u64,
    sample_ratio: f64,
) {
    tracing::info!(
        event = "ab_test_started",
        parameter = %parameter,
        control_value = %control_value,
        variant_value = %variant_value,
        duration_secs = duration_secs,
        sample_ratio = sample_ratio,
        "A/B test started"
    );
}

pub fn ab_test_concluded(
    parameter: &str,
    winner: &str,
    confidence: f64,
    control_success_rate: f64,
    variant_success_rate: f64,
) {
    tracing::info!(
        event = "ab_test_concluded",
        parameter = %parameter,
        winner = %winner,
        confidence = confidence,
        control_success_rate = control_success_rate,
        variant_success_rate = variant_success_rate,
        "A/B test concluded"
    );
}

pub fn retention_completed(deleted: u64, duration_ms: u64) {
    tracing::info!(
        event = "retention_completed",
        deleted = deleted,
        duration_ms = duration_ms,
        "retention purge completed"
    );
}

pub fn tuning_cycle_completed(cycle: u64, applied: usize, skipped: usize, rollbacks: usize) {
    tracing::info!(
        event = "tuning_cycle_completed",
        cycle = cycle,
        applied = applied,
        skipped = skipped,
        rollbacks = rollbacks,
        "tuning cycle completed"
    );
}
