//! Span definitions for the submit path and the tuning cycle.

/// Span around one `submit` call.
#[macro_export]
macro_rules! submit_span {
    ($action_id:expr, $category:expr) => {
        tracing::info_span!("warden.submit", action_id = %$action_id, category = %$category)
    };
}

/// Span around one rule evaluation.
#[macro_export]
macro_rules! rule_span {
    ($rule:expr, $action_id:expr) => {
        tracing::debug_span!("warden.rule", rule = %$rule, action_id = %$action_id)
    };
}

/// Span around one tuner cycle.
#[macro_export]
macro_rules! tuning_span {
    ($cycle:expr) => {
        tracing::info_span!("warden.tuning", cycle = $cycle)
    };
}

/// Span names as constants for programmatic use.
pub mod names {
    pub const SUBMIT: &str = "warden.submit";
    pub const RULE: &str = "warden.rule";
    pub const TUNING: &str = "warden.tuning";
}
