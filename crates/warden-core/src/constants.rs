/// Warden system version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the global strictness parameter shared by every rule.
pub const STRICTNESS_PARAMETER: &str = "strictness";

/// Suffix of the per-rule timeout parameter (`<rule>.timeout_ms`).
pub const TIMEOUT_PARAMETER_SUFFIX: &str = "timeout_ms";

/// Suffix of the per-pattern sensitivity parameter.
pub const SENSITIVITY_PARAMETER_SUFFIX: &str = "sensitivity";

/// Hard lower bound for the execution sample the timeout optimizer accepts.
pub const MIN_TIMEOUT_SAMPLE: usize = 50;

/// Executions at which the confidence score earns a sample-size bonus.
pub const CONFIDENCE_SAMPLE_STEPS: [u64; 3] = [50, 100, 500];

/// Upper bound of any confidence score.
pub const MAX_CONFIDENCE: f64 = 0.95;

/// Longest window, cooldown or test duration accepted, in seconds (ten years).
pub const MAX_WINDOW_SECS: u64 = 10 * 365 * 86_400;

/// Maximum number of records a batch writer flushes in one transaction.
pub const MAX_WRITE_BATCH: usize = 256;

/// Build the timeout parameter name for a rule.
pub fn timeout_parameter(rule: &str) -> String {
    format!("{rule}.{TIMEOUT_PARAMETER_SUFFIX}")
}

/// Build the sensitivity parameter name for one pattern of a rule.
pub fn sensitivity_parameter(rule: &str, pattern: &crate::models::PatternKey) -> String {
    format!("{rule}.pattern.{pattern}.{SENSITIVITY_PARAMETER_SUFFIX}")
}
