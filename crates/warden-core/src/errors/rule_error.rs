/// Faults raised at the rule boundary.
///
/// These are absorbed by the execution engine and end up as the `error`
/// column of an execution record. They never reach the action's originator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuleError {
    #[error("rule {rule} timed out after {timeout_ms}ms")]
    Timeout { rule: String, timeout_ms: u64 },

    #[error("rule {rule} failed: {message}")]
    Execution { rule: String, message: String },

    #[error("rule {rule} panicked: {message}")]
    Panicked { rule: String, message: String },

    #[error("rule {rule} cancelled")]
    Cancelled { rule: String },
}

impl RuleError {
    /// Convenience constructor for rule implementations.
    pub fn execution(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            rule: rule.into(),
            message: message.into(),
        }
    }
}
