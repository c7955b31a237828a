//! Error handling for Warden.
//! One error enum per subsystem, `thiserror` only.

pub mod config_error;
pub mod rule_error;
pub mod storage_error;

pub use config_error::ConfigError;
pub use rule_error::RuleError;
pub use storage_error::StorageError;

/// Top-level error aggregating subsystem errors via `From` conversions.
#[derive(Debug, thiserror::Error)]
pub enum WardenError {
    #[error("storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("rule error: {0}")]
    RuleError(#[from] RuleError),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("rule not found: {name}")]
    RuleNotFound { name: String },

    #[error("duplicate rule registration: {name}")]
    DuplicateRule { name: String },

    #[error("parameter not found: {name}")]
    ParameterNotFound { name: String },

    #[error("parameter {name} expects a {expected} value")]
    ParameterTypeMismatch { name: String, expected: String },

    #[error("invalid proposal transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("A/B test already running for parameter {parameter}")]
    AbTestAlreadyActive { parameter: String },

    #[error("no A/B test running for parameter {parameter}")]
    AbTestNotFound { parameter: String },

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("concurrency error: {0}")]
    ConcurrencyError(String),
}

/// Convenience alias used throughout the workspace.
pub type WardenResult<T> = Result<T, WardenError>;
