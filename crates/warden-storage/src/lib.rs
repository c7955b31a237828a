//! # warden-storage
//!
//! The learning store: SQLite persistence for execution records, pattern
//! statistics, parameters and their history, optimization proposals and
//! rollbacks. Execution writes go through a bounded batch writer on a
//! dedicated thread so the decision path never waits on disk.

pub mod batch;
pub mod connection;
pub mod migrations;
pub mod parameter_store;
pub mod queries;
pub mod retention;
pub mod store;

pub use batch::{BatchWriter, WriteCommand, WriteStats};
pub use connection::DatabaseManager;
pub use parameter_store::ParameterStore;
pub use queries::patterns::PatternEffectiveness;
pub use retention::RetentionReport;
pub use store::LearningStore;

use chrono::{DateTime, Utc};
use warden_core::errors::StorageError;

/// Convert an error message into a `StorageError::SqliteError`.
pub(crate) fn to_storage_err(message: impl Into<String>) -> StorageError {
    StorageError::SqliteError {
        message: message.into(),
    }
}

/// Timestamps are stored as INTEGER milliseconds since the Unix epoch.
pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

pub(crate) fn corrupt(table: &str, details: impl Into<String>) -> StorageError {
    StorageError::CorruptRow {
        table: table.to_string(),
        details: details.into(),
    }
}
