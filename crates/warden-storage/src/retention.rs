//! Retention for the learning store.
//!
//! Only raw execution records expire. `pattern_stats`, `parameters`,
//! `parameter_history`, proposals and rollbacks are summaries or audit trail
//! and are kept indefinitely.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use serde::Serialize;

use warden_core::errors::StorageError;

use crate::queries::executions;
use crate::to_storage_err;

/// Report of what was cleaned.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetentionReport {
    pub total_deleted: u64,
    pub per_table: Vec<TableCleanup>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableCleanup {
    pub table: String,
    pub deleted: u64,
}

/// Delete execution records older than `retention_days` before `now`.
/// Runs inside a single transaction.
pub fn apply_retention(
    conn: &Connection,
    retention_days: u32,
    now: DateTime<Utc>,
) -> Result<RetentionReport, StorageError> {
    let start = std::time::Instant::now();
    let cutoff = now - Duration::days(i64::from(retention_days));

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("retention begin: {e}")))?;
    let deleted = executions::delete_before(&tx, cutoff)?;
    tx.commit().map_err(|e| to_storage_err(e.to_string()))?;

    Ok(RetentionReport {
        total_deleted: deleted,
        per_table: vec![TableCleanup {
            table: "executions".to_string(),
            deleted,
        }],
        duration_ms: start.elapsed().as_millis() as u64,
    })
}
