//! Windowed aggregates over the executions table.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use warden_core::errors::StorageError;
use warden_core::models::{MetricsScope, SystemMetrics};

use crate::{to_millis, to_storage_err};

/// Outcome and status counts plus mean latency for `scope` since `since`.
pub fn scope_metrics(
    conn: &Connection,
    scope: &MetricsScope,
    since: DateTime<Utc>,
) -> Result<SystemMetrics, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT COUNT(*),
                    COALESCE(SUM(outcome = 'allow'), 0),
                    COALESCE(SUM(outcome = 'warn'), 0),
                    COALESCE(SUM(outcome = 'block'), 0),
                    COALESCE(SUM(outcome = 'error'), 0),
                    COALESCE(SUM(status = 'timed_out'), 0),
                    COALESCE(AVG(latency_ms), 0.0)
             FROM executions
             WHERE ts >= ?1 AND (?2 IS NULL OR rule = ?2)",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    stmt.query_row(params![to_millis(since), scope.rule()], |row| {
        Ok(SystemMetrics {
            scope: scope.clone(),
            since,
            total: row.get::<_, i64>(0)? as u64,
            allowed: row.get::<_, i64>(1)? as u64,
            warned: row.get::<_, i64>(2)? as u64,
            blocked: row.get::<_, i64>(3)? as u64,
            errored: row.get::<_, i64>(4)? as u64,
            timed_out: row.get::<_, i64>(5)? as u64,
            mean_latency_ms: row.get(6)?,
        })
    })
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Count and success count of executions for `scope` in `[since, until)`.
pub fn success_counts(
    conn: &Connection,
    scope: &MetricsScope,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<(u64, u64), StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT COUNT(*), COALESCE(SUM(status = 'completed'), 0)
             FROM executions
             WHERE ts >= ?1 AND ts < ?2 AND (?3 IS NULL OR rule = ?3)",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    stmt.query_row(
        params![to_millis(since), to_millis(until), scope.rule()],
        |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, i64>(1)? as u64)),
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
