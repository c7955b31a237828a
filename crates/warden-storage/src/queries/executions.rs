//! Queries for the executions table: append-only log of rule evaluations.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use warden_core::errors::StorageError;
use warden_core::models::{ExecutionRecord, ExecutionStatus, Outcome, PatternKey};

use crate::{corrupt, from_millis, to_millis, to_storage_err};

const SELECT_COLUMNS: &str = "rule, category, action_id, action_hash, outcome, status,
    latency_ms, error, pattern_key, ts";

/// Raw column values; enum columns are parsed after the row is read.
struct ExecutionRow {
    rule: String,
    category: String,
    action_id: String,
    action_hash: String,
    outcome: String,
    status: String,
    latency_ms: f64,
    error: Option<String>,
    pattern_key: Option<String>,
    ts: i64,
}

impl ExecutionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            rule: row.get(0)?,
            category: row.get(1)?,
            action_id: row.get(2)?,
            action_hash: row.get(3)?,
            outcome: row.get(4)?,
            status: row.get(5)?,
            latency_ms: row.get(6)?,
            error: row.get(7)?,
            pattern_key: row.get(8)?,
            ts: row.get(9)?,
        })
    }

    fn into_record(self) -> Result<ExecutionRecord, StorageError> {
        let outcome: Outcome = self.outcome.parse().map_err(|e| corrupt("executions", e))?;
        let status: ExecutionStatus = self.status.parse().map_err(|e| corrupt("executions", e))?;
        let pattern = self
            .pattern_key
            .map(|key| key.parse::<PatternKey>())
            .transpose()
            .map_err(|e| corrupt("executions", e))?;
        Ok(ExecutionRecord {
            rule: self.rule,
            category: self.category,
            action_id: self.action_id,
            action_hash: self.action_hash,
            outcome,
            status,
            latency_ms: self.latency_ms,
            error: self.error,
            pattern,
            timestamp: from_millis(self.ts),
        })
    }
}

pub fn insert_execution(conn: &Connection, record: &ExecutionRecord) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO executions
                (rule, category, action_id, action_hash, outcome, status,
                 latency_ms, error, pattern_key, ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    stmt.execute(params![
        record.rule,
        record.category,
        record.action_id,
        record.action_hash,
        record.outcome.as_str(),
        record.status.as_str(),
        record.latency_ms,
        record.error,
        record.pattern.as_ref().map(ToString::to_string),
        to_millis(record.timestamp),
    ])
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// The last `limit` executions of `rule`, newest first.
pub fn recent_executions(
    conn: &Connection,
    rule: &str,
    limit: usize,
) -> Result<Vec<ExecutionRecord>, StorageError> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM executions WHERE rule = ?1
         ORDER BY ts DESC, id DESC LIMIT ?2"
    );
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![rule, limit as i64], ExecutionRow::from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    collect(rows)
}

/// Every execution recorded for one action, in insertion order.
pub fn executions_for_action(
    conn: &Connection,
    action_id: &str,
) -> Result<Vec<ExecutionRecord>, StorageError> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM executions WHERE action_id = ?1 ORDER BY id");
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![action_id], ExecutionRow::from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    collect(rows)
}

/// Executions of `rule` (or of every rule) since `since`, oldest first.
pub fn executions_since(
    conn: &Connection,
    rule: Option<&str>,
    since: DateTime<Utc>,
) -> Result<Vec<ExecutionRecord>, StorageError> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM executions
         WHERE ts >= ?1 AND (?2 IS NULL OR rule = ?2)
         ORDER BY ts, id"
    );
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![to_millis(since), rule], ExecutionRow::from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    collect(rows)
}

pub fn count(conn: &Connection) -> Result<u64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM executions", [], |row| row.get::<_, i64>(0))
        .map(|n| n as u64)
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Distinct rule names that have at least one execution.
pub fn rule_names(conn: &Connection) -> Result<Vec<String>, StorageError> {
    let mut stmt = conn
        .prepare_cached("SELECT DISTINCT rule FROM executions ORDER BY rule")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Delete executions older than `cutoff`. Returns rows deleted.
pub fn delete_before(conn: &Connection, cutoff: DateTime<Utc>) -> Result<u64, StorageError> {
    conn.execute(
        "DELETE FROM executions WHERE ts < ?1",
        params![to_millis(cutoff)],
    )
    .map(|n| n as u64)
    .map_err(|e| to_storage_err(e.to_string()))
}

fn collect(
    rows: impl Iterator<Item = rusqlite::Result<ExecutionRow>>,
) -> Result<Vec<ExecutionRecord>, StorageError> {
    let mut records = Vec::new();
    for row in rows {
        let row = row.map_err(|e| to_storage_err(e.to_string()))?;
        records.push(row.into_record()?);
    }
    Ok(records)
}
