//! Queries for parameters and parameter_history.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use warden_core::errors::StorageError;
use warden_core::models::{ParameterChange, ParameterValue};

use crate::{corrupt, from_millis, to_millis, to_storage_err};

fn decode(table: &str, kind: &str, text: &str) -> Result<ParameterValue, StorageError> {
    ParameterValue::decode(kind, text).map_err(|e| corrupt(table, e.to_string()))
}

/// Every persisted parameter value, keyed by name.
pub fn load_all(conn: &Connection) -> Result<BTreeMap<String, ParameterValue>, StorageError> {
    let mut stmt = conn
        .prepare_cached("SELECT name, kind, value FROM parameters")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut values = BTreeMap::new();
    for row in rows {
        let (name, kind, text) = row.map_err(|e| to_storage_err(e.to_string()))?;
        let value = decode("parameters", &kind, &text)?;
        values.insert(name, value);
    }
    Ok(values)
}

/// Persist a first-use default. An existing row wins.
pub fn insert_default(
    conn: &Connection,
    name: &str,
    value: &ParameterValue,
    at: DateTime<Utc>,
) -> Result<bool, StorageError> {
    let inserted = conn
        .prepare_cached(
            "INSERT OR IGNORE INTO parameters (name, kind, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .and_then(|mut stmt| stmt.execute(params![name, value.kind(), value.encode(), to_millis(at)]))
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(inserted > 0)
}

pub fn upsert_value(
    conn: &Connection,
    name: &str,
    value: &ParameterValue,
    at: DateTime<Utc>,
) -> Result<(), StorageError> {
    conn.prepare_cached(
        "INSERT INTO parameters (name, kind, value, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(name) DO UPDATE SET
            kind = excluded.kind,
            value = excluded.value,
            updated_at = excluded.updated_at",
    )
    .and_then(|mut stmt| stmt.execute(params![name, value.kind(), value.encode(), to_millis(at)]))
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn insert_history(conn: &Connection, change: &ParameterChange) -> Result<i64, StorageError> {
    conn.prepare_cached(
        "INSERT INTO parameter_history
            (name, kind, old_value, new_value, reason, confidence, ts)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .and_then(|mut stmt| {
        stmt.execute(params![
            change.name,
            change.new_value.kind(),
            change.old_value.as_ref().map(ParameterValue::encode),
            change.new_value.encode(),
            change.reason,
            change.confidence,
            to_millis(change.timestamp),
        ])
    })
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(conn.last_insert_rowid())
}

type HistoryRow = (String, String, Option<String>, String, String, f64, i64);

fn read_history_row(row: &Row<'_>) -> rusqlite::Result<HistoryRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn into_change(row: HistoryRow) -> Result<ParameterChange, StorageError> {
    let (name, kind, old_value, new_value, reason, confidence, ts) = row;
    let old_value = old_value
        .map(|text| decode("parameter_history", &kind, &text))
        .transpose()?;
    Ok(ParameterChange {
        name,
        old_value,
        new_value: decode("parameter_history", &kind, &new_value)?,
        reason,
        confidence,
        timestamp: from_millis(ts),
    })
}

/// Change history of one parameter, newest first.
pub fn history(
    conn: &Connection,
    name: &str,
    limit: usize,
) -> Result<Vec<ParameterChange>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT name, kind, old_value, new_value, reason, confidence, ts
             FROM parameter_history WHERE name = ?1
             ORDER BY ts DESC, id DESC LIMIT ?2",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![name, limit as i64], read_history_row)
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut changes = Vec::new();
    for row in rows {
        let row = row.map_err(|e| to_storage_err(e.to_string()))?;
        changes.push(into_change(row)?);
    }
    Ok(changes)
}

/// Time of the latest recorded change per parameter.
pub fn last_change_times(conn: &Connection) -> Result<Vec<(String, DateTime<Utc>)>, StorageError> {
    let mut stmt = conn
        .prepare_cached("SELECT name, MAX(ts) FROM parameter_history GROUP BY name")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut times = Vec::new();
    for row in rows {
        let (name, ts) = row.map_err(|e| to_storage_err(e.to_string()))?;
        times.push((name, from_millis(ts)));
    }
    Ok(times)
}

pub fn history_count(conn: &Connection, name: &str) -> Result<u64, StorageError> {
    conn.query_row(
        "SELECT COUNT(*) FROM parameter_history WHERE name = ?1",
        params![name],
        |row| row.get::<_, i64>(0),
    )
    .map(|n| n as u64)
    .map_err(|e| to_storage_err(e.to_string()))
}
