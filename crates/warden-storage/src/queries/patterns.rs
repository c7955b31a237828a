//! Queries for pattern_stats: upsert-with-increment counters per (rule, pattern).

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use warden_core::errors::StorageError;
use warden_core::models::{PatternDelta, PatternKey, PatternMetrics, PatternStat};

use crate::{corrupt, from_millis, to_millis, to_storage_err};

/// A pattern's counters together with the metrics derived from them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternEffectiveness {
    pub stat: PatternStat,
    pub metrics: PatternMetrics,
}

impl From<PatternStat> for PatternEffectiveness {
    fn from(stat: PatternStat) -> Self {
        let metrics = stat.metrics();
        Self { stat, metrics }
    }
}

/// Add `delta` to the counters of (rule, pattern), creating the row if needed.
pub fn apply_delta(
    conn: &Connection,
    rule: &str,
    pattern: &PatternKey,
    delta: &PatternDelta,
    at: DateTime<Utc>,
) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO pattern_stats (rule, pattern_key, tp, fp, tn, fn, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(rule, pattern_key) DO UPDATE SET
                tp = tp + excluded.tp,
                fp = fp + excluded.fp,
                tn = tn + excluded.tn,
                fn = fn + excluded.fn,
                updated_at = excluded.updated_at",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    stmt.execute(params![
        rule,
        pattern.to_string(),
        delta.true_positives as i64,
        delta.false_positives as i64,
        delta.true_negatives as i64,
        delta.false_negatives as i64,
        to_millis(at),
    ])
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

type StatRow = (String, String, i64, i64, i64, i64, i64);

fn read_stat_row(row: &Row<'_>) -> rusqlite::Result<StatRow> {
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

fn into_stat(row: StatRow) -> Result<PatternStat, StorageError> {
    let (rule, key, tp, fp, tn, fneg, updated_at) = row;
    let pattern = key
        .parse::<PatternKey>()
        .map_err(|e| corrupt("pattern_stats", e))?;
    Ok(PatternStat {
        rule,
        pattern,
        true_positives: tp as u64,
        false_positives: fp as u64,
        true_negatives: tn as u64,
        false_negatives: fneg as u64,
        updated_at: from_millis(updated_at),
    })
}

/// All pattern counters of one rule, ordered by pattern key.
pub fn stats_for_rule(conn: &Connection, rule: &str) -> Result<Vec<PatternStat>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT rule, pattern_key, tp, fp, tn, fn, updated_at
             FROM pattern_stats WHERE rule = ?1 ORDER BY pattern_key",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![rule], read_stat_row)
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut stats = Vec::new();
    for row in rows {
        let row = row.map_err(|e| to_storage_err(e.to_string()))?;
        stats.push(into_stat(row)?);
    }
    Ok(stats)
}

pub fn get_stat(
    conn: &Connection,
    rule: &str,
    pattern: &PatternKey,
) -> Result<Option<PatternStat>, StorageError> {
    let row: Option<StatRow> = conn
        .query_row(
            "SELECT rule, pattern_key, tp, fp, tn, fn, updated_at
             FROM pattern_stats WHERE rule = ?1 AND pattern_key = ?2",
            params![rule, pattern.to_string()],
            read_stat_row,
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    row.map(into_stat).transpose()
}
