//! Queries for optimization_proposals and rollbacks.

use rusqlite::{params, Connection, OptionalExtension, Row};

use warden_core::errors::StorageError;
use warden_core::models::{
    OptimizationKind, OptimizationProposal, ParameterValue, ProposalState, RollbackRecord,
};

use crate::{corrupt, from_millis, to_millis, to_storage_err};

const SELECT_PROPOSAL: &str = "SELECT id, parameter, kind, old_value, new_value, confidence,
    rationale, stats_json, scope_json, state, baseline_success_rate,
    created_at, applied_at, resolved_at
    FROM optimization_proposals";

fn json<T: serde::Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|e| to_storage_err(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(table: &str, text: &str) -> Result<T, StorageError> {
    serde_json::from_str(text).map_err(|e| corrupt(table, e.to_string()))
}

/// Insert a proposal or overwrite its mutable columns.
pub fn upsert_proposal(
    conn: &Connection,
    proposal: &OptimizationProposal,
) -> Result<(), StorageError> {
    let old_value = json(&proposal.old_value)?;
    let new_value = json(&proposal.new_value)?;
    let stats = json(&proposal.stats)?;
    let scope = json(&proposal.scope)?;
    conn.prepare_cached(
        "INSERT INTO optimization_proposals
            (id, parameter, kind, old_value, new_value, confidence, rationale,
             stats_json, scope_json, state, baseline_success_rate,
             created_at, applied_at, resolved_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(id) DO UPDATE SET
            state = excluded.state,
            baseline_success_rate = excluded.baseline_success_rate,
            applied_at = excluded.applied_at,
            resolved_at = excluded.resolved_at",
    )
    .and_then(|mut stmt| {
        stmt.execute(params![
            proposal.id,
            proposal.parameter,
            proposal.kind.as_str(),
            old_value,
            new_value,
            proposal.confidence,
            proposal.rationale,
            stats,
            scope,
            proposal.state.as_str(),
            proposal.baseline_success_rate,
            to_millis(proposal.created_at),
            proposal.applied_at.map(to_millis),
            proposal.resolved_at.map(to_millis),
        ])
    })
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

struct ProposalRow {
    id: String,
    parameter: String,
    kind: String,
    old_value: String,
    new_value: String,
    confidence: f64,
    rationale: String,
    stats_json: String,
    scope_json: String,
    state: String,
    baseline_success_rate: Option<f64>,
    created_at: i64,
    applied_at: Option<i64>,
    resolved_at: Option<i64>,
}

impl ProposalRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            parameter: row.get(1)?,
            kind: row.get(2)?,
            old_value: row.get(3)?,
            new_value: row.get(4)?,
            confidence: row.get(5)?,
            rationale: row.get(6)?,
            stats_json: row.get(7)?,
            scope_json: row.get(8)?,
            state: row.get(9)?,
            baseline_success_rate: row.get(10)?,
            created_at: row.get(11)?,
            applied_at: row.get(12)?,
            resolved_at: row.get(13)?,
        })
    }

    fn into_proposal(self) -> Result<OptimizationProposal, StorageError> {
        const TABLE: &str = "optimization_proposals";
        Ok(OptimizationProposal {
            id: self.id,
            parameter: self.parameter,
            kind: self
                .kind
                .parse::<OptimizationKind>()
                .map_err(|e| corrupt(TABLE, e))?,
            old_value: from_json(TABLE, &self.old_value)?,
            new_value: from_json(TABLE, &self.new_value)?,
            confidence: self.confidence,
            rationale: self.rationale,
            stats: from_json(TABLE, &self.stats_json)?,
            scope: from_json(TABLE, &self.scope_json)?,
            state: self
                .state
                .parse::<ProposalState>()
                .map_err(|e| corrupt(TABLE, e))?,
            baseline_success_rate: self.baseline_success_rate,
            created_at: from_millis(self.created_at),
            applied_at: self.applied_at.map(from_millis),
            resolved_at: self.resolved_at.map(from_millis),
        })
    }
}

pub fn get_proposal(
    conn: &Connection,
    id: &str,
) -> Result<Option<OptimizationProposal>, StorageError> {
    let sql = format!("{SELECT_PROPOSAL} WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id], ProposalRow::from_row)
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    row.map(ProposalRow::into_proposal).transpose()
}

/// Proposals in `state` (or all), newest first.
pub fn list_proposals(
    conn: &Connection,
    state: Option<ProposalState>,
    limit: usize,
) -> Result<Vec<OptimizationProposal>, StorageError> {
    let sql = format!(
        "{SELECT_PROPOSAL} WHERE (?1 IS NULL OR state = ?1)
         ORDER BY created_at DESC, rowid DESC LIMIT ?2"
    );
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(
            params![state.map(|s| s.as_str()), limit as i64],
            ProposalRow::from_row,
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut proposals = Vec::new();
    for row in rows {
        let row = row.map_err(|e| to_storage_err(e.to_string()))?;
        proposals.push(row.into_proposal()?);
    }
    Ok(proposals)
}

pub fn insert_rollback(conn: &Connection, rollback: &RollbackRecord) -> Result<i64, StorageError> {
    let restored = json(&rollback.restored_value)?;
    let abandoned = json(&rollback.abandoned_value)?;
    conn.prepare_cached(
        "INSERT INTO rollbacks
            (proposal_id, parameter, restored_value, abandoned_value,
             baseline_success_rate, observed_success_rate, degradation, ts)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .and_then(|mut stmt| {
        stmt.execute(params![
            rollback.proposal_id,
            rollback.parameter,
            restored,
            abandoned,
            rollback.baseline_success_rate,
            rollback.observed_success_rate,
            rollback.degradation,
            to_millis(rollback.timestamp),
        ])
    })
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(conn.last_insert_rowid())
}

type RollbackRow = (i64, String, String, String, String, f64, f64, f64, i64);

/// Rollbacks of `parameter` (or all), oldest first.
pub fn list_rollbacks(
    conn: &Connection,
    parameter: Option<&str>,
) -> Result<Vec<RollbackRecord>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT id, proposal_id, parameter, restored_value, abandoned_value,
                    baseline_success_rate, observed_success_rate, degradation, ts
             FROM rollbacks WHERE (?1 IS NULL OR parameter = ?1) ORDER BY id",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![parameter], |row| -> rusqlite::Result<RollbackRow> {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
            ))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut rollbacks = Vec::new();
    for row in rows {
        let (id, proposal_id, parameter, restored, abandoned, baseline, observed, degradation, ts) =
            row.map_err(|e| to_storage_err(e.to_string()))?;
        rollbacks.push(RollbackRecord {
            id,
            proposal_id,
            parameter,
            restored_value: from_json::<ParameterValue>("rollbacks", &restored)?,
            abandoned_value: from_json::<ParameterValue>("rollbacks", &abandoned)?,
            baseline_success_rate: baseline,
            observed_success_rate: observed,
            degradation,
            timestamp: from_millis(ts),
        });
    }
    Ok(rollbacks)
}
