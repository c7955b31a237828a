//! LearningStore: owns the database and the batch writer, and exposes the
//! record/query surface used by the engine, the tuner and operators.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use warden_core::config::StorageConfig;
use warden_core::errors::StorageError;
use warden_core::models::{
    ExecutionRecord, MetricsScope, OptimizationProposal, ParameterChange, ParameterValue,
    PatternDelta, PatternKey, ProposalState, RollbackRecord, SystemMetrics,
};
use warden_core::traits::IExecutionSink;
use warden_observability::events;

use crate::batch::{BatchWriter, WriteCommand, WriteStats};
use crate::connection::writer::with_immediate_transaction;
use crate::connection::DatabaseManager;
use crate::queries::patterns::PatternEffectiveness;
use crate::queries::{executions, metrics, parameters, patterns, proposals};
use crate::retention::{self, RetentionReport};

pub struct LearningStore {
    db: Arc<DatabaseManager>,
    writer: Arc<BatchWriter>,
}

impl LearningStore {
    /// Open (or create) the store at `config.db_path`.
    pub fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        Self::open_path(Path::new(&config.db_path), config)
    }

    pub fn open_path(path: &Path, config: &StorageConfig) -> Result<Self, StorageError> {
        let db = Arc::new(DatabaseManager::open(path, config.read_pool_size)?);
        Self::with_manager(db, config)
    }

    /// In-memory store; reads share the writer connection.
    pub fn open_in_memory(config: &StorageConfig) -> Result<Self, StorageError> {
        let db = Arc::new(DatabaseManager::open_in_memory()?);
        Self::with_manager(db, config)
    }

    fn with_manager(db: Arc<DatabaseManager>, config: &StorageConfig) -> Result<Self, StorageError> {
        let writer = Arc::new(BatchWriter::new(
            Arc::clone(&db),
            config.writer_queue_capacity,
            config.writer_batch_size,
        )?);
        Ok(Self { db, writer })
    }

    pub fn db(&self) -> &DatabaseManager {
        &self.db
    }

    pub fn writer(&self) -> &BatchWriter {
        &self.writer
    }

    /// The batch writer as an execution sink for the engine.
    pub fn sink(&self) -> Arc<dyn IExecutionSink> {
        Arc::clone(&self.writer) as Arc<dyn IExecutionSink>
    }

    // --- fire-and-forget writes ---

    /// Queue an execution record. Never blocks; failures are logged.
    pub fn record_execution(&self, record: ExecutionRecord) {
        self.writer.record_execution(record);
    }

    /// Queue a pattern counter increment. Never blocks; failures are logged.
    pub fn record_pattern_outcome(&self, rule: &str, pattern: &PatternKey, delta: PatternDelta) {
        if delta.is_empty() {
            return;
        }
        let command = WriteCommand::ApplyPatternDelta {
            rule: rule.to_string(),
            pattern: pattern.clone(),
            delta,
        };
        if let Err(err) = self.writer.try_send(command) {
            events::persistence_write_failed(
                &format!("pattern delta {rule} / {pattern}"),
                &err.to_string(),
            );
        }
    }

    /// Queue a first-use parameter default. Never blocks; failures are logged.
    pub fn record_parameter_default(&self, name: &str, value: &ParameterValue) {
        let command = WriteCommand::InsertParameterDefault {
            name: name.to_string(),
            value: value.clone(),
        };
        if let Err(err) = self.writer.try_send(command) {
            events::persistence_write_failed(&format!("parameter default {name}"), &err.to_string());
        }
    }

    /// Block until queued writes are committed.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.writer.flush()
    }

    /// Drain and stop the batch writer, then checkpoint the WAL.
    pub fn shutdown(&self) -> Result<WriteStats, StorageError> {
        let stats = self.writer.shutdown()?;
        self.db.checkpoint()?;
        Ok(stats)
    }

    // --- reads ---

    pub fn recent_executions(
        &self,
        rule: &str,
        limit: usize,
    ) -> Result<Vec<ExecutionRecord>, StorageError> {
        self.db
            .with_reader(|conn| executions::recent_executions(conn, rule, limit))
    }

    pub fn executions_for_action(
        &self,
        action_id: &str,
    ) -> Result<Vec<ExecutionRecord>, StorageError> {
        self.db
            .with_reader(|conn| executions::executions_for_action(conn, action_id))
    }

    pub fn execution_count(&self) -> Result<u64, StorageError> {
        self.db.with_reader(executions::count)
    }

    pub fn pattern_effectiveness(
        &self,
        rule: &str,
    ) -> Result<Vec<PatternEffectiveness>, StorageError> {
        let stats = self
            .db
            .with_reader(|conn| patterns::stats_for_rule(conn, rule))?;
        Ok(stats.into_iter().map(PatternEffectiveness::from).collect())
    }

    pub fn pattern_effectiveness_for(
        &self,
        rule: &str,
        pattern: &PatternKey,
    ) -> Result<Option<PatternEffectiveness>, StorageError> {
        let stat = self
            .db
            .with_reader(|conn| patterns::get_stat(conn, rule, pattern))?;
        Ok(stat.map(PatternEffectiveness::from))
    }

    /// System-wide metrics over the trailing `window`.
    pub fn system_metrics(&self, window: Duration) -> Result<SystemMetrics, StorageError> {
        self.scope_metrics(&MetricsScope::System, window_start(window))
    }

    pub fn scope_metrics(
        &self,
        scope: &MetricsScope,
        since: DateTime<Utc>,
    ) -> Result<SystemMetrics, StorageError> {
        self.db
            .with_reader(|conn| metrics::scope_metrics(conn, scope, since))
    }

    /// `(executions, successes)` for `scope` in `[since, until)`.
    pub fn success_counts(
        &self,
        scope: &MetricsScope,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<(u64, u64), StorageError> {
        self.db
            .with_reader(|conn| metrics::success_counts(conn, scope, since, until))
    }

    // --- parameters ---

    pub fn load_parameters(&self) -> Result<BTreeMap<String, ParameterValue>, StorageError> {
        self.db.with_reader(parameters::load_all)
    }

    /// Append `change` to the history and set the current value, atomically.
    pub fn apply_parameter_change(&self, change: &ParameterChange) -> Result<(), StorageError> {
        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| {
                parameters::insert_history(tx, change)?;
                parameters::upsert_value(tx, &change.name, &change.new_value, change.timestamp)
            })
        })
    }

    /// Apply a proposal's change and persist the proposal's new state in the
    /// same transaction.
    pub fn apply_proposal(
        &self,
        change: &ParameterChange,
        proposal: &OptimizationProposal,
    ) -> Result<(), StorageError> {
        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| {
                parameters::insert_history(tx, change)?;
                parameters::upsert_value(tx, &change.name, &change.new_value, change.timestamp)?;
                proposals::upsert_proposal(tx, proposal)
            })
        })
    }

    pub fn parameter_history(
        &self,
        name: &str,
        limit: usize,
    ) -> Result<Vec<ParameterChange>, StorageError> {
        self.db
            .with_reader(|conn| parameters::history(conn, name, limit))
    }

    pub fn last_parameter_changes(&self) -> Result<Vec<(String, DateTime<Utc>)>, StorageError> {
        self.db.with_reader(parameters::last_change_times)
    }

    // --- proposals & rollbacks ---

    pub fn save_proposal(&self, proposal: &OptimizationProposal) -> Result<(), StorageError> {
        self.db
            .with_writer(|conn| proposals::upsert_proposal(conn, proposal))
    }

    pub fn proposal(&self, id: &str) -> Result<Option<OptimizationProposal>, StorageError> {
        self.db.with_reader(|conn| proposals::get_proposal(conn, id))
    }

    pub fn proposals(
        &self,
        state: Option<ProposalState>,
        limit: usize,
    ) -> Result<Vec<OptimizationProposal>, StorageError> {
        self.db
            .with_reader(|conn| proposals::list_proposals(conn, state, limit))
    }

    /// Revert a monitored change in one transaction: history row, restored
    /// value, rollback row, and the proposal's final state.
    pub fn record_rollback(
        &self,
        change: &ParameterChange,
        rollback: &RollbackRecord,
        proposal: &OptimizationProposal,
    ) -> Result<i64, StorageError> {
        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| {
                parameters::insert_history(tx, change)?;
                parameters::upsert_value(tx, &change.name, &change.new_value, change.timestamp)?;
                let id = proposals::insert_rollback(tx, rollback)?;
                proposals::upsert_proposal(tx, proposal)?;
                Ok(id)
            })
        })
    }

    pub fn rollbacks(&self, parameter: Option<&str>) -> Result<Vec<RollbackRecord>, StorageError> {
        self.db
            .with_reader(|conn| proposals::list_rollbacks(conn, parameter))
    }

    // --- maintenance ---

    /// Purge execution records older than `retention_days`.
    pub fn purge(&self, retention_days: u32) -> Result<RetentionReport, StorageError> {
        let report = self
            .db
            .with_writer(|conn| retention::apply_retention(conn, retention_days, Utc::now()))?;
        events::retention_completed(report.total_deleted, report.duration_ms);
        Ok(report)
    }
}

fn window_start(window: Duration) -> DateTime<Utc> {
    let window = chrono::Duration::from_std(window)
        .unwrap_or_else(|_| chrono::Duration::days(365 * 1000));
    Utc::now()
        .checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
