//! ParameterStore: the live parameter map.
//!
//! The in-memory cache answers every read on the decision path. The database
//! is authoritative across restarts and is loaded into the cache by
//! [`ParameterStore::hydrate`]. Changes are written to the database first and
//! only reach the cache once the transaction has committed.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use warden_core::errors::{StorageError, WardenError, WardenResult};
use warden_core::models::{
    OptimizationProposal, ParameterChange, ParameterSpec, ParameterValue, RollbackRecord,
};

use crate::store::LearningStore;

pub struct ParameterStore {
    store: Arc<LearningStore>,
    cache: DashMap<String, ParameterValue>,
}

impl ParameterStore {
    /// Load every persisted parameter into a fresh cache.
    pub fn hydrate(store: Arc<LearningStore>) -> Result<Self, StorageError> {
        let cache = DashMap::new();
        for (name, value) in store.load_parameters()? {
            cache.insert(name, value);
        }
        tracing::info!(parameters = cache.len(), "parameter cache hydrated");
        Ok(Self { store, cache })
    }

    pub fn get(&self, name: &str) -> Option<ParameterValue> {
        self.cache.get(name).map(|entry| entry.value().clone())
    }

    /// Current value of `spec`, creating it with its default on first use.
    /// The default is persisted through the batch writer.
    pub fn get_or_init(&self, spec: &ParameterSpec) -> ParameterValue {
        if let Some(value) = self.cache.get(&spec.name) {
            return value.value().clone();
        }
        let mut created = false;
        let value = self
            .cache
            .entry(spec.name.clone())
            .or_insert_with(|| {
                created = true;
                spec.default.clone()
            })
            .value()
            .clone();
        if created {
            self.store.record_parameter_default(&spec.name, &value);
        }
        value
    }

    /// The only way a value changes: the proposal's new value, its history
    /// row stamped `at`, and the proposal row persist in one transaction,
    /// then the cache is updated.
    pub fn apply_proposal(
        &self,
        proposal: &OptimizationProposal,
        at: DateTime<Utc>,
    ) -> WardenResult<ParameterChange> {
        let change = self.change_for(
            &proposal.parameter,
            proposal.new_value.clone(),
            &proposal.rationale,
            proposal.confidence,
            at,
        )?;
        self.store.apply_proposal(&change, proposal)?;
        self.cache.insert(change.name.clone(), change.new_value.clone());
        Ok(change)
    }

    /// Restore `rollback.restored_value` and append the rollback row.
    pub fn rollback(
        &self,
        rollback: &RollbackRecord,
        proposal: &OptimizationProposal,
        reason: &str,
    ) -> WardenResult<i64> {
        let change = self.change_for(
            &rollback.parameter,
            rollback.restored_value.clone(),
            reason,
            proposal.confidence,
            rollback.timestamp,
        )?;
        let id = self.store.record_rollback(&change, rollback, proposal)?;
        self.cache.insert(change.name.clone(), change.new_value.clone());
        Ok(id)
    }

    fn change_for(
        &self,
        name: &str,
        value: ParameterValue,
        reason: &str,
        confidence: f64,
        at: DateTime<Utc>,
    ) -> WardenResult<ParameterChange> {
        let old_value = self.get(name);
        if let Some(old) = &old_value {
            if old.kind() != value.kind() {
                return Err(WardenError::ParameterTypeMismatch {
                    name: name.to_string(),
                    expected: old.kind().to_string(),
                });
            }
        }
        Ok(ParameterChange {
            name: name.to_string(),
            old_value,
            new_value: value,
            reason: reason.to_string(),
            confidence,
            timestamp: at,
        })
    }

    /// Point-in-time copy of the whole map.
    pub fn snapshot(&self) -> BTreeMap<String, ParameterValue> {
        self.cache
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn store(&self) -> &Arc<LearningStore> {
        &self.store
    }
}
