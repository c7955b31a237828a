//! LearningStore: executions, metrics, pattern counters, proposals, rollbacks
//! and retention, through the batch writer and the read paths.

use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};

use test_fixtures::records::{execution, with_latencies};
use warden_core::config::StorageConfig;
use warden_core::models::{
    ExecutionStatus, MetricsScope, OptimizationKind, OptimizationProposal, Outcome,
    ParameterChange, ParameterValue, PatternDelta, PatternKey, ProposalState, RollbackRecord,
    StatsSnapshot,
};
use warden_storage::LearningStore;

fn store() -> LearningStore {
    LearningStore::open_in_memory(&StorageConfig::default()).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// Executions
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn recent_executions_are_newest_first_and_limited() {
    let store = store();
    for record in with_latencies("lint", &[10.0, 20.0, 30.0, 40.0]) {
        store.record_execution(record);
    }
    store.record_execution(execution("other").build());
    store.flush().unwrap();

    let recent = store.recent_executions("lint", 3).unwrap();
    let latencies: Vec<f64> = recent.iter().map(|r| r.latency_ms).collect();
    assert_eq!(latencies, vec![40.0, 30.0, 20.0]);
    assert_eq!(store.execution_count().unwrap(), 5);
}

#[test]
fn execution_fields_survive_persistence() {
    let store = store();
    let record = execution("secrets")
        .action_id("a-42")
        .outcome(Outcome::Block)
        .latency_ms(12.25)
        .pattern(PatternKey::regex("aws-key"))
        .build();
    store.record_execution(record.clone());
    store.record_execution(execution("slow").action_id("a-42").timed_out().build());
    store.flush().unwrap();

    let rows = store.executions_for_action("a-42").unwrap();
    assert_eq!(rows.len(), 2);
    let secrets = rows.iter().find(|r| r.rule == "secrets").unwrap();
    assert_eq!(secrets.outcome, Outcome::Block);
    assert_eq!(secrets.latency_ms, 12.25);
    assert_eq!(secrets.pattern, Some(PatternKey::regex("aws-key")));
    assert_eq!(
        secrets.timestamp.timestamp_millis(),
        record.timestamp.timestamp_millis()
    );
    let slow = rows.iter().find(|r| r.rule == "slow").unwrap();
    assert_eq!(slow.status, ExecutionStatus::TimedOut);
}

#[test]
fn system_metrics_count_outcomes_and_failures() {
    let store = store();
    store.record_execution(execution("a").latency_ms(10.0).build());
    store.record_execution(execution("a").outcome(Outcome::Warn).latency_ms(20.0).build());
    store.record_execution(execution("b").outcome(Outcome::Block).latency_ms(30.0).build());
    store.record_execution(execution("b").failed("boom").latency_ms(40.0).build());
    store.record_execution(execution("b").timed_out().latency_ms(50.0).build());
    store.record_execution(
        execution("a")
            .ago(ChronoDuration::hours(2))
            .latency_ms(1000.0)
            .build(),
    );
    store.flush().unwrap();

    let metrics = store.system_metrics(Duration::from_secs(3600)).unwrap();
    assert_eq!(metrics.total, 5);
    assert_eq!(metrics.allowed, 2);
    assert_eq!(metrics.warned, 1);
    assert_eq!(metrics.blocked, 1);
    assert_eq!(metrics.errored, 1);
    assert_eq!(metrics.timed_out, 1);
    assert!((metrics.mean_latency_ms - 30.0).abs() < 1e-9);
    assert_eq!(metrics.success_rate(), Some(0.6));

    let since = Utc::now() - ChronoDuration::hours(1);
    let rule_b = store.scope_metrics(&MetricsScope::Rule("b".into()), since).unwrap();
    assert_eq!(rule_b.total, 3);
    assert!((rule_b.error_rate() - 1.0 / 3.0).abs() < 1e-9);
}

#[test]
fn empty_window_has_no_success_rate() {
    let store = store();
    let metrics = store.system_metrics(Duration::from_secs(60)).unwrap();
    assert_eq!(metrics.total, 0);
    assert_eq!(metrics.success_rate(), None);
    assert_eq!(metrics.mean_latency_ms, 0.0);
}

#[test]
fn success_counts_respect_half_open_interval() {
    let store = store();
    let now = Utc::now();
    store.record_execution(execution("r").at(now - ChronoDuration::seconds(30)).build());
    store.record_execution(
        execution("r")
            .failed("x")
            .at(now - ChronoDuration::seconds(20))
            .build(),
    );
    store.record_execution(execution("r").at(now).build());
    store.flush().unwrap();

    let scope = MetricsScope::Rule("r".into());
    let (total, ok) = store
        .success_counts(&scope, now - ChronoDuration::minutes(1), now)
        .unwrap();
    assert_eq!((total, ok), (2, 1));
}

// ═══════════════════════════════════════════════════════════════════════════
// Pattern statistics
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn pattern_deltas_accumulate_incrementally() {
    let store = store();
    let key = PatternKey::regex("todo");
    for _ in 0..2 {
        store.record_pattern_outcome("style", &key, PatternDelta::true_positive());
    }
    store.record_pattern_outcome(
        "style",
        &key,
        PatternDelta {
            false_positives: 30,
            true_negatives: 5,
            ..PatternDelta::default()
        },
    );
    store.record_pattern_outcome("style", &key, PatternDelta::default());
    store.flush().unwrap();

    let effectiveness = store.pattern_effectiveness("style").unwrap();
    assert_eq!(effectiveness.len(), 1);
    let entry = &effectiveness[0];
    assert_eq!(entry.stat.true_positives, 2);
    assert_eq!(entry.stat.false_positives, 30);
    assert_eq!(entry.stat.true_negatives, 5);
    assert_eq!(entry.stat.false_negatives, 0);
    assert_eq!(entry.metrics.sample_size, 37);
    assert!((entry.metrics.precision - 0.0625).abs() < 1e-9);
    assert!((entry.metrics.false_positive_rate - 30.0 / 35.0).abs() < 1e-9);

    let single = store.pattern_effectiveness_for("style", &key).unwrap().unwrap();
    assert_eq!(single.stat, entry.stat);
    assert!(store
        .pattern_effectiveness_for("style", &PatternKey::keyword("none"))
        .unwrap()
        .is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// Proposals and rollbacks
// ═══════════════════════════════════════════════════════════════════════════

fn timeout_proposal() -> OptimizationProposal {
    OptimizationProposal::new(
        "lint.timeout_ms",
        OptimizationKind::Timeout,
        ParameterValue::Numeric(300.0),
        ParameterValue::Numeric(360.0),
        0.8,
        "p95 above current timeout",
        StatsSnapshot::SuccessRate {
            baseline: 0.9,
            current: 0.9,
            samples: 100,
        },
        MetricsScope::Rule("lint".into()),
    )
}

#[test]
fn proposals_persist_their_state_machine() {
    let store = store();
    let mut proposal = timeout_proposal();
    store.save_proposal(&proposal).unwrap();

    proposal.transition(ProposalState::Applied, Utc::now()).unwrap();
    proposal.transition(ProposalState::Monitoring, Utc::now()).unwrap();
    proposal.baseline_success_rate = Some(0.9);
    store.save_proposal(&proposal).unwrap();

    let loaded = store.proposal(&proposal.id).unwrap().unwrap();
    assert_eq!(loaded.state, ProposalState::Monitoring);
    assert_eq!(loaded.new_value, ParameterValue::Numeric(360.0));
    assert_eq!(loaded.baseline_success_rate, Some(0.9));
    assert_eq!(loaded.scope, MetricsScope::Rule("lint".into()));
    assert!(loaded.applied_at.is_some());

    let monitoring = store.proposals(Some(ProposalState::Monitoring), 10).unwrap();
    assert_eq!(monitoring.len(), 1);
    assert!(store
        .proposals(Some(ProposalState::Accepted), 10)
        .unwrap()
        .is_empty());
}

#[test]
fn rollback_restores_value_and_appends_one_record() {
    let store = store();
    let mut proposal = timeout_proposal();
    proposal.transition(ProposalState::Applied, Utc::now()).unwrap();
    let applied = ParameterChange {
        name: proposal.parameter.clone(),
        old_value: Some(proposal.old_value.clone()),
        new_value: proposal.new_value.clone(),
        reason: proposal.rationale.clone(),
        confidence: proposal.confidence,
        timestamp: Utc::now(),
    };
    store.apply_proposal(&applied, &proposal).unwrap();
    assert_eq!(
        store.load_parameters().unwrap()["lint.timeout_ms"],
        ParameterValue::Numeric(360.0)
    );

    proposal.transition(ProposalState::Monitoring, Utc::now()).unwrap();
    proposal.transition(ProposalState::RolledBack, Utc::now()).unwrap();
    let restore = ParameterChange {
        name: proposal.parameter.clone(),
        old_value: Some(proposal.new_value.clone()),
        new_value: proposal.old_value.clone(),
        reason: "rollback".into(),
        confidence: proposal.confidence,
        timestamp: Utc::now(),
    };
    let rollback = RollbackRecord {
        id: 0,
        proposal_id: proposal.id.clone(),
        parameter: proposal.parameter.clone(),
        restored_value: proposal.old_value.clone(),
        abandoned_value: proposal.new_value.clone(),
        baseline_success_rate: 0.9,
        observed_success_rate: 0.7,
        degradation: 0.2,
        timestamp: Utc::now(),
    };
    let id = store.record_rollback(&restore, &rollback, &proposal).unwrap();
    assert!(id > 0);

    assert_eq!(
        store.load_parameters().unwrap()["lint.timeout_ms"],
        ParameterValue::Numeric(300.0)
    );
    let rollbacks = store.rollbacks(Some("lint.timeout_ms")).unwrap();
    assert_eq!(rollbacks.len(), 1);
    assert_eq!(rollbacks[0].restored_value, ParameterValue::Numeric(300.0));
    assert!((rollbacks[0].degradation - 0.2).abs() < 1e-9);
    assert_eq!(
        store.proposal(&proposal.id).unwrap().unwrap().state,
        ProposalState::RolledBack
    );
    assert_eq!(store.parameter_history("lint.timeout_ms", 10).unwrap().len(), 2);
}

// ═══════════════════════════════════════════════════════════════════════════
// Retention
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn purge_removes_only_old_executions() {
    let store = store();
    store.record_execution(execution("r").ago(ChronoDuration::days(40)).build());
    store.record_execution(execution("r").ago(ChronoDuration::days(31)).build());
    store.record_execution(execution("r").ago(ChronoDuration::days(1)).build());
    store.record_pattern_outcome("r", &PatternKey::keyword("k"), PatternDelta::true_positive());
    store.flush().unwrap();

    let report = store.purge(30).unwrap();
    assert_eq!(report.total_deleted, 2);
    assert_eq!(report.per_table[0].table, "executions");
    assert_eq!(store.execution_count().unwrap(), 1);
    assert_eq!(store.pattern_effectiveness("r").unwrap().len(), 1);

    let again = store.purge(30).unwrap();
    assert_eq!(again.total_deleted, 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// File-backed store
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn file_backed_reads_go_through_the_pool() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warden.db");
    let config = StorageConfig {
        read_pool_size: 2,
        ..StorageConfig::default()
    };
    {
        let store = LearningStore::open_path(&path, &config).unwrap();
        assert_eq!(store.db().read_pool_size(), 2);
        assert!(store.db().is_wal().unwrap());
        for record in with_latencies("lint", &[5.0, 6.0, 7.0]) {
            store.record_execution(record);
        }
        store.flush().unwrap();
        assert_eq!(store.recent_executions("lint", 10).unwrap().len(), 3);
        store.shutdown().unwrap();

        // Shutdown folds the WAL into the main file.
        let wal = path.with_extension("db-wal");
        assert!(!wal.exists() || std::fs::metadata(&wal).unwrap().len() == 0);
    }

    let reopened = LearningStore::open_path(&path, &config).unwrap();
    assert_eq!(reopened.execution_count().unwrap(), 3);
}

#[test]
fn concurrent_readers_share_the_pool() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig {
        read_pool_size: 2,
        ..StorageConfig::default()
    };
    let store = std::sync::Arc::new(
        LearningStore::open_path(&dir.path().join("warden.db"), &config).unwrap(),
    );
    for record in with_latencies("lint", &[5.0, 6.0, 7.0]) {
        store.record_execution(record);
    }
    store.flush().unwrap();

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let store = std::sync::Arc::clone(&store);
            std::thread::spawn(move || {
                (0..20)
                    .map(|_| store.recent_executions("lint", 10).unwrap().len())
                    .sum::<usize>()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 60);
    }
    store.shutdown().unwrap();
}
