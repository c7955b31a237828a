//! Parameter resolution through the tuner, background loops, and restart
//! behaviour on a file-backed store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use test_fixtures::proposals::accepted_change;
use warden_core::config::{AbTestConfig, EngineConfig, StorageConfig, TunerConfig};
use warden_core::models::{AbArm, ParameterSpec, ParameterValue, RuleDescriptor};
use warden_core::traits::IParameterProvider;
use warden_storage::{LearningStore, ParameterStore};
use warden_tuning::scheduler::spawn_periodic;
use warden_tuning::{AbTestManager, Tuner, TunedParameters};

fn in_memory() -> (Arc<ParameterStore>, Arc<AbTestManager>) {
    let store = Arc::new(LearningStore::open_in_memory(&StorageConfig::default()).unwrap());
    (
        Arc::new(ParameterStore::hydrate(store).unwrap()),
        Arc::new(AbTestManager::new(AbTestConfig::default())),
    )
}

#[test]
fn resolve_returns_the_live_value_outside_tests() {
    let (params, ab_tests) = in_memory();
    let provider = TunedParameters::new(Arc::clone(&params), ab_tests);

    let resolved = provider.resolve(&ParameterSpec::timeout("lint", 250));
    assert_eq!(resolved.name, "lint.timeout_ms");
    assert_eq!(resolved.value, ParameterValue::Numeric(250.0));
    assert_eq!(resolved.arm, None);
    // First use created the parameter.
    assert_eq!(params.get("lint.timeout_ms"), Some(ParameterValue::Numeric(250.0)));
}

#[test]
fn resolve_draws_arms_and_observe_counts_them() {
    let (params, ab_tests) = in_memory();
    ab_tests
        .start(
            "lint.timeout_ms",
            ParameterValue::Numeric(250.0),
            ParameterValue::Numeric(400.0),
            None,
            Some(0.5),
            Utc::now(),
        )
        .unwrap();
    let provider = TunedParameters::new(params, Arc::clone(&ab_tests));
    let spec = ParameterSpec::timeout("lint", 250);

    let mut variants = 0;
    for _ in 0..400 {
        let resolved = provider.resolve(&spec);
        match resolved.arm {
            Some(AbArm::Variant) => {
                variants += 1;
                assert_eq!(resolved.value, ParameterValue::Numeric(400.0));
            }
            Some(AbArm::Control) => assert_eq!(resolved.value, ParameterValue::Numeric(250.0)),
            None => panic!("no arm drawn during a running test"),
        }
        provider.observe(&resolved, true, Duration::from_millis(3));
    }
    assert!(variants > 100 && variants < 300, "variant share {variants}/400");

    let status = ab_tests.status("lint.timeout_ms").unwrap();
    assert_eq!(status.variant.executions, variants);
    assert_eq!(status.control.executions + status.variant.executions, 400);
    assert_eq!(status.control.successes, status.control.executions);
}

#[tokio::test]
async fn periodic_loop_runs_until_shutdown() {
    let runs = Arc::new(AtomicUsize::new(0));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let counter = Arc::clone(&runs);
    let handle = spawn_periodic("test", Duration::from_millis(20), shutdown_rx, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    tokio::time::sleep(Duration::from_millis(150)).await;
    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("loop stops on shutdown")
        .unwrap();

    let seen = runs.load(Ordering::SeqCst);
    assert!(seen >= 2, "ran {seen} times");
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(runs.load(Ordering::SeqCst), seen);
}

#[tokio::test]
async fn periodic_loop_stops_when_the_sender_is_dropped() {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = spawn_periodic("test", Duration::from_secs(3_600), shutdown_rx, || {});
    drop(shutdown_tx);
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("loop stops when the sender goes away")
        .unwrap();
}

#[test]
fn cooldowns_and_values_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warden.db");
    let config = StorageConfig::default();

    {
        let store = Arc::new(LearningStore::open_path(&path, &config).unwrap());
        let params = ParameterStore::hydrate(Arc::clone(&store)).unwrap();
        let proposal = accepted_change(
            "lint.timeout_ms",
            ParameterValue::Numeric(300.0),
            ParameterValue::Numeric(420.0),
            Utc::now(),
        );
        params.apply_proposal(&proposal, Utc::now()).unwrap();
        store.shutdown().unwrap();
    }

    let store = Arc::new(LearningStore::open_path(&path, &config).unwrap());
    let params = Arc::new(ParameterStore::hydrate(Arc::clone(&store)).unwrap());
    assert_eq!(params.get("lint.timeout_ms"), Some(ParameterValue::Numeric(420.0)));

    let tuner = Tuner::new(
        store,
        params,
        Arc::new(AbTestManager::new(AbTestConfig::default())),
        vec![RuleDescriptor::new("lint", "file_write")],
        EngineConfig::default(),
        TunerConfig::default(),
    )
    .unwrap();
    assert!(!tuner.can_optimize("lint.timeout_ms"));
}
