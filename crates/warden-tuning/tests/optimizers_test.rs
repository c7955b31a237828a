//! The pure tuning algorithms: latency statistics, timeout steps, pattern
//! refinement, strictness, cooldowns, monitoring verdicts and A/B winners.

use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use proptest::prelude::*;

use test_fixtures::records::{execution, uniform_latencies};
use test_fixtures::scenarios::{ab_scenarios, pattern_scenarios};
use warden_core::config::{AbTestConfig, TunerConfig};
use warden_core::errors::WardenError;
use warden_core::models::{
    AbArm, ArmSummary, MetricsScope, OptimizationKind, OptimizationProposal, ParameterValue,
    ProposalState, StatsSnapshot, StrictnessLevel,
};
use warden_tuning::ab_test::{select_winner, AbTestManager};
use warden_tuning::monitor::{MonitorVerdict, RollbackMonitor};
use warden_tuning::patterns::PatternRefiner;
use warden_tuning::stats::{latency_stats, percentile};
use warden_tuning::strictness::StrictnessController;
use warden_tuning::timeout::TimeoutOptimizer;
use warden_tuning::{CooldownTracker, SkipReason};

// ═══════════════════════════════════════════════════════════════════════════
// Statistics and timeouts
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn uniform_latencies_have_expected_statistics() {
    let stats = latency_stats(&uniform_latencies()).unwrap();
    assert_eq!(stats.sample_size, 100);
    assert!((stats.mean_ms - 199.0).abs() < 1e-9);
    assert!((stats.stddev_ms - 57.732).abs() < 1e-3);
    assert_eq!(stats.p50_ms, 198.0);
    assert_eq!(stats.p95_ms, 288.0);
    assert_eq!(stats.p99_ms, 296.0);
    assert_eq!(stats.min_ms, 100.0);
    assert_eq!(stats.max_ms, 298.0);
}

#[test]
fn percentile_edges() {
    assert_eq!(percentile(&[], 95.0), 0.0);
    assert_eq!(percentile(&[7.0], 1.0), 7.0);
    assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0], 100.0), 4.0);
    assert!(latency_stats(&[]).is_none());
    assert!(latency_stats(&[1.0, f64::NAN]).is_none());
}

#[test]
fn timeout_step_is_capped_at_max_change_rate() {
    let optimizer = TimeoutOptimizer::new(&TunerConfig::default());
    let step = optimizer.propose(300.0, &uniform_latencies()).unwrap();

    // max(288 * 1.2, 199 + 3 * 57.73) = 372.2, but one step moves at most 20%.
    assert!((step.target_ms - 372.196).abs() < 1e-3);
    assert_eq!(step.applied_ms, 360.0);
    assert!(step.confidence > 0.5 && step.confidence <= 0.95);
}

#[test]
fn timeout_below_noise_threshold_is_skipped() {
    let optimizer = TimeoutOptimizer::new(&TunerConfig::default());
    // Target 372.2; current 370 would move by well under 5%.
    match optimizer.propose(370.0, &uniform_latencies()) {
        Err(SkipReason::BelowNoiseThreshold { relative_change }) => {
            assert!(relative_change < 0.05)
        }
        other => panic!("expected noise skip, got {other:?}"),
    }
}

#[test]
fn timeout_needs_fifty_samples() {
    let config = TunerConfig {
        min_timeout_samples: 10,
        ..TunerConfig::default()
    };
    let optimizer = TimeoutOptimizer::new(&config);
    let latencies = vec![100.0; 49];
    assert_eq!(
        optimizer.propose(300.0, &latencies),
        Err(SkipReason::InsufficientSample { have: 49, need: 50 })
    );
}

#[test]
fn failed_evaluations_are_excluded_from_latency_samples() {
    let records = vec![
        execution("lint").latency_ms(200.0).build(),
        execution("lint").latency_ms(1.0).failed("boom").build(),
        execution("lint").latency_ms(500.0).timed_out().build(),
    ];
    assert_eq!(TimeoutOptimizer::samples(&records), vec![200.0, 500.0]);
}

proptest! {
    #[test]
    fn timeout_step_respects_floor_and_rate(
        current in 100.0f64..20_000.0,
        latencies in prop::collection::vec(1.0f64..30_000.0, 50..150),
    ) {
        let config = TunerConfig::default();
        let optimizer = TimeoutOptimizer::new(&config);
        let stats = latency_stats(&latencies).unwrap();
        let target = optimizer.target_ms(&stats);
        let applied = optimizer.bounded_step(current, target);

        prop_assert!(target >= config.timeout_floor_ms);
        prop_assert!(applied >= config.timeout_floor_ms);
        prop_assert!((applied - current).abs() <= config.max_change_rate * current + 1e-9);
    }
}

#[test]
fn a_timeout_under_the_floor_is_lifted_to_it() {
    let config = TunerConfig::default();
    let optimizer = TimeoutOptimizer::new(&config);
    assert_eq!(optimizer.bounded_step(50.0, 400.0), 100.0);
    // The floor wins over the rate bound, even when shrinking toward a low target.
    let lifted = optimizer.bounded_step(40.0, 10.0);
    assert_eq!(lifted, config.timeout_floor_ms);
    assert!(lifted - 40.0 > config.max_change_rate * 40.0);
}

// ═══════════════════════════════════════════════════════════════════════════
// Patterns and strictness
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn pattern_scenarios_refine_as_labelled() {
    let refiner = PatternRefiner::new(&TunerConfig::default());
    for scenario in pattern_scenarios() {
        let metrics = scenario.stat("secrets").metrics();
        let refined = refiner.refine(&metrics).ok();
        assert_eq!(refined, scenario.expected, "scenario {}", scenario.name);
    }
}

#[test]
fn small_pattern_samples_are_skipped() {
    let refiner = PatternRefiner::new(&TunerConfig::default());
    let scenario = pattern_scenarios()
        .into_iter()
        .find(|s| s.name == "too_small")
        .unwrap();
    let metrics = scenario.stat("secrets").metrics();
    assert!(matches!(
        refiner.refine(&metrics),
        Err(SkipReason::InsufficientSample { need: 20, .. })
    ));
}

#[test]
fn strictness_captures_baseline_then_relaxes_on_a_drop() {
    let mut controller = StrictnessController::new(&TunerConfig::default());
    assert_eq!(
        controller.evaluate(StrictnessLevel::Standard, 100, 90),
        Err(SkipReason::NoChange)
    );
    assert_eq!(controller.baseline(), Some(0.9));

    // Within ten points: nothing.
    assert_eq!(
        controller.evaluate(StrictnessLevel::Standard, 100, 85),
        Err(SkipReason::NoChange)
    );

    let step = controller
        .evaluate(StrictnessLevel::Standard, 100, 70)
        .unwrap();
    assert_eq!(step.level, StrictnessLevel::Relaxed);
    assert_eq!(step.baseline, 0.9);
    assert!((step.current - 0.7).abs() < 1e-9);
}

#[test]
fn strictness_tightens_only_with_headroom() {
    let mut controller = StrictnessController::new(&TunerConfig::default());
    controller.reset_baseline(0.6);

    let step = controller
        .evaluate(StrictnessLevel::Standard, 200, 150)
        .unwrap();
    assert_eq!(step.level, StrictnessLevel::Strict);

    // Already at 96% success: no headroom left.
    controller.reset_baseline(0.8);
    assert_eq!(
        controller.evaluate(StrictnessLevel::Standard, 100, 96),
        Err(SkipReason::NoChange)
    );
    // At the top there is nowhere to go.
    controller.reset_baseline(0.6);
    assert_eq!(
        controller.evaluate(StrictnessLevel::Strict, 100, 80),
        Err(SkipReason::NoChange)
    );
}

#[test]
fn strictness_needs_enough_executions() {
    let mut controller = StrictnessController::new(&TunerConfig::default());
    assert_eq!(
        controller.evaluate(StrictnessLevel::Standard, 10, 10),
        Err(SkipReason::InsufficientSample { have: 10, need: 50 })
    );
    assert_eq!(controller.baseline(), None);
}

// ═══════════════════════════════════════════════════════════════════════════
// Cooldowns and monitoring
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn cooldown_blocks_for_exactly_the_period() {
    let cooldowns = CooldownTracker::new(ChronoDuration::seconds(3_600));
    let changed = Utc::now();
    assert!(cooldowns.can_optimize("lint.timeout_ms", changed));

    cooldowns.record("lint.timeout_ms", changed);
    assert!(!cooldowns.can_optimize("lint.timeout_ms", changed));
    assert!(!cooldowns.can_optimize(
        "lint.timeout_ms",
        changed + ChronoDuration::seconds(3_600) - ChronoDuration::milliseconds(1)
    ));
    assert!(cooldowns.can_optimize("lint.timeout_ms", changed + ChronoDuration::seconds(3_600)));
    assert!(cooldowns.can_optimize("other", changed));
}

#[test]
fn cooldown_hydration_keeps_the_latest_change() {
    let cooldowns = CooldownTracker::from_secs(60);
    let now = Utc::now();
    cooldowns.hydrate(vec![
        ("strictness".to_string(), now - ChronoDuration::seconds(30)),
        ("strictness".to_string(), now - ChronoDuration::seconds(300)),
    ]);
    assert_eq!(
        cooldowns.last_change("strictness"),
        Some(now - ChronoDuration::seconds(30))
    );
    let remaining = cooldowns.remaining("strictness", now).unwrap();
    assert_eq!(remaining.num_seconds(), 30);
}

fn monitored(baseline: Option<f64>) -> OptimizationProposal {
    let mut proposal = OptimizationProposal::new(
        "lint.timeout_ms",
        OptimizationKind::Timeout,
        ParameterValue::Numeric(300.0),
        ParameterValue::Numeric(360.0),
        0.8,
        "test",
        StatsSnapshot::SuccessRate {
            baseline: 1.0,
            current: 1.0,
            samples: 100,
        },
        MetricsScope::Rule("lint".to_string()),
    );
    proposal.baseline_success_rate = baseline;
    let now = Utc::now();
    proposal.transition(ProposalState::Applied, now).unwrap();
    proposal.transition(ProposalState::Monitoring, now).unwrap();
    proposal
}

#[test]
fn monitor_rolls_back_on_degradation_with_enough_samples() {
    let monitor = RollbackMonitor::new(&TunerConfig::default());
    let proposal = monitored(Some(0.95));
    let now = proposal.applied_at.unwrap() + ChronoDuration::minutes(1);

    // 0.95 -> 0.80 but only ten executions: keep watching.
    assert_eq!(monitor.check(&proposal, 10, 8, now), MonitorVerdict::Pending);

    match monitor.check(&proposal, 100, 80, now) {
        MonitorVerdict::Rollback {
            baseline,
            observed,
            degradation,
        } => {
            assert_eq!(baseline, 0.95);
            assert_eq!(observed, 0.8);
            assert!((degradation - 0.15).abs() < 1e-9);
        }
        other => panic!("expected rollback, got {other:?}"),
    }
}

#[test]
fn monitor_accepts_when_the_window_closes() {
    let monitor = RollbackMonitor::new(&TunerConfig::default());
    let proposal = monitored(Some(0.95));
    let applied = proposal.applied_at.unwrap();

    // A small dip below the threshold does not revert.
    assert_eq!(
        monitor.check(&proposal, 100, 93, applied + ChronoDuration::minutes(5)),
        MonitorVerdict::Pending
    );
    assert_eq!(
        monitor.check(&proposal, 100, 93, applied + monitor.window()),
        MonitorVerdict::Accept {
            observed: Some(0.93)
        }
    );

    let without_baseline = monitored(None);
    assert_eq!(
        monitor.check(
            &without_baseline,
            100,
            10,
            without_baseline.applied_at.unwrap() + monitor.window()
        ),
        MonitorVerdict::Accept {
            observed: Some(0.1)
        }
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// A/B tests
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn ab_scenarios_pick_the_labelled_winner() {
    let config = AbTestConfig::default();
    for scenario in ab_scenarios() {
        let (winner, reason) = select_winner(
            &scenario.control.summary(),
            &scenario.variant.summary(),
            &config,
        );
        assert_eq!(winner, scenario.expected_winner, "{}: {reason}", scenario.name);
    }
}

#[test]
fn variant_without_executions_never_wins() {
    let control = ArmSummary {
        executions: 10,
        successes: 1,
        total_latency_ms: 1_000.0,
    };
    let (winner, _) = select_winner(&control, &ArmSummary::default(), &AbTestConfig::default());
    assert_eq!(winner, AbArm::Control);
}

#[test]
fn ab_manager_assigns_by_sample_ratio() {
    let manager = AbTestManager::new(AbTestConfig::default());
    assert!(manager.assign("lint.timeout_ms").is_none());

    manager
        .start(
            "lint.timeout_ms",
            ParameterValue::Numeric(300.0),
            ParameterValue::Numeric(450.0),
            None,
            Some(0.25),
            Utc::now(),
        )
        .unwrap();
    assert_eq!(
        manager.assign_with("lint.timeout_ms", 0.1),
        Some((ParameterValue::Numeric(450.0), AbArm::Variant))
    );
    assert_eq!(
        manager.assign_with("lint.timeout_ms", 0.25),
        Some((ParameterValue::Numeric(300.0), AbArm::Control))
    );
    assert!(manager.assign_with("other", 0.0).is_none());
}

#[test]
fn ab_manager_bounds_test_duration() {
    let manager = AbTestManager::new(AbTestConfig::default());
    let start = |duration: u64| {
        manager.start(
            "lint.timeout_ms",
            ParameterValue::Numeric(300.0),
            ParameterValue::Numeric(400.0),
            Some(duration),
            None,
            Utc::now(),
        )
    };
    assert!(matches!(start(u64::MAX), Err(WardenError::ValidationError(_))));
    assert!(matches!(start(i64::MAX as u64), Err(WardenError::ValidationError(_))));
    assert!(manager.statuses().is_empty());

    start(warden_core::constants::MAX_WINDOW_SECS).unwrap();
    assert!(!manager.ready("lint.timeout_ms", Utc::now()));
}

#[test]
fn huge_periods_saturate_instead_of_overflowing() {
    let cooldowns = CooldownTracker::from_secs(u64::MAX);
    let now = Utc::now();
    cooldowns.record("lint.timeout_ms", now);
    assert!(!cooldowns.can_optimize("lint.timeout_ms", now + ChronoDuration::days(36_500)));
    assert!(cooldowns.remaining("lint.timeout_ms", now).is_some());

    let monitor = RollbackMonitor::new(&TunerConfig {
        monitor_window_secs: u64::MAX,
        ..TunerConfig::default()
    });
    assert!(monitor.window() > ChronoDuration::days(36_500));
}

#[test]
fn ab_manager_rejects_bad_starts() {
    let manager = AbTestManager::new(AbTestConfig::default());
    let start = |variant: ParameterValue, ratio: Option<f64>| {
        manager.start(
            "strictness",
            ParameterValue::from(StrictnessLevel::Standard),
            variant,
            Some(60),
            ratio,
            Utc::now(),
        )
    };

    assert!(matches!(
        start(ParameterValue::Numeric(1.0), None),
        Err(WardenError::ParameterTypeMismatch { .. })
    ));
    assert!(matches!(
        start(ParameterValue::from(StrictnessLevel::Strict), Some(1.0)),
        Err(WardenError::ValidationError(_))
    ));
    assert!(matches!(
        start(ParameterValue::from(StrictnessLevel::Standard), None),
        Err(WardenError::ValidationError(_))
    ));

    start(ParameterValue::from(StrictnessLevel::Strict), None).unwrap();
    assert!(matches!(
        start(ParameterValue::from(StrictnessLevel::Relaxed), None),
        Err(WardenError::AbTestAlreadyActive { parameter }) if parameter == "strictness"
    ));
}

#[test]
fn ab_test_concludes_once_both_arms_are_sampled() {
    let config = AbTestConfig {
        min_samples_per_arm: 100,
        ..AbTestConfig::default()
    };
    let manager = AbTestManager::new(config);
    let started = Utc::now();
    manager
        .start(
            "lint.timeout_ms",
            ParameterValue::Numeric(300.0),
            ParameterValue::Numeric(450.0),
            Some(86_400),
            None,
            started,
        )
        .unwrap();

    for i in 0..100 {
        manager.record("lint.timeout_ms", AbArm::Control, i < 80, Duration::from_millis(200));
        manager.record("lint.timeout_ms", AbArm::Variant, i < 87, Duration::from_millis(200));
    }
    let status = manager.status("lint.timeout_ms").unwrap();
    assert_eq!(status.control.successes, 80);
    assert_eq!(status.variant.executions, 100);
    assert!((status.variant.mean_latency_ms() - 200.0).abs() < 1e-9);

    let outcome = manager.conclude("lint.timeout_ms", started).unwrap();
    assert_eq!(outcome.winner, AbArm::Variant);
    assert!(outcome.confidence > 0.8);
    assert!(!manager.is_active("lint.timeout_ms"));
}

#[test]
fn ab_test_concludes_when_the_duration_elapses() {
    let manager = AbTestManager::new(AbTestConfig::default());
    let started = Utc::now();
    manager
        .start(
            "strictness",
            ParameterValue::from(StrictnessLevel::Standard),
            ParameterValue::from(StrictnessLevel::Strict),
            Some(60),
            None,
            started,
        )
        .unwrap();

    assert!(!manager.ready("strictness", started + ChronoDuration::seconds(59)));
    assert!(manager
        .conclude("strictness", started + ChronoDuration::seconds(59))
        .is_none());
    assert!(manager.ready("strictness", started + ChronoDuration::seconds(60)));

    let outcome = manager
        .conclude("strictness", started + ChronoDuration::seconds(60))
        .unwrap();
    assert_eq!(outcome.winner, AbArm::Control);
}

#[test]
fn stopping_a_test_returns_its_counters() {
    let manager = AbTestManager::new(AbTestConfig::default());
    manager
        .start(
            "lint.timeout_ms",
            ParameterValue::Numeric(300.0),
            ParameterValue::Numeric(200.0),
            None,
            None,
            Utc::now(),
        )
        .unwrap();
    manager.record("lint.timeout_ms", AbArm::Variant, true, Duration::from_millis(5));

    let status = manager.stop("lint.timeout_ms").unwrap();
    assert_eq!(status.variant.executions, 1);
    assert!(manager.statuses().is_empty());
    assert!(matches!(
        manager.stop("lint.timeout_ms"),
        Err(WardenError::AbTestNotFound { .. })
    ));
}
