use test_fixtures::records;
use test_fixtures::scenarios::{ab_scenarios, pattern_scenarios};
use warden_core::models::{AbArm, ExecutionStatus, Sensitivity};

#[test]
fn scenario_files_exist_and_parse() {
    assert!(test_fixtures::fixture_exists("scenarios/pattern_stats.json"));
    assert!(test_fixtures::fixture_exists("scenarios/ab_tests.json"));

    let patterns = pattern_scenarios();
    assert_eq!(patterns.len(), 4);
    assert_eq!(patterns[0].expected, Some(Sensitivity::Reduced));
    assert_eq!(patterns[0].stat("r").total(), 37);

    let ab = ab_scenarios();
    assert_eq!(ab[0].expected_winner, AbArm::Variant);
    assert!((ab[1].variant.summary().mean_latency_ms() - 120.0).abs() < 1e-9);
}

#[test]
fn uniform_latencies_span_100_to_298() {
    let latencies = records::uniform_latencies();
    assert_eq!(latencies.len(), 100);
    assert_eq!(latencies[0], 100.0);
    assert_eq!(latencies[99], 298.0);
}

#[test]
fn success_rate_builder_mixes_completed_and_failed() {
    let built = records::with_success_rate("r", 10, 7);
    let completed = built
        .iter()
        .filter(|r| r.status == ExecutionStatus::Completed)
        .count();
    assert_eq!(completed, 7);
    assert!(built.iter().skip(7).all(|r| r.error.is_some()));
}
