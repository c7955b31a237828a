use chrono::Utc;
use proptest::prelude::*;

use warden_core::models::*;

fn verdict_strategy() -> impl Strategy<Value = Verdict> {
    prop_oneof![
        Just(Verdict::Allow),
        Just(Verdict::Warn),
        Just(Verdict::Block),
    ]
}

proptest! {
    #[test]
    fn any_block_makes_the_decision_block(verdicts in prop::collection::vec(verdict_strategy(), 0..32)) {
        let decision = Decision::aggregate("a", verdicts.iter().map(|v| (*v, None)));
        let expected = verdicts.iter().copied().max().unwrap_or(Verdict::Allow);
        prop_assert_eq!(decision.outcome, expected);
        prop_assert_eq!(decision.is_blocked(), verdicts.contains(&Verdict::Block));
    }
}

#[test]
fn aggregate_keeps_message_order() {
    let decision = Decision::aggregate(
        "a1",
        [
            (Verdict::Warn, Some("first")),
            (Verdict::Allow, None),
            (Verdict::Block, Some("second")),
        ],
    );
    assert_eq!(decision.outcome, Verdict::Block);
    assert_eq!(decision.messages, vec!["first", "second"]);
}

#[test]
fn empty_aggregate_allows() {
    let decision = Decision::aggregate("a1", std::iter::empty::<(Verdict, Option<&str>)>());
    assert_eq!(decision, Decision::allow("a1"));
}

#[test]
fn error_outcome_fails_open() {
    assert_eq!(Outcome::Error.verdict(), Verdict::Allow);
    assert_eq!(Outcome::from(Verdict::Block), Outcome::Block);
}

#[test]
fn context_hash_ignores_id_and_metadata() {
    let a = Action::new("file.write", "src/main.rs", "fn main() {}");
    let b = Action::new("file.write", "src/main.rs", "fn main() {}").with_metadata("user", "x");
    let c = Action::new("file.write", "src/lib.rs", "fn main() {}");
    assert_ne!(a.id, b.id);
    assert_eq!(a.context_hash(), b.context_hash());
    assert_ne!(a.context_hash(), c.context_hash());
}

#[test]
fn context_hash_separates_fields() {
    let a = Action::new("ab", "c", "");
    let b = Action::new("a", "bc", "");
    assert_ne!(a.context_hash(), b.context_hash());
}

#[test]
fn rule_descriptor_wildcard_matches_every_category() {
    let any = RuleDescriptor::new("audit", WILDCARD_CATEGORY);
    let files = RuleDescriptor::new("secrets", "file.write");
    assert!(any.applies_to("shell.exec"));
    assert!(files.applies_to("file.write"));
    assert!(!files.applies_to("shell.exec"));
}

#[test]
fn pattern_key_parses_its_display_form() {
    let key = PatternKey::regex("aws-key");
    assert_eq!(key.to_string(), "regex:aws-key");
    assert_eq!("regex:aws-key".parse::<PatternKey>().unwrap(), key);
    assert!("aws-key".parse::<PatternKey>().is_err());
    assert!("regex:".parse::<PatternKey>().is_err());
    assert!("glob:x".parse::<PatternKey>().is_err());
}

fn stat(tp: u64, fp: u64, tn: u64, fneg: u64) -> PatternStat {
    PatternStat {
        rule: "secrets".into(),
        pattern: PatternKey::regex("aws-key"),
        true_positives: tp,
        false_positives: fp,
        true_negatives: tn,
        false_negatives: fneg,
        updated_at: Utc::now(),
    }
}

#[test]
fn pattern_metrics_for_a_noisy_pattern() {
    let m = stat(2, 30, 5, 0).metrics();
    assert_eq!(m.sample_size, 37);
    assert!((m.precision - 0.0625).abs() < 1e-12);
    assert_eq!(m.recall, 1.0);
    assert!((m.false_positive_rate - 30.0 / 35.0).abs() < 1e-12);
    assert_eq!(m.false_negative_rate, 0.0);
    assert!(m.confidence >= 0.5 && m.confidence <= 0.95);
}

#[test]
fn pattern_metrics_with_no_samples_are_zero() {
    let m = stat(0, 0, 0, 0).metrics();
    assert_eq!(m.precision, 0.0);
    assert_eq!(m.recall, 0.0);
    assert_eq!(m.f1, 0.0);
    assert_eq!(m.false_positive_rate, 0.0);
    assert_eq!(m.false_negative_rate, 0.0);
}

#[test]
fn sample_confidence_steps_and_cap() {
    assert_eq!(sample_confidence(10, 0.0), 0.5);
    assert!((sample_confidence(50, 0.0) - 0.6).abs() < 1e-12);
    assert!((sample_confidence(100, 0.0) - 0.7).abs() < 1e-12);
    assert!((sample_confidence(500, 0.0) - 0.8).abs() < 1e-12);
    assert_eq!(sample_confidence(10_000, 1.0), 0.95);
    assert_eq!(sample_confidence(10, f64::NAN), 0.5);
}

#[test]
fn ab_confidence_rewards_balanced_arms() {
    let balanced = ab_test_confidence(100, 100);
    let lopsided = ab_test_confidence(190, 10);
    assert!(balanced > lopsided);
    assert!(balanced <= 0.95);
}

#[test]
fn numeric_parameter_encoding_is_exact() {
    for v in [0.1, 1.0 / 3.0, 360.0, 1e-9, 123_456.789] {
        let value = ParameterValue::Numeric(v);
        let back = ParameterValue::decode(value.kind(), &value.encode()).unwrap();
        assert_eq!(back.as_f64().unwrap().to_bits(), v.to_bits());
    }
    assert!(ParameterValue::decode("numeric", "abc").is_err());
    assert!(ParameterValue::decode("blob", "x").is_err());
}

#[test]
fn strictness_levels_step_within_bounds() {
    assert_eq!(StrictnessLevel::Standard.relax(), Some(StrictnessLevel::Relaxed));
    assert_eq!(StrictnessLevel::Permissive.relax(), None);
    assert_eq!(StrictnessLevel::Strict.tighten(), None);
    assert!(StrictnessLevel::Strict > StrictnessLevel::Permissive);
}

#[test]
fn rule_parameters_resolve_typed_views() {
    let mut params = RuleParameters::new();
    params.insert("secrets.timeout_ms", ParameterValue::Numeric(250.0));
    params.insert("strictness", StrictnessLevel::Strict.into());
    let key = PatternKey::regex("aws-key");
    params.insert(
        "secrets.pattern.regex:aws-key.sensitivity",
        Sensitivity::Reduced.into(),
    );

    assert_eq!(
        params.timeout("secrets"),
        Some(std::time::Duration::from_millis(250))
    );
    assert_eq!(params.strictness(), StrictnessLevel::Strict);
    assert_eq!(params.sensitivity("secrets", &key), Sensitivity::Reduced);
    assert_eq!(
        params.sensitivity("secrets", &PatternKey::keyword("other")),
        Sensitivity::Normal
    );
    assert_eq!(params.timeout("unknown"), None);
}

fn proposal() -> OptimizationProposal {
    OptimizationProposal::new(
        "secrets.timeout_ms",
        OptimizationKind::Timeout,
        ParameterValue::Numeric(300.0),
        ParameterValue::Numeric(360.0),
        0.7,
        "p95 grew",
        StatsSnapshot::SuccessRate {
            baseline: 0.9,
            current: 0.9,
            samples: 100,
        },
        MetricsScope::Rule("secrets".into()),
    )
}

#[test]
fn proposal_follows_its_lifecycle() {
    let mut p = proposal();
    let now = Utc::now();
    p.transition(ProposalState::Applied, now).unwrap();
    assert_eq!(p.applied_at, Some(now));
    p.transition(ProposalState::Monitoring, now).unwrap();
    p.transition(ProposalState::RolledBack, now).unwrap();
    assert!(p.state.is_terminal());
    assert_eq!(p.resolved_at, Some(now));
}

#[test]
fn proposal_rejects_skipped_states() {
    let mut p = proposal();
    assert!(p.transition(ProposalState::Monitoring, Utc::now()).is_err());
    assert_eq!(p.state, ProposalState::Proposed);
    p.transition(ProposalState::Applied, Utc::now()).unwrap();
    assert!(p.transition(ProposalState::Accepted, Utc::now()).is_err());
}

#[test]
fn proposal_state_names_round_trip() {
    for state in [
        ProposalState::Proposed,
        ProposalState::Applied,
        ProposalState::Monitoring,
        ProposalState::Accepted,
        ProposalState::RolledBack,
    ] {
        assert_eq!(state.as_str().parse::<ProposalState>().unwrap(), state);
    }
}

#[test]
fn success_rate_excludes_errors_and_timeouts() {
    let mut m = SystemMetrics::empty(MetricsScope::System, Utc::now());
    assert_eq!(m.success_rate(), None);
    m.total = 10;
    m.errored = 1;
    m.timed_out = 1;
    assert!((m.success_rate().unwrap() - 0.8).abs() < 1e-12);
}
