//! End-to-end batch scoring: exclusions, determinism, ranking.

use venture_core::{
    benchmarks::BenchmarkTables,
    config::{ScopeConfig, TractionScaling},
    error::ScopeError,
    imputation::MissingValuePolicy,
    pipeline::{rank, top_n, ExclusionKind, ScoringPipeline},
    record::EntityRecord,
    stage::Stage,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn company(id: &str, stage: &str, funding: f64, investors: Option<u32>, founded: i32) -> EntityRecord {
    EntityRecord {
        funding_amount: Some(funding),
        stage: Some(stage.to_string()),
        investors_count: investors,
        founded_year: Some(founded),
        status: Some("operating".into()),
        ..EntityRecord::company(id)
    }
}

fn batch() -> Vec<EntityRecord> {
    vec![
        company("alpha", "Seed", 1_500_000.0, Some(3), 2021),
        company("bravo", "Series A", 10_000_000.0, Some(5), 2020),
        company("charlie", "Series B", 30_000_000.0, None, 2017),
        company("delta", "Series C", 80_000_000.0, Some(12), 2014),
        company("echo", "Angel", 400_000.0, Some(1), 2023),
        company("foxtrot", "Series D+", 250_000_000.0, Some(20), 2010),
    ]
}

#[test]
fn every_valid_record_is_scored_in_input_order() {
    init();
    let cfg = ScopeConfig::default_test();
    let pipeline = ScoringPipeline::new(&cfg).expect("pipeline");
    let records = batch();

    let run = pipeline.run(&records).expect("run");

    assert_eq!(run.scored.len(), records.len());
    assert_eq!(run.exclusions.total(), 0);
    assert_eq!(run.investors_imputed, 1, "only charlie lacks an investor count");
    for (scored, source) in run.scored.iter().zip(&records) {
        assert_eq!(scored.entity_id, source.entity_id);
        assert_eq!(scored.run_id, run.run_id);
        assert_eq!(scored.benchmark_version, "stage-benchmarks-v1");
        let k = &scored.kpis;
        assert!((0.0..=100.0).contains(&k.investment_score), "{}: {}", scored.entity_id, k.investment_score);
        assert!((0.0..=100.0).contains(&k.traction_index));
    }
    let charlie = &run.scored[2];
    assert!(charlie.investors_imputed);
    assert_eq!(charlie.investors_count, 0);
    assert_eq!(charlie.kpis.traction_index, 0.0, "lowest raw traction maps to 0");
}

/// Bad records are excluded and counted by kind; the batch carries on.
#[test]
fn invalid_records_are_excluded_not_defaulted() {
    init();
    let cfg = ScopeConfig::default_test();
    let pipeline = ScoringPipeline::new(&cfg).expect("pipeline");

    let mut records = batch();
    records.push(company("grant", "Grant", 100_000.0, Some(1), 2022));
    records.push(company("broke", "Seed", 0.0, Some(2), 2022));
    let mut undated = company("undated", "Seed", 900_000.0, Some(2), 2000);
    undated.founded_year = None;
    records.push(undated);

    let run = pipeline.run(&records).expect("run");

    assert_eq!(run.scored.len(), 6);
    assert_eq!(run.exclusions.total(), 3);
    assert_eq!(run.exclusions.count(ExclusionKind::Validation), 3);
    assert_eq!(run.exclusions.count(ExclusionKind::Configuration), 0);
    let excluded: Vec<&str> = run.exclusions.exclusions.iter().map(|e| e.entity_id.as_str()).collect();
    assert_eq!(excluded, ["grant", "broke", "undated"]);
    assert!(run.scored.iter().all(|s| !excluded.contains(&s.entity_id.as_str())));
}

#[test]
fn identical_validation_failures_group_by_reason() {
    init();
    let cfg = ScopeConfig::default_test();
    let pipeline = ScoringPipeline::new(&cfg).expect("pipeline");
    let records = vec![
        company("a", "Grant", 1e5, Some(1), 2022),
        company("b", "Grant", 2e5, Some(1), 2022),
        company("c", "Seed", 1e6, Some(1), 2022),
    ];

    let run = pipeline.run(&records).expect("run");
    let reasons = run.exclusions.by_reason();
    assert_eq!(reasons.len(), 1);
    assert_eq!(reasons.values().copied().sum::<usize>(), 2);
}

/// A stage missing from the tables excludes its records; if it hits
/// every record, the run fails with the configuration error.
#[test]
fn configuration_gaps_exclude_and_can_fail_the_run() {
    init();
    let mut cfg = ScopeConfig::default_test();
    cfg.benchmarks.stage_weight.remove(&Stage::Angel);
    let pipeline = ScoringPipeline::new(&cfg).expect("other stages still covered");

    let run = pipeline.run(&batch()).expect("partial coverage still runs");
    assert_eq!(run.exclusions.count(ExclusionKind::Configuration), 1);
    assert_eq!(run.scored.len(), 5);

    let angels = vec![
        company("a1", "Angel", 3e5, Some(2), 2022),
        company("a2", "angel", 6e5, Some(1), 2021),
    ];
    match pipeline.run(&angels) {
        Err(ScopeError::Configuration { stage, .. }) => assert_eq!(stage, "Angel"),
        other => panic!("expected a fatal configuration error, got {other:?}"),
    }
}

#[test]
fn malformed_benchmarks_fail_pipeline_construction() {
    init();
    let mut cfg = ScopeConfig::default_test();
    cfg.benchmarks.revenue_multiple.insert(Stage::Seed, -1.0);
    assert!(matches!(
        ScoringPipeline::new(&cfg),
        Err(ScopeError::InvalidBenchmarks { .. })
    ));
}

/// Same run id, same input, same config: identical output, bit for bit.
#[test]
fn runs_are_deterministic() {
    init();
    let cfg = ScopeConfig::default_test();
    let pipeline = ScoringPipeline::new(&cfg).expect("pipeline");
    let records = batch();

    let a = pipeline.run_with_id("det-1".into(), &records).expect("run a");
    let b = pipeline.run_with_id("det-1".into(), &records).expect("run b");

    assert_eq!(a.scored, b.scored);
    let json_a = serde_json::to_string(&a.scored).expect("serialize");
    let json_b = serde_json::to_string(&b.scored).expect("serialize");
    assert_eq!(json_a, json_b);
}

/// Applying the missing-value policy twice changes nothing.
#[test]
fn imputation_is_idempotent() {
    let policy = MissingValuePolicy::default();
    for r in batch() {
        let once = policy.apply(&r);
        let twice = policy.apply(once.record());
        assert_eq!(once.record(), twice.record(), "{}", r.entity_id);
        assert!(!twice.investors_imputed(), "second pass has nothing to fill");
    }
}

#[test]
fn fixed_traction_scaling_makes_records_independent() {
    init();
    let mut cfg = ScopeConfig::default_test();
    cfg.kpi.traction_scaling = TractionScaling::Fixed { min: 0.0, max: 100.0 };
    let pipeline = ScoringPipeline::new(&cfg).expect("pipeline");

    let all = pipeline.run_with_id("r".into(), &batch()).expect("run");
    let alone = pipeline
        .run_with_id("r".into(), &batch()[1..2])
        .expect("run");
    assert_eq!(all.scored[1].kpis, alone.scored[0].kpis);
}

#[test]
fn ranking_is_descending_with_stable_ties() {
    init();
    let cfg = ScopeConfig::default_test();
    let pipeline = ScoringPipeline::new(&cfg).expect("pipeline");
    let mut records = batch();
    // Same inputs, different ids: guaranteed tie.
    records.push(company("bravo-twin", "Series A", 10_000_000.0, Some(5), 2020));

    let run = pipeline.run(&records).expect("run");
    let ranked = rank(&run.scored);

    assert_eq!(ranked.len(), run.scored.len());
    for (i, r) in ranked.iter().enumerate() {
        assert_eq!(r.rank, i + 1);
    }
    for pair in ranked.windows(2) {
        assert!(pair[0].record.kpis.investment_score >= pair[1].record.kpis.investment_score);
    }
    let bravo = ranked.iter().position(|r| r.record.entity_id == "bravo").expect("bravo ranked");
    let twin = ranked.iter().position(|r| r.record.entity_id == "bravo-twin").expect("twin ranked");
    assert_eq!(twin, bravo + 1, "ties break by entity id");

    assert_eq!(top_n(&ranked, 3).len(), 3);
    assert_eq!(top_n(&ranked, 100).len(), ranked.len());
    assert_eq!(top_n(&ranked, 3)[0].rank, 1);
}

/// A single record scored against the batch's fitted scale matches the
/// batch's own score for the same record.
#[test]
fn score_one_matches_the_batch() {
    init();
    let cfg = ScopeConfig::default_test();
    let pipeline = ScoringPipeline::new(&cfg).expect("pipeline");
    let records = batch();
    let run = pipeline.run(&records).expect("run");

    let single = pipeline
        .score_one(&run.run_id, &records[3], &run.traction_scale)
        .expect("score one");
    assert_eq!(single, run.scored[3]);
}

#[test]
fn empty_batch_is_an_empty_run() {
    init();
    let cfg = ScopeConfig::default_test();
    let pipeline = ScoringPipeline::new(&cfg).expect("pipeline");
    let run = pipeline.run(&[]).expect("run");
    assert!(run.scored.is_empty());
    assert_eq!(run.exclusions.total(), 0);
    let standard = BenchmarkTables::standard();
    assert_eq!(run.benchmark_version, standard.version);
}
