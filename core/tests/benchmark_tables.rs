//! Benchmark tables and configuration files.

use venture_core::{
    benchmarks::{BenchmarkTables, RULE_OF_40_TABLE, STAGE_WEIGHT_TABLE},
    config::{ScopeConfig, TractionScaling},
    error::ScopeError,
    stage::Stage,
};

fn data_dir() -> String {
    format!("{}/../data", env!("CARGO_MANIFEST_DIR"))
}

const VALID: &str = r#"{
    "version": "test-v2",
    "revenue_multiple":     { "Seed": 0.1, "Series A": 0.3 },
    "burn_period_months":   { "Seed": 18,  "Series A": 24 },
    "stage_weight":         { "Seed": 1.0, "series a": 1.5 },
    "rule_of_40_benchmark": { "Seed": 100, "Series A": 0 }
}"#;

#[test]
fn standard_tables_cover_every_stage() {
    let t = BenchmarkTables::standard();
    t.validate().expect("standard tables are valid");
    assert!(t.coverage_gaps().is_empty());
    assert_eq!(t.version, "stage-benchmarks-v1");

    let a = t.lookup(Stage::SeriesA).expect("Series A");
    assert_eq!(a.revenue_multiple, 0.30);
    assert_eq!(a.burn_period_months, 24.0);
    assert_eq!(a.stage_weight, 1.5);
    assert_eq!(a.rule_of_40_benchmark, 100.0);
}

/// The shipped data file and the built-in tables agree.
#[test]
fn data_file_matches_builtin_tables() {
    let loaded = BenchmarkTables::load(&data_dir()).expect("data/benchmarks loads");
    assert_eq!(loaded, BenchmarkTables::standard());
}

#[test]
fn partial_tables_parse_and_report_gaps() {
    let t = BenchmarkTables::from_json(VALID).expect("valid json");
    assert_eq!(t.version, "test-v2");
    assert_eq!(t.stage_weight.get(&Stage::SeriesA), Some(&1.5), "keys are parsed like stages");
    assert_eq!(t.rule_of_40_benchmark.get(&Stage::SeriesA), Some(&0.0), "a zero rule-of-40 base is allowed");

    let gaps = t.coverage_gaps();
    assert!(gaps.contains(&(Stage::Angel, STAGE_WEIGHT_TABLE)));
    assert!(gaps.contains(&(Stage::SeriesDPlus, RULE_OF_40_TABLE)));
    assert!(matches!(t.lookup(Stage::SeriesC), Err(ScopeError::Configuration { .. })));
}

#[test]
fn malformed_tables_are_rejected() {
    let unknown_stage = VALID.replace("\"Seed\": 0.1", "\"Grant\": 0.1");
    let negative = VALID.replace("\"Seed\": 18", "\"Seed\": -18");
    let zero_multiple = VALID.replace("\"Seed\": 0.1", "\"Seed\": 0.0");
    let empty_table = r#"{
        "version": "x",
        "revenue_multiple": {},
        "burn_period_months": { "Seed": 18 },
        "stage_weight": { "Seed": 1.0 },
        "rule_of_40_benchmark": { "Seed": 100 }
    }"#;
    let no_version = VALID.replace("test-v2", " ");

    for (label, json) in [
        ("unknown stage key", unknown_stage.as_str()),
        ("negative burn period", negative.as_str()),
        ("zero revenue multiple", zero_multiple.as_str()),
        ("empty table", empty_table),
        ("blank version", no_version.as_str()),
    ] {
        match BenchmarkTables::from_json(json) {
            Err(ScopeError::InvalidBenchmarks { .. }) => {}
            other => panic!("{label}: expected InvalidBenchmarks, got {other:?}"),
        }
    }

    assert!(matches!(
        BenchmarkTables::from_json("{ not json"),
        Err(ScopeError::Serialization(_))
    ));
}

/// Tables sharing no fully covered stage cannot score anything.
#[test]
fn disjoint_tables_are_rejected() {
    let json = r#"{
        "version": "x",
        "revenue_multiple":     { "Seed": 0.1 },
        "burn_period_months":   { "Series A": 24 },
        "stage_weight":         { "Seed": 1.0 },
        "rule_of_40_benchmark": { "Seed": 100 }
    }"#;
    assert!(matches!(
        BenchmarkTables::from_json(json),
        Err(ScopeError::InvalidBenchmarks { .. })
    ));
}

#[test]
fn scope_config_loads_from_data_dir() {
    let cfg = ScopeConfig::load(&data_dir()).expect("data/ config loads");
    assert_eq!(cfg.observation_year, 2025);
    assert_eq!(cfg.kpi.traction_scaling, TractionScaling::Population);
    assert_eq!(cfg.weights.rule_of_40, 0.25);
    assert_eq!(cfg.normalization.runway_max_months, 24.0);
    assert_eq!(cfg.model.n_estimators, 100);
    assert_eq!(cfg.model.max_depth, 10);
    assert_eq!(cfg.model.min_samples_split, 20);
    assert_eq!(cfg.model.min_samples_leaf, 10);
    assert_eq!(cfg.model, venture_core::config::ModelConfig::default(), "file and defaults agree");
    assert_eq!(cfg.model.seed, 42);
    assert_eq!(cfg.benchmarks.version, "stage-benchmarks-v1");
}

#[test]
fn missing_data_dir_is_an_error() {
    assert!(ScopeConfig::load("/nonexistent/venture-scope-data").is_err());
}
