//! KPI derivation: formulas, floors, and per-record validation.

use venture_core::{
    benchmarks::{BenchmarkTables, BURN_PERIOD_TABLE},
    config::{KpiParams, ScopeConfig},
    error::ScopeError,
    imputation::MissingValuePolicy,
    kpi::{KpiCalculator, TractionScale},
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
        ..EntityRecord::company(id)
    }
}

fn approx(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

/// A $10M Series A with 5 investors, founded 2020, observed in 2025.
#[test]
fn series_a_reference_company() {
    init();
    let cfg = ScopeConfig::default_test();
    let calc = KpiCalculator::new(&cfg);
    let imputed = MissingValuePolicy::default().apply(&company("acme", "Series A", 10_000_000.0, Some(5), 2020));

    let k = calc.derive(&imputed).expect("valid record derives");

    assert_eq!(k.stage, Stage::SeriesA);
    assert_eq!(k.age_years, 5.0);
    assert!(approx(k.estimated_revenue, 3_000_000.0, 1e-6), "revenue {}", k.estimated_revenue);
    assert_eq!(k.capital_efficiency, 0.30);
    assert!(approx(k.monthly_burn, 10_000_000.0 / 24.0, 1e-6));
    assert_eq!(k.estimated_cash, 5_000_000.0);
    assert!(approx(k.runway_months, 12.0, 1e-9), "runway {}", k.runway_months);
    assert!(approx(k.burn_multiple, 5.0 / 3.0, 1e-9), "burn multiple {}", k.burn_multiple);
    assert!(approx(k.traction_index_raw, 7.0 * 5.0 * 1.5 / 5.0, 1e-9));
    assert!(approx(k.rule_of_40_estimated, 100.0, 1e-9), "rule of 40 {}", k.rule_of_40_estimated);
}

/// Revenue is estimated from the multiple, so revenue / funding is the
/// multiple itself, bit for bit, at every stage and funding level.
#[test]
fn capital_efficiency_equals_stage_multiple_exactly() {
    init();
    let cfg = ScopeConfig::default_test();
    let calc = KpiCalculator::new(&cfg);
    let policy = MissingValuePolicy::default();

    for stage in Stage::ALL {
        let multiple = cfg.benchmarks.lookup(stage).expect("standard tables cover every stage").revenue_multiple;
        for funding in [1.0, 137_500.0, 2_345_678.9, 9.9e9] {
            let k = calc
                .derive(&policy.apply(&company("x", stage.name(), funding, Some(3), 2018)))
                .expect("derive");
            assert_eq!(
                k.capital_efficiency.to_bits(),
                multiple.to_bits(),
                "{stage} at {funding}: {} != {multiple}",
                k.capital_efficiency
            );
        }
    }
}

/// Rule of 40 is clipped to its configured bounds whatever the slope.
#[test]
fn rule_of_40_is_clipped() {
    init();
    let benchmarks = BenchmarkTables::standard();
    let steep = KpiParams { rule_of_40_slope: 1_000.0, ..KpiParams::default() };
    let calc = KpiCalculator::with_parts(&benchmarks, &steep, 2025);
    let policy = MissingValuePolicy::default();

    let late = calc
        .derive(&policy.apply(&company("late", "Series D+", 5e8, Some(10), 2010)))
        .expect("derive");
    assert_eq!(late.rule_of_40_estimated, 150.0, "upper clip");

    let early = calc
        .derive(&policy.apply(&company("early", "Pre-Seed", 5e5, Some(1), 2024)))
        .expect("derive");
    assert_eq!(early.rule_of_40_estimated, 0.0, "lower clip");

    let default_cfg = ScopeConfig::default_test();
    let default_calc = KpiCalculator::new(&default_cfg);
    for stage in Stage::ALL {
        let k = default_calc
            .derive(&policy.apply(&company("s", stage.name(), 3e6, Some(2), 2019)))
            .expect("derive");
        assert!(
            (0.0..=150.0).contains(&k.rule_of_40_estimated),
            "{stage}: {}",
            k.rule_of_40_estimated
        );
    }
}

/// Zero, negative, and missing funding are validation failures.
#[test]
fn non_positive_funding_is_rejected() {
    init();
    let cfg = ScopeConfig::default_test();
    let calc = KpiCalculator::new(&cfg);
    let policy = MissingValuePolicy::default();

    for funding in [0.0, -5.0, f64::NAN] {
        let err = calc
            .derive(&policy.apply(&company("zero", "Seed", funding, Some(2), 2020)))
            .expect_err("funding must be > 0");
        assert!(matches!(err, ScopeError::Validation { .. }), "got {err:?}");
    }

    let mut missing = company("none", "Seed", 1.0, Some(2), 2020);
    missing.funding_amount = None;
    let err = calc.derive(&policy.apply(&missing)).expect_err("missing funding");
    assert!(matches!(err, ScopeError::Validation { .. }));
}

#[test]
fn missing_or_unknown_stage_is_rejected() {
    init();
    let cfg = ScopeConfig::default_test();
    let calc = KpiCalculator::new(&cfg);
    let policy = MissingValuePolicy::default();

    let unknown = company("u", "Grant", 1e6, Some(1), 2020);
    match calc.derive(&policy.apply(&unknown)) {
        Err(ScopeError::Validation { entity, reason }) => {
            assert_eq!(entity, "u");
            assert!(reason.contains("Grant"), "reason should name the stage: {reason}");
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    let mut blank = company("b", "  ", 1e6, Some(1), 2020);
    assert!(matches!(calc.derive(&policy.apply(&blank)), Err(ScopeError::Validation { .. })));
    blank.stage = None;
    assert!(matches!(calc.derive(&policy.apply(&blank)), Err(ScopeError::Validation { .. })));
}

#[test]
fn missing_founded_year_is_rejected() {
    init();
    let cfg = ScopeConfig::default_test();
    let calc = KpiCalculator::new(&cfg);
    let mut r = company("nf", "Seed", 1e6, Some(1), 2020);
    r.founded_year = None;
    let err = calc.derive(&MissingValuePolicy::default().apply(&r)).expect_err("no founding year");
    assert!(matches!(err, ScopeError::Validation { .. }));
}

/// A missing investor count is imputed to 0, which zeroes raw traction.
#[test]
fn missing_investors_gives_zero_traction() {
    init();
    let cfg = ScopeConfig::default_test();
    let calc = KpiCalculator::new(&cfg);
    let imputed = MissingValuePolicy::default().apply(&company("quiet", "Seed", 2e6, None, 2021));

    assert!(imputed.investors_imputed());
    assert_eq!(imputed.investors_count(), 0);
    let k = calc.derive(&imputed).expect("derive");
    assert_eq!(k.traction_index_raw, 0.0);
}

/// Founded in the observation year or later: age clips to 0 and the
/// one-year floor keeps traction finite.
#[test]
fn age_is_clipped_then_floored() {
    init();
    let cfg = ScopeConfig::default_test();
    let calc = KpiCalculator::new(&cfg);
    let policy = MissingValuePolicy::default();

    let future = calc
        .derive(&policy.apply(&company("f", "Seed", 1e6, Some(4), 2030)))
        .expect("derive");
    let same_year = calc
        .derive(&policy.apply(&company("s", "Seed", 1e6, Some(4), 2025)))
        .expect("derive");

    assert_eq!(future.age_years, 0.0);
    assert!(future.traction_index_raw.is_finite());
    assert_eq!(future.traction_index_raw, same_year.traction_index_raw);
    assert!(approx(future.traction_index_raw, 6.0 * 4.0, 1e-9));
}

/// A stage absent from one table is a configuration error naming it.
#[test]
fn uncovered_stage_is_a_configuration_error() {
    init();
    let mut benchmarks = BenchmarkTables::standard();
    benchmarks.burn_period_months.remove(&Stage::Angel);
    let params = KpiParams::default();
    let calc = KpiCalculator::with_parts(&benchmarks, &params, 2025);

    let err = calc
        .derive(&MissingValuePolicy::default().apply(&company("a", "angel", 5e5, Some(2), 2022)))
        .expect_err("Angel has no burn period");
    match err {
        ScopeError::Configuration { stage, table } => {
            assert_eq!(stage, "Angel");
            assert_eq!(table, BURN_PERIOD_TABLE);
        }
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn derivation_is_bit_reproducible() {
    init();
    let cfg = ScopeConfig::default_test();
    let calc = KpiCalculator::new(&cfg);
    let imputed = MissingValuePolicy::default().apply(&company("r", "Series B", 31_415_926.5, Some(7), 2016));

    let a = calc.derive(&imputed).expect("derive");
    let b = calc.derive(&imputed).expect("derive");
    assert_eq!(format!("{a:?}"), format!("{b:?}"));
    assert_eq!(a.burn_multiple.to_bits(), b.burn_multiple.to_bits());
    assert_eq!(a.traction_index_raw.to_bits(), b.traction_index_raw.to_bits());
}

#[test]
fn traction_scale_fit_and_apply() {
    let scale = TractionScale::fit(&[2.0, f64::NAN, 10.0, 6.0]);
    assert_eq!((scale.min, scale.max), (2.0, 10.0));
    assert_eq!(scale.apply(2.0), 0.0);
    assert_eq!(scale.apply(6.0), 50.0);
    assert_eq!(scale.apply(10.0), 100.0);
    assert_eq!(scale.apply(50.0), 100.0, "values past the fitted max clip");

    let degenerate = TractionScale::fit(&[3.0, 3.0]);
    assert_eq!(degenerate.apply(3.0), 50.0);
    assert_eq!(TractionScale::fit(&[]).apply(1.0), 50.0);
}
