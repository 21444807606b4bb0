//! scope-runner: headless batch scorer for startup funding snapshots.
//!
//! Usage:
//!   scope-runner --input startups.csv [--data-dir ./data] [--out-dir ./results]
//!                [--top 100] [--seed 42] [--observation-year 2025] [--min-funding 0]
//!   scope-runner --enriched-dir ./raw    (objects.csv, funding_rounds.csv, investments.csv)
//!   scope-runner --input startups.csv --predict --funding 10000000 --stage "Series A"
//!                [--sector fintech] [--country USA] [--investors 5] [--founded 2021]

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use venture_core::{
    classifier::TreeEnsemble,
    config::ScopeConfig,
    evaluation::{train_and_evaluate, Evaluation, Metrics},
    features::{training_set, FeatureSchema},
    labeling::labeled_table,
    pipeline::{rank, top_n, ExclusionKind, ScoringPipeline, ScoringRun},
    prediction::{assess, StartupProfile},
    summary::{ScoreBand, ScoreBreakdown, ScoreSummary},
    table::{self, DataQualityReport, FilterReport, GapLine, InvestorGapReport},
};

#[derive(Serialize)]
struct RunManifest<'a> {
    run_id:            &'a str,
    benchmark_version: &'a str,
    generated_at:      String,
    input:             &'a str,
    observation_year:  i32,
    filter:            FilterReport,
    exclusions:        BTreeMap<ExclusionKind, usize>,
    scored:            usize,
    labeled:           usize,
    metrics:           Option<Metrics>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let enriched_dir = arg_value(&args, "--enriched-dir");
    let Some(input) = arg_value(&args, "--input").or(enriched_dir) else {
        bail!("--input <csv> or --enriched-dir <dir> is required");
    };
    let data_dir = arg_value(&args, "--data-dir").unwrap_or("./data");
    let out_dir = arg_value(&args, "--out-dir").unwrap_or("./results");
    let top = parse_arg(&args, "--top", 100usize);
    let predict_mode = args.iter().any(|a| a == "--predict");

    let mut config = ScopeConfig::load(data_dir)?;
    config.model.seed = parse_arg(&args, "--seed", config.model.seed);
    config.observation_year = parse_arg(&args, "--observation-year", config.observation_year);
    config.ingest.min_funding = parse_arg(&args, "--min-funding", config.ingest.min_funding);

    println!("VentureScope — scope-runner");
    println!("  input:      {input}");
    println!("  data_dir:   {data_dir}");
    println!("  out_dir:    {out_dir}");
    println!("  benchmarks: {}", config.benchmarks.version);
    println!("  obs year:   {}", config.observation_year);
    println!("  seed:       {}", config.model.seed);
    println!();

    // ── Ingest ───────────────────────────────────────────────────────
    let raw = match enriched_dir {
        Some(dir) => table::load_enriched(dir)?,
        None => table::load_entities(input)?,
    };
    print_quality(&DataQualityReport::from_records(&raw));
    print_investor_gap(&InvestorGapReport::from_records(&raw));
    let (records, filter) = table::ingest_filter(raw, &config.ingest);
    print_filter(&filter);

    // ── Score and rank ───────────────────────────────────────────────
    let pipeline = ScoringPipeline::new(&config)?;
    let run = pipeline.run(&records)?;
    print_exclusions(&run);

    let ranked = rank(&run.scored);
    std::fs::create_dir_all(out_dir).with_context(|| format!("cannot create {out_dir}"))?;
    table::write_ranked(Path::new(out_dir).join("startups_scored.csv"), &ranked)?;
    table::write_ranked(Path::new(out_dir).join("top_startups.csv"), top_n(&ranked, top))?;

    println!("=== TOP 10 ===");
    for r in top_n(&ranked, 10) {
        println!(
            "  {:>3}. {:<32} {:<10} score {:>6.2}",
            r.rank, r.record.company, r.record.stage, r.record.kpis.investment_score
        );
    }
    println!();

    print_summary(&ScoreSummary::from_records(&run.scored));
    if let Some(best) = ranked.first() {
        print_breakdown(&ScoreBreakdown::for_record(pipeline.scorer(), &best.record));
    }

    // ── Train and evaluate ───────────────────────────────────────────
    let labeled = labeled_table(&run.scored);
    let (schema, matrix, labels) = training_set(&labeled);
    let classifier = TreeEnsemble::new(config.model);
    let evaluation = match train_and_evaluate(&classifier, &matrix, &labels, &config.model) {
        Ok(eval) => {
            print_model(&eval, &matrix.columns);
            Some(eval)
        }
        Err(e) => {
            log::warn!("model training skipped: {e}");
            println!("=== MODEL ===\n  skipped: {e}\n");
            None
        }
    };

    let manifest = RunManifest {
        run_id:            &run.run_id,
        benchmark_version: &run.benchmark_version,
        generated_at:      chrono::Utc::now().to_rfc3339(),
        input,
        observation_year:  config.observation_year,
        filter,
        exclusions:        run.exclusions.by_kind(),
        scored:            run.scored.len(),
        labeled:           labeled.len(),
        metrics:           evaluation.as_ref().map(|e| e.metrics),
    };
    let manifest_path = Path::new(out_dir).join("run_manifest.json");
    std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)
        .with_context(|| format!("cannot write {}", manifest_path.display()))?;

    if predict_mode {
        let Some(eval) = evaluation else {
            bail!("--predict needs a trained model, and training was skipped");
        };
        predict(&args, &pipeline, &run, &schema, &eval)?;
    }

    Ok(())
}

fn predict(
    args: &[String],
    pipeline: &ScoringPipeline<'_>,
    run: &ScoringRun,
    schema: &FeatureSchema,
    eval: &Evaluation,
) -> Result<()> {
    let funding = parse_arg(args, "--funding", 0.0f64);
    let Some(stage) = arg_value(args, "--stage") else {
        bail!("--predict requires --stage");
    };
    if funding <= 0.0 {
        bail!("--predict requires --funding > 0");
    }

    let profile = StartupProfile {
        company:         "candidate".to_string(),
        funding_amount:  funding,
        stage:           stage.to_string(),
        sector:          arg_value(args, "--sector").map(str::to_string),
        country:         arg_value(args, "--country").map(str::to_string),
        investors_count: arg_value(args, "--investors").and_then(|v| v.parse().ok()),
        founded_year:    arg_value(args, "--founded").and_then(|v| v.parse().ok()),
    };
    let scored = pipeline.score_one(&run.run_id, &profile.to_record(), &run.traction_scale)?;
    let a = assess(eval.model.as_ref(), schema, &scored);

    println!("=== ASSESSMENT ===");
    println!("  stage:               {}", a.stage);
    println!("  investment score:    {:.2}", a.investment_score);
    println!("  success probability: {:.1}%", a.success_probability * 100.0);
    println!("  confidence:          {:?}", a.confidence);
    println!("  recommendation:      {}", a.recommendation.label());
    if !a.strengths.is_empty() {
        println!("  strengths:");
        for s in &a.strengths {
            println!("    + {s}");
        }
    }
    if !a.concerns.is_empty() {
        println!("  concerns:");
        for c in &a.concerns {
            println!("    - {c}");
        }
    }
    Ok(())
}

fn print_quality(report: &DataQualityReport) {
    println!("=== DATA QUALITY ({} rows) ===", report.rows);
    for c in &report.columns {
        println!(
            "  {:<16} missing {:>7} ({:>5.1}%)  {:?}",
            c.column, c.missing, c.missing_pct, c.completeness
        );
    }
    println!();
}

/// Countries with fewer rows than this are left out of the printout.
const MIN_COUNTRY_ROWS: usize = 50;

fn print_investor_gap(report: &InvestorGapReport) {
    let line = |l: &GapLine| {
        println!(
            "  {:<16} {:>7} rows  missing {:>7} ({:>5.1}%)",
            l.group, l.rows, l.missing, l.missing_pct
        );
    };
    println!("=== INVESTORS_COUNT GAP ===");
    line(&report.overall);
    println!("  -- by stage");
    report.by_stage.iter().for_each(line);
    println!("  -- by funding");
    report.by_funding.iter().for_each(line);
    println!("  -- by country (top 10, >= {MIN_COUNTRY_ROWS} rows)");
    report
        .by_country
        .iter()
        .filter(|l| l.rows >= MIN_COUNTRY_ROWS)
        .take(10)
        .for_each(line);
    println!();
}

fn print_filter(f: &FilterReport) {
    println!("=== INGEST FILTER ===");
    println!("  input:       {}", f.input);
    println!("  non-company: {}", f.non_company);
    println!("  unfunded:    {}", f.unfunded);
    println!("  kept:        {}", f.kept);
    println!();
}

fn print_exclusions(run: &ScoringRun) {
    println!("=== SCORING RUN {} ===", run.run_id);
    println!("  scored:            {}", run.scored.len());
    println!("  investors imputed: {}", run.investors_imputed);
    println!("  excluded:          {}", run.exclusions.total());
    for (reason, count) in run.exclusions.by_reason() {
        println!("    {count:>6}  {reason}");
    }
    println!();
}

fn print_summary(s: &ScoreSummary) {
    println!("=== SCORE SUMMARY ===");
    println!("  count {}  mean {:.2}  median {:.2}  std {:.2}", s.count, s.mean, s.median, s.std_dev);
    println!("  min {:.2}  p25 {:.2}  p75 {:.2}  max {:.2}", s.min, s.p25, s.p75, s.max);
    for band in ScoreBand::ALL {
        let n = s.band_count(band);
        let pct = if s.count == 0 { 0.0 } else { n as f64 / s.count as f64 * 100.0 };
        println!("  {:<26} {:>7} ({:>5.1}%)", band.label(), n, pct);
    }
    println!();
}

fn print_breakdown(b: &ScoreBreakdown) {
    println!("=== BREAKDOWN: {} ===", b.company);
    for c in &b.components {
        println!(
            "  {:<20} raw {:>10.3}  norm {:>6.2}  x {:.2} = {:>6.2}",
            c.kpi, c.raw, c.normalized, c.weight, c.contribution
        );
    }
    println!("  investment score: {:.2}", b.investment_score);
    println!();
}

fn print_model(eval: &Evaluation, columns: &[String]) {
    let m = &eval.metrics;
    println!("=== MODEL (train {}, test {}) ===", eval.train_size, eval.test_size);
    println!(
        "  accuracy {:.3}  precision {:.3}  recall {:.3}  f1 {:.3}  roc_auc {:.3}",
        m.accuracy, m.precision, m.recall, m.f1, m.roc_auc
    );
    let cm = &m.confusion;
    println!(
        "  confusion: tp {} fp {} tn {} fn {}",
        cm.true_positive, cm.false_positive, cm.true_negative, cm.false_negative
    );

    let mut importances: Vec<(&String, f64)> =
        columns.iter().zip(eval.model.feature_importances()).collect();
    importances.sort_by(|a, b| b.1.total_cmp(&a.1));
    println!("  top features:");
    for (name, value) in importances.iter().take(10) {
        println!("    {name:<28} {value:.4}");
    }
    println!();
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
