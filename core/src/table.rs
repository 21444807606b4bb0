//! Flat-file boundary: CSV snapshot in, ranked table out.
//!
//! Loading harmonizes the many column spellings startup snapshots use and
//! coerces unparseable numerics to absent. `load_entities` never filters;
//! `ingest_filter` does that as a separate, reported step.
//!
//! `load_enriched` assembles the same records from a Crunchbase export
//! split over three files:
//!   objects.csv         one row per object; only companies are kept
//!   funding_rounds.csv  latest round per company -> stage
//!   investments.csv     distinct investors per company -> investors_count
//! Both lookups are left joins on the object id, so a company with no
//! investment rows keeps an absent investors_count.

use crate::{
    config::IngestConfig,
    error::{ScopeError, ScopeResult},
    pipeline::RankedRecord,
    record::EntityRecord,
    stage::Stage,
    types::Year,
};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::path::Path;

const ID_COLUMNS: &[&str] = &["id", "entity_id", "object_id"];
const COMPANY_COLUMNS: &[&str] = &["company", "organization", "startup", "name"];
const ENTITY_TYPE_COLUMNS: &[&str] = &["entity_type"];
const STAGE_COLUMNS: &[&str] = &["stage", "last_round_type", "funding_round_type"];
const SECTOR_COLUMNS: &[&str] = &["sector", "category_code", "category", "industry"];
const COUNTRY_COLUMNS: &[&str] = &["country", "country_code", "hq_country"];
const FUNDING_COLUMNS: &[&str] =
    &["funding_amount", "funding_total_usd", "raised_amount_usd", "funding_total"];
const INVESTOR_COLUMNS: &[&str] = &["investors_count", "investor_count", "participants"];
const FOUNDED_YEAR_COLUMNS: &[&str] = &["founded_year"];
const FOUNDED_AT_COLUMNS: &[&str] = &["founded_at"];
const STATUS_COLUMNS: &[&str] = &["status"];

pub const OBJECTS_FILE: &str = "objects.csv";
pub const FUNDING_ROUNDS_FILE: &str = "funding_rounds.csv";
pub const INVESTMENTS_FILE: &str = "investments.csv";

// ── Loading ──────────────────────────────────────────────────────────────────

/// Column index per canonical field, resolved once from the header row.
/// Sector and country hold every candidate present, in priority order,
/// and are coalesced cell by cell.
struct ColumnMap {
    id:           Option<usize>,
    company:      Option<usize>,
    entity_type:  Option<usize>,
    stage:        Option<usize>,
    sector:       Vec<usize>,
    country:      Vec<usize>,
    funding:      Option<usize>,
    investors:    Option<usize>,
    founded_year: Option<usize>,
    founded_at:   Option<usize>,
    status:       Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord) -> Self {
        let names: Vec<String> = headers.iter().map(|h| h.trim().to_ascii_lowercase()).collect();
        let position = |c: &str| names.iter().position(|n| n == c);
        let find = |candidates: &[&str]| candidates.iter().find_map(|c| position(*c));
        // The canonical name alone when present, otherwise every fallback.
        let coalesce = |candidates: &[&str]| -> Vec<usize> {
            match candidates.first().and_then(|c| position(*c)) {
                Some(canonical) => vec![canonical],
                None => candidates.iter().filter_map(|c| position(*c)).collect(),
            }
        };
        Self {
            id:           find(ID_COLUMNS),
            company:      find(COMPANY_COLUMNS),
            entity_type:  find(ENTITY_TYPE_COLUMNS),
            stage:        find(STAGE_COLUMNS),
            sector:       coalesce(SECTOR_COLUMNS),
            country:      coalesce(COUNTRY_COLUMNS),
            funding:      find(FUNDING_COLUMNS),
            investors:    find(INVESTOR_COLUMNS),
            founded_year: find(FOUNDED_YEAR_COLUMNS),
            founded_at:   find(FOUNDED_AT_COLUMNS),
            status:       find(STATUS_COLUMNS),
        }
    }

    fn warn_missing(&self, fields: &[&str]) {
        for &field in fields {
            let found = match field {
                "company" => self.company.is_some(),
                "stage" => self.stage.is_some(),
                "funding_amount" => self.funding.is_some(),
                "investors_count" => self.investors.is_some(),
                "founded_year" => self.founded_year.or(self.founded_at).is_some(),
                _ => true,
            };
            if !found {
                log::warn!("ingest: no candidate column found for '{field}'");
            }
        }
    }
}

fn open_csv(path: &Path) -> ScopeResult<csv::Reader<File>> {
    Ok(csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?)
}

/// Read a startup snapshot from CSV.
pub fn load_entities(path: impl AsRef<Path>) -> ScopeResult<Vec<EntityRecord>> {
    let path = path.as_ref();
    let mut reader = open_csv(path)?;
    let columns = ColumnMap::resolve(reader.headers()?);
    columns.warn_missing(&["company", "stage", "funding_amount", "investors_count", "founded_year"]);

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let raw = result?;
        records.push(parse_row(&columns, &raw, row));
    }

    if records.is_empty() {
        return Err(anyhow::anyhow!("CSV file is empty: {}", path.display()).into());
    }
    log::info!("ingest: loaded {} row(s) from {}", records.len(), path.display());
    Ok(records)
}

fn cell(raw: &csv::StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| raw.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_row(columns: &ColumnMap, raw: &csv::StringRecord, row: usize) -> EntityRecord {
    let text = |idx: Option<usize>| cell(raw, idx);
    let first_text = |candidates: &[usize]| candidates.iter().find_map(|&i| text(Some(i)));

    let company = text(columns.company);
    let entity_id = text(columns.id)
        .or_else(|| company.clone())
        .unwrap_or_else(|| format!("row-{row:06}"));

    let founded_year = text(columns.founded_year)
        .and_then(|s| parse_number(&s))
        .map(|y| y as Year)
        .or_else(|| text(columns.founded_at).and_then(|s| parse_year(&s)));

    EntityRecord {
        company:         company.unwrap_or_else(|| entity_id.clone()),
        entity_id,
        entity_type:     text(columns.entity_type),
        funding_amount:  text(columns.funding).and_then(|s| parse_number(&s)),
        stage:           text(columns.stage),
        investors_count: text(columns.investors)
            .and_then(|s| parse_number(&s))
            .filter(|n| *n >= 0.0)
            .map(|n| n as u32),
        founded_year,
        sector:          first_text(&columns.sector),
        country:         first_text(&columns.country),
        status:          text(columns.status),
    }
}

// ── Enriched Crunchbase export ───────────────────────────────────────────────

fn required_column(headers: &csv::StringRecord, name: &str, path: &Path) -> ScopeResult<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            ScopeError::from(anyhow::anyhow!("{}: missing column '{name}'", path.display()))
        })
}

struct Round {
    funded_at:  Option<String>,
    round_type: Option<String>,
}

/// Standardized stage name of each object's latest round.
///
/// Rounds are ordered by `funded_at` (ISO dates compare as text); undated
/// rounds sort after every dated one. The latest round that carries a
/// round type decides. Types with no stage mapping leave the stage absent.
fn latest_stages(path: &Path) -> ScopeResult<HashMap<String, Option<String>>> {
    let mut reader = open_csv(path)?;
    let headers = reader.headers()?.clone();
    let object_col = required_column(&headers, "object_id", path)?;
    let type_col = required_column(&headers, "funding_round_type", path)?;
    let date_col = required_column(&headers, "funded_at", path)?;

    let mut rounds: HashMap<String, Vec<Round>> = HashMap::new();
    let mut total = 0usize;
    for result in reader.records() {
        let raw = result?;
        let Some(object_id) = cell(&raw, Some(object_col)) else {
            continue;
        };
        rounds.entry(object_id).or_default().push(Round {
            funded_at:  cell(&raw, Some(date_col)),
            round_type: cell(&raw, Some(type_col)),
        });
        total += 1;
    }
    log::info!("ingest: {total} funding round(s) for {} object(s)", rounds.len());

    Ok(rounds
        .into_iter()
        .map(|(object_id, mut list)| {
            list.sort_by(|a, b| match (&a.funded_at, &b.funded_at) {
                (Some(x), Some(y)) => x.cmp(y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            });
            let stage = list
                .iter()
                .rev()
                .find_map(|r| r.round_type.as_deref())
                .and_then(Stage::parse)
                .map(|s| s.name().to_string());
            (object_id, stage)
        })
        .collect())
}

/// Distinct investor ids per funded object. Rows with a blank investor id
/// still register the object (with a count of 0).
fn investor_counts(path: &Path) -> ScopeResult<HashMap<String, u32>> {
    let mut reader = open_csv(path)?;
    let headers = reader.headers()?.clone();
    let funded_col = required_column(&headers, "funded_object_id", path)?;
    let investor_col = required_column(&headers, "investor_object_id", path)?;

    let mut investors: HashMap<String, HashSet<String>> = HashMap::new();
    for result in reader.records() {
        let raw = result?;
        let Some(funded) = cell(&raw, Some(funded_col)) else {
            continue;
        };
        let entry = investors.entry(funded).or_default();
        if let Some(investor) = cell(&raw, Some(investor_col)) {
            entry.insert(investor);
        }
    }

    Ok(investors
        .into_iter()
        .map(|(id, set)| (id, u32::try_from(set.len()).unwrap_or(u32::MAX)))
        .collect())
}

/// Load a Crunchbase export directory: `objects.csv` joined with the
/// latest stage from `funding_rounds.csv` and the distinct investor count
/// from `investments.csv`.
pub fn load_enriched(data_dir: impl AsRef<Path>) -> ScopeResult<Vec<EntityRecord>> {
    let dir = data_dir.as_ref();
    let objects_path = dir.join(OBJECTS_FILE);
    let stages = latest_stages(&dir.join(FUNDING_ROUNDS_FILE))?;
    let investors = investor_counts(&dir.join(INVESTMENTS_FILE))?;

    let mut reader = open_csv(&objects_path)?;
    let headers = reader.headers()?.clone();
    required_column(&headers, "id", &objects_path)?;
    let columns = ColumnMap::resolve(&headers);
    columns.warn_missing(&["company", "funding_amount", "founded_year"]);

    let mut records = Vec::new();
    let mut non_company = 0usize;
    for (row, result) in reader.records().enumerate() {
        let mut record = parse_row(&columns, &result?, row);
        if !record.is_company() {
            non_company += 1;
            continue;
        }
        record.stage = stages.get(&record.entity_id).cloned().flatten();
        record.investors_count = investors.get(&record.entity_id).copied();
        records.push(record);
    }

    if records.is_empty() {
        return Err(anyhow::anyhow!("no companies in {}", objects_path.display()).into());
    }
    let with_stage = records.iter().filter(|r| r.stage.is_some()).count();
    let with_investors = records.iter().filter(|r| r.investors_count.is_some()).count();
    log::info!(
        "ingest: {} company row(s) from {} (dropped {non_company} non-company), \
         {with_stage} with a stage, {with_investors} with investors",
        records.len(),
        dir.display()
    );
    Ok(records)
}

/// Coerce to a finite number, or absent. Tolerates "$1,200,000".
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',' && *c != '$').collect();
    cleaned.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Year of a date or timestamp string, or absent.
fn parse_year(raw: &str) -> Option<Year> {
    let raw = raw.trim();
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date.year());
        }
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(ts.year());
    }
    raw.parse::<Year>().ok()
}

// ── Filtering ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterReport {
    pub input:       usize,
    pub non_company: usize,
    pub unfunded:    usize,
    pub kept:        usize,
}

/// Keep companies with funding > 0 (and >= `min_funding` when set).
///
/// A funding amount of 0 is treated as missing data, not as a
/// bootstrapped company.
pub fn ingest_filter(
    records: Vec<EntityRecord>,
    config: &IngestConfig,
) -> (Vec<EntityRecord>, FilterReport) {
    let mut report = FilterReport {
        input: records.len(),
        ..FilterReport::default()
    };

    let kept: Vec<EntityRecord> = records
        .into_iter()
        .filter(|r| {
            if !r.is_company() {
                report.non_company += 1;
                return false;
            }
            let above_threshold =
                config.min_funding <= 0.0 || r.funding_amount.unwrap_or_default() >= config.min_funding;
            if !r.is_funded() || !above_threshold {
                report.unfunded += 1;
                return false;
            }
            true
        })
        .collect();

    report.kept = kept.len();
    log::info!(
        "ingest: kept {} of {} (non-company {}, unfunded {})",
        report.kept,
        report.input,
        report.non_company,
        report.unfunded
    );
    (kept, report)
}

// ── Data quality ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completeness {
    Complete,
    /// Under 20% missing.
    Minor,
    /// Under 50% missing.
    Partial,
    /// Half or more missing.
    Sparse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnQuality {
    pub column:       String,
    pub missing:      usize,
    pub missing_pct:  f64,
    pub completeness: Completeness,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub rows:    usize,
    pub columns: Vec<ColumnQuality>,
}

impl DataQualityReport {
    pub fn from_records(records: &[EntityRecord]) -> Self {
        type Probe = fn(&EntityRecord) -> bool;
        let probes: [(&str, Probe); 7] = [
            ("company",         |r| r.company.trim().is_empty()),
            ("stage",           |r| r.stage.is_none()),
            ("country",         |r| r.country.is_none()),
            ("sector",          |r| r.sector.is_none()),
            ("funding_amount",  |r| r.funding_amount.is_none()),
            ("investors_count", |r| r.investors_count.is_none()),
            ("founded_year",    |r| r.founded_year.is_none()),
        ];

        let rows = records.len();
        let columns = probes
            .iter()
            .map(|(column, is_missing)| {
                let missing = records.iter().filter(|&r| is_missing(r)).count();
                let missing_pct = if rows == 0 {
                    0.0
                } else {
                    missing as f64 / rows as f64 * 100.0
                };
                let completeness = if missing == 0 {
                    Completeness::Complete
                } else if missing_pct < 20.0 {
                    Completeness::Minor
                } else if missing_pct < 50.0 {
                    Completeness::Partial
                } else {
                    Completeness::Sparse
                };
                ColumnQuality {
                    column: column.to_string(),
                    missing,
                    missing_pct,
                    completeness,
                }
            })
            .collect();

        Self { rows, columns }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnQuality> {
        self.columns.iter().find(|c| c.column == name)
    }
}

// ── investors_count gap ──────────────────────────────────────────────────────

/// Upper bound (inclusive) and label of each funding bucket.
const FUNDING_BUCKETS: [(f64, &str); 5] = [
    (100_000.0, "<100K"),
    (1_000_000.0, "100K-1M"),
    (10_000_000.0, "1M-10M"),
    (100_000_000.0, "10M-100M"),
    (f64::INFINITY, ">100M"),
];

const UNKNOWN_GROUP: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapLine {
    pub group:       String,
    pub rows:        usize,
    pub missing:     usize,
    pub missing_pct: f64,
}

impl GapLine {
    fn new(group: impl Into<String>, rows: usize, missing: usize) -> Self {
        let missing_pct = if rows == 0 {
            0.0
        } else {
            missing as f64 / rows as f64 * 100.0
        };
        Self {
            group: group.into(),
            rows,
            missing,
            missing_pct,
        }
    }
}

/// How often `investors_count` is absent, broken down the ways that show
/// the gap is not random: it concentrates in early stages and small raises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestorGapReport {
    pub overall:    GapLine,
    /// Highest missing share first.
    pub by_stage:   Vec<GapLine>,
    /// Highest missing share first.
    pub by_country: Vec<GapLine>,
    /// Bucket order, smallest raise first. Unfunded rows are left out.
    pub by_funding: Vec<GapLine>,
}

impl InvestorGapReport {
    pub fn from_records(records: &[EntityRecord]) -> Self {
        let missing = |r: &EntityRecord| r.investors_count.is_none();
        let group_of = |value: &Option<String>| {
            value.clone().unwrap_or_else(|| UNKNOWN_GROUP.to_string())
        };

        let grouped = |key: &dyn Fn(&EntityRecord) -> String| {
            let mut counts: BTreeMap<String, (usize, usize)> = BTreeMap::new();
            for r in records {
                let entry = counts.entry(key(r)).or_insert((0, 0));
                entry.0 += 1;
                entry.1 += usize::from(missing(r));
            }
            let mut lines: Vec<GapLine> = counts
                .into_iter()
                .map(|(group, (rows, gaps))| GapLine::new(group, rows, gaps))
                .collect();
            lines.sort_by(|a, b| b.missing_pct.total_cmp(&a.missing_pct));
            lines
        };

        let mut buckets = [(0usize, 0usize); FUNDING_BUCKETS.len()];
        for r in records {
            let Some(funding) = r.funding_amount.filter(|f| *f > 0.0) else {
                continue;
            };
            if let Some(i) = FUNDING_BUCKETS.iter().position(|(upper, _)| funding <= *upper) {
                buckets[i].0 += 1;
                buckets[i].1 += usize::from(missing(r));
            }
        }

        Self {
            overall:    GapLine::new("all", records.len(), records.iter().filter(|&r| missing(r)).count()),
            by_stage:   grouped(&|r: &EntityRecord| group_of(&r.stage)),
            by_country: grouped(&|r: &EntityRecord| group_of(&r.country)),
            by_funding: FUNDING_BUCKETS
                .iter()
                .zip(buckets)
                .map(|((_, label), (rows, gaps))| GapLine::new(*label, rows, gaps))
                .collect(),
        }
    }

    pub fn stage(&self, group: &str) -> Option<&GapLine> {
        self.by_stage.iter().find(|l| l.group == group)
    }

    pub fn funding_bucket(&self, label: &str) -> Option<&GapLine> {
        self.by_funding.iter().find(|l| l.group == label)
    }
}

// ── Writing ──────────────────────────────────────────────────────────────────

/// One flat output row. Column order is the file's column order.
#[derive(Debug, Serialize)]
struct RankedRow<'a> {
    rank:                 usize,
    entity_id:            &'a str,
    company:              &'a str,
    stage:                &'static str,
    sector:               Option<&'a str>,
    country:              Option<&'a str>,
    status:               Option<&'a str>,
    funding_amount:       f64,
    investors_count:      u32,
    investors_imputed:    bool,
    founded_year:         Year,
    estimated_revenue:    f64,
    capital_efficiency:   f64,
    monthly_burn:         f64,
    estimated_cash:       f64,
    runway_months:        f64,
    burn_multiple:        f64,
    traction_index_raw:   f64,
    traction_index:       f64,
    rule_of_40_estimated: f64,
    investment_score:     f64,
    benchmark_version:    &'a str,
    run_id:               &'a str,
}

pub fn write_ranked(path: impl AsRef<Path>, ranked: &[RankedRecord]) -> ScopeResult<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)?;
    for r in ranked {
        let s = &r.record;
        let k = &s.kpis;
        writer.serialize(RankedRow {
            rank:                 r.rank,
            entity_id:            &s.entity_id,
            company:              &s.company,
            stage:                s.stage.name(),
            sector:               s.sector.as_deref(),
            country:              s.country.as_deref(),
            status:               s.status.as_deref(),
            funding_amount:       s.funding_amount,
            investors_count:      s.investors_count,
            investors_imputed:    s.investors_imputed,
            founded_year:         s.founded_year,
            estimated_revenue:    k.estimated_revenue,
            capital_efficiency:   k.capital_efficiency,
            monthly_burn:         k.monthly_burn,
            estimated_cash:       k.estimated_cash,
            runway_months:        k.runway_months,
            burn_multiple:        k.burn_multiple,
            traction_index_raw:   k.traction_index_raw,
            traction_index:       k.traction_index,
            rule_of_40_estimated: k.rule_of_40_estimated,
            investment_score:     k.investment_score,
            benchmark_version:    &s.benchmark_version,
            run_id:               &s.run_id,
        })?;
    }
    writer.flush().map_err(ScopeError::Io)?;
    log::info!("wrote {} ranked row(s) to {}", ranked.len(), path.display());
    Ok(())
}
