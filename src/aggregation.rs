//! Resistance Statistics Aggregator.
//!
//! Counts S/I/R outcomes per grouping key and turns them into percentages.
//! Row order is part of the contract: `percent_resistant` descending, then
//! `total_tests` descending, then key ascending. Every view built from the
//! same grouping therefore lists rows in the same order. `ResistanceTable`
//! only hands out its rows read-only; a caller that needs another order
//! must ask for a sorted copy explicitly.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::model::{SusceptibilityResult, TestRecord};
use crate::period::{Period, TimeUnit};
use crate::schema::summary;

/// What to group test records by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupingKey {
    ByOrganism,
    ByAntibiotic,
    ByRegion,
    ByDistrict,
    BySourceCategory,
    ByTimeBucket(TimeUnit),
}

impl GroupingKey {
    /// Output column name for this key.
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::ByOrganism => "organism",
            Self::ByAntibiotic => "antibiotic",
            Self::ByRegion => "region",
            Self::ByDistrict => "district",
            Self::BySourceCategory => "source_category",
            Self::ByTimeBucket(_) => summary::PERIOD,
        }
    }

    /// Accepts column-style names (`organism`, `source_category`) and time
    /// units (`month`, `quarterly`, ...).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "organism" => Some(Self::ByOrganism),
            "antibiotic" => Some(Self::ByAntibiotic),
            "region" => Some(Self::ByRegion),
            "district" => Some(Self::ByDistrict),
            "source_category" | "category" => Some(Self::BySourceCategory),
            other => TimeUnit::parse(other).map(Self::ByTimeBucket),
        }
    }

    /// Whether the key is read from the sample a test belongs to.
    pub fn needs_sample(&self) -> bool {
        matches!(self, Self::ByRegion | Self::ByDistrict | Self::BySourceCategory)
    }

    /// The key value for one test, or `None` when the test cannot be placed
    /// (unknown sample, blank attribute, unparseable date).
    pub fn value_of(&self, record: &TestRecord, dataset: &Dataset) -> Option<String> {
        let value = match self {
            Self::ByOrganism => record.organism.clone(),
            Self::ByAntibiotic => record.antibiotic.clone(),
            Self::ByRegion => dataset.sample_of(record)?.region.clone(),
            Self::ByDistrict => dataset.sample_of(record)?.district.clone(),
            Self::BySourceCategory => dataset.sample_of(record)?.source_category?.to_string(),
            Self::ByTimeBucket(unit) => Period::containing(record.test_date?, *unit).label(),
        };
        (!value.is_empty()).then_some(value)
    }
}

/// Raw S/I/R tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultCounts {
    pub total: usize,
    pub resistant: usize,
    pub intermediate: usize,
    pub susceptible: usize,
}

impl ResultCounts {
    pub fn add(&mut self, result: SusceptibilityResult) {
        self.total += 1;
        match result {
            SusceptibilityResult::Resistant => self.resistant += 1,
            SusceptibilityResult::Intermediate => self.intermediate += 1,
            SusceptibilityResult::Susceptible => self.susceptible += 1,
        }
    }

    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a TestRecord>,
    {
        let mut counts = Self::default();
        for record in records {
            counts.add(record.result);
        }
        counts
    }

    fn percent(&self, part: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            part as f64 * 100.0 / self.total as f64
        }
    }

    pub fn percent_resistant(&self) -> f64 {
        self.percent(self.resistant)
    }

    pub fn percent_susceptible(&self) -> f64 {
        self.percent(self.susceptible)
    }

    pub fn percent_intermediate(&self) -> f64 {
        self.percent(self.intermediate)
    }
}

/// One row of aggregated statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResistanceSummary {
    /// One value per grouping key, in the order the keys were requested.
    pub key: Vec<String>,
    pub total_tests: usize,
    pub resistant: usize,
    pub intermediate: usize,
    pub susceptible: usize,
    pub percent_resistant: f64,
    pub percent_intermediate: f64,
    pub percent_susceptible: f64,
}

impl ResistanceSummary {
    fn from_counts(key: Vec<String>, counts: ResultCounts) -> Self {
        Self {
            key,
            total_tests: counts.total,
            resistant: counts.resistant,
            intermediate: counts.intermediate,
            susceptible: counts.susceptible,
            percent_resistant: counts.percent_resistant(),
            percent_intermediate: counts.percent_intermediate(),
            percent_susceptible: counts.percent_susceptible(),
        }
    }

    pub fn counts(&self) -> ResultCounts {
        ResultCounts {
            total: self.total_tests,
            resistant: self.resistant,
            intermediate: self.intermediate,
            susceptible: self.susceptible,
        }
    }
}

/// Contract order, compared on exact integer ratios so equal rates tie.
fn contract_order(a: &ResistanceSummary, b: &ResistanceSummary) -> Ordering {
    let a_rate = a.resistant as u128 * b.total_tests as u128;
    let b_rate = b.resistant as u128 * a.total_tests as u128;
    b_rate
        .cmp(&a_rate)
        .then_with(|| b.total_tests.cmp(&a.total_tests))
        .then_with(|| a.key.cmp(&b.key))
}

/// Aggregator output: rows in contract order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResistanceTable {
    keys: Vec<GroupingKey>,
    rows: Vec<ResistanceSummary>,
}

impl ResistanceTable {
    pub fn keys(&self) -> &[GroupingKey] {
        &self.keys
    }

    pub fn rows(&self) -> &[ResistanceSummary] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResistanceSummary> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows re-ordered by `compare`, as a separate copy. The table itself
    /// keeps the contract order.
    pub fn sorted_copy<F>(&self, compare: F) -> Vec<ResistanceSummary>
    where
        F: FnMut(&ResistanceSummary, &ResistanceSummary) -> Ordering,
    {
        let mut rows = self.rows.clone();
        rows.sort_by(compare);
        rows
    }

    pub fn into_rows(self) -> Vec<ResistanceSummary> {
        self.rows
    }

    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.keys.len() + 7);
        for (i, key) in self.keys.iter().enumerate() {
            let values: Vec<&str> = self.rows.iter().map(|r| r.key[i].as_str()).collect();
            columns.push(Column::new(key.column_name().into(), values));
        }
        let count = |f: fn(&ResistanceSummary) -> usize| -> Vec<u64> {
            self.rows.iter().map(|r| f(r) as u64).collect()
        };
        let pct =
            |f: fn(&ResistanceSummary) -> f64| -> Vec<f64> { self.rows.iter().map(f).collect() };

        columns.push(Column::new(summary::TOTAL_TESTS.into(), count(|r| r.total_tests)));
        columns.push(Column::new(summary::SUSCEPTIBLE.into(), count(|r| r.susceptible)));
        columns.push(Column::new(summary::INTERMEDIATE.into(), count(|r| r.intermediate)));
        columns.push(Column::new(summary::RESISTANT.into(), count(|r| r.resistant)));
        columns.push(Column::new(
            summary::PERCENT_SUSCEPTIBLE.into(),
            pct(|r| r.percent_susceptible),
        ));
        columns.push(Column::new(
            summary::PERCENT_INTERMEDIATE.into(),
            pct(|r| r.percent_intermediate),
        ));
        columns.push(Column::new(
            summary::PERCENT_RESISTANT.into(),
            pct(|r| r.percent_resistant),
        ));
        DataFrame::new(columns)
    }
}

impl<'a> IntoIterator for &'a ResistanceTable {
    type Item = &'a ResistanceSummary;
    type IntoIter = std::slice::Iter<'a, ResistanceSummary>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Aggregate every test in `dataset` by `keys`.
///
/// Tests that cannot be placed under one of the keys are left out of this
/// grouping only. Repeated keys are collapsed.
pub fn aggregate(dataset: &Dataset, keys: &[GroupingKey]) -> ResistanceTable {
    aggregate_records(dataset, dataset.tests(), keys)
}

/// Aggregate a subset of the tests of `dataset`.
pub fn aggregate_records<'a, I>(
    dataset: &Dataset,
    records: I,
    keys: &[GroupingKey],
) -> ResistanceTable
where
    I: IntoIterator<Item = &'a TestRecord>,
{
    let mut unique_keys: Vec<GroupingKey> = Vec::with_capacity(keys.len());
    for key in keys {
        if !unique_keys.contains(key) {
            unique_keys.push(*key);
        }
    }

    let mut groups: HashMap<Vec<String>, ResultCounts> = HashMap::new();
    let mut unplaced = 0usize;
    for record in records {
        let key: Option<Vec<String>> = unique_keys
            .iter()
            .map(|k| k.value_of(record, dataset))
            .collect();
        match key {
            Some(key) => groups.entry(key).or_default().add(record.result),
            None => unplaced += 1,
        }
    }
    if unplaced > 0 {
        log::debug!("{unplaced} tests could not be placed under {unique_keys:?}");
    }

    let mut rows: Vec<ResistanceSummary> = groups
        .into_iter()
        .filter(|(_, counts)| counts.total > 0)
        .map(|(key, counts)| ResistanceSummary::from_counts(key, counts))
        .collect();
    rows.sort_by(contract_order);

    ResistanceTable {
        keys: unique_keys,
        rows,
    }
}

/// Totals across the whole table, or `None` for an empty input.
pub fn overall_statistics(tests: &[TestRecord]) -> Option<ResistanceSummary> {
    let counts = ResultCounts::from_records(tests);
    (counts.total > 0).then(|| ResistanceSummary::from_counts(Vec::new(), counts))
}

// ── Time series ─────────────────────────────────────────────────────────────

/// One period of a resistance time series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub period: Period,
    pub label: String,
    pub total_tests: usize,
    pub resistant: usize,
    pub percent_resistant: f64,
}

/// Resistance percentage per calendar period, in chronological order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResistanceSeries {
    pub unit: TimeUnit,
    pub points: Vec<SeriesPoint>,
}

impl ResistanceSeries {
    pub fn percentages(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.percent_resistant).collect()
    }

    pub fn last_period(&self) -> Option<Period> {
        self.points.last().map(|p| p.period)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        DataFrame::new(vec![
            Column::new(
                summary::PERIOD.into(),
                self.points.iter().map(|p| p.label.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                summary::TOTAL_TESTS.into(),
                self.points.iter().map(|p| p.total_tests as u64).collect::<Vec<_>>(),
            ),
            Column::new(
                summary::RESISTANT.into(),
                self.points.iter().map(|p| p.resistant as u64).collect::<Vec<_>>(),
            ),
            Column::new(
                summary::PERCENT_RESISTANT.into(),
                self.points.iter().map(|p| p.percent_resistant).collect::<Vec<_>>(),
            ),
        ])
    }
}

/// Bucket dated tests by calendar period. Undated tests are skipped.
pub fn resistance_series(tests: &[TestRecord], unit: TimeUnit) -> ResistanceSeries {
    let mut buckets: BTreeMap<Period, ResultCounts> = BTreeMap::new();
    let mut undated = 0usize;
    for record in tests {
        match record.test_date {
            Some(date) => buckets
                .entry(Period::containing(date, unit))
                .or_default()
                .add(record.result),
            None => undated += 1,
        }
    }
    if undated > 0 {
        log::debug!("{undated} tests without a usable date left out of the {unit:?} series");
    }

    let points = buckets
        .into_iter()
        .map(|(period, counts)| SeriesPoint {
            period,
            label: period.label(),
            total_tests: counts.total,
            resistant: counts.resistant,
            percent_resistant: counts.percent_resistant(),
        })
        .collect();
    ResistanceSeries { unit, points }
}
