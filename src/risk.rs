//! Risk Scorer: bounded composite score per organism or other entity.
//!
//! Three step components are added and capped at 100:
//! resistance rate, test volume and antibiotic diversity. Each step table
//! comes from [`RiskTiers`] and is read highest threshold first; a value
//! earns the points of the first step it strictly exceeds.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use polars::prelude::*;
use rayon::prelude::*;
use serde::{Serialize, Serializer};

use crate::aggregation::{GroupingKey, ResultCounts};
use crate::config::{AnalyticsConfig, RiskTiers, Tier};
use crate::dataset::Dataset;
use crate::model::TestRecord;
use crate::schema::risk;

pub const MAX_SCORE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u32, tiers: &RiskTiers) -> Self {
        if score >= tiers.critical_at {
            Self::Critical
        } else if score >= tiers.high_at {
            Self::High
        } else if score >= tiers.moderate_at {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Moderate => "MODERATE",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named reason behind a score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RiskFactor {
    /// `step` is the resistance-rate step reached, 0 being the highest.
    ResistanceRate { step: usize, above: f64 },
    DataVolume { above: f64 },
    AntibioticDiversity,
}

impl fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResistanceRate { step: 0, above } => {
                write!(f, "Very high resistance rate (>{above}%)")
            }
            Self::ResistanceRate { step: 1, above } => {
                write!(f, "High resistance rate (>{above}%)")
            }
            Self::ResistanceRate { above, .. } => write!(f, "Moderate resistance rate (>{above}%)"),
            Self::DataVolume { above } => write!(f, "Significant data volume (>{above} tests)"),
            Self::AntibioticDiversity => f.write_str("High antibiotic diversity"),
        }
    }
}

impl Serialize for RiskFactor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskScore {
    pub entity: String,
    pub score: u32,
    pub level: RiskLevel,
    /// Percent resistant, 0-100.
    pub resistance_rate: f64,
    pub test_count: usize,
    /// Distinct antibiotics tested.
    pub antibiotic_diversity: usize,
    pub factors: Vec<RiskFactor>,
}

/// Points and step index of the first tier `value` strictly exceeds.
fn step(value: f64, tiers: &[Tier]) -> Option<(usize, &Tier)> {
    tiers.iter().enumerate().find(|(_, tier)| value > tier.above)
}

/// Score one entity from its tests. `None` when there are no tests.
pub fn score_records<'a, I>(entity: &str, records: I, tiers: &RiskTiers) -> Option<RiskScore>
where
    I: IntoIterator<Item = &'a TestRecord>,
{
    let mut counts = ResultCounts::default();
    let mut antibiotics: BTreeSet<&str> = BTreeSet::new();
    for record in records {
        counts.add(record.result);
        antibiotics.insert(record.antibiotic.as_str());
    }
    if counts.total == 0 {
        return None;
    }

    let resistance_rate = counts.percent_resistant();
    let mut score = 0;
    let mut factors = Vec::new();

    if let Some((i, tier)) = step(resistance_rate, &tiers.resistance_rate) {
        score += tier.points;
        factors.push(RiskFactor::ResistanceRate {
            step: i,
            above: tier.above,
        });
    }
    if let Some((i, tier)) = step(counts.total as f64, &tiers.volume) {
        score += tier.points;
        if i == 0 {
            factors.push(RiskFactor::DataVolume { above: tier.above });
        }
    }
    if let Some((i, tier)) = step(antibiotics.len() as f64, &tiers.diversity) {
        score += tier.points;
        if i == 0 {
            factors.push(RiskFactor::AntibioticDiversity);
        }
    }

    let score = score.min(MAX_SCORE);
    Some(RiskScore {
        entity: entity.to_string(),
        score,
        level: RiskLevel::from_score(score, tiers),
        resistance_rate,
        test_count: counts.total,
        antibiotic_diversity: antibiotics.len(),
        factors,
    })
}

/// Score a single organism against the whole test table.
pub fn score_organism(
    tests: &[TestRecord],
    organism: &str,
    config: &AnalyticsConfig,
) -> Option<RiskScore> {
    score_records(
        organism,
        tests.iter().filter(|t| t.organism == organism),
        &config.risk,
    )
}

fn score_groups(groups: HashMap<String, Vec<&TestRecord>>, tiers: &RiskTiers) -> Vec<RiskScore> {
    let mut scores: Vec<RiskScore> = groups
        .into_par_iter()
        .filter_map(|(entity, records)| score_records(&entity, records, tiers))
        .collect();
    scores.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.entity.cmp(&b.entity)));
    scores
}

/// Score every distinct entity under `key`, highest score first.
///
/// Tests that cannot be placed under the key are not scored.
pub fn score_entities(
    dataset: &Dataset,
    key: GroupingKey,
    config: &AnalyticsConfig,
) -> Vec<RiskScore> {
    let mut groups: HashMap<String, Vec<&TestRecord>> = HashMap::new();
    for record in dataset.tests() {
        if let Some(entity) = key.value_of(record, dataset) {
            groups.entry(entity).or_default().push(record);
        }
    }
    let scores = score_groups(groups, &config.risk);
    log::debug!("Scored {} entities by {}", scores.len(), key.column_name());
    scores
}

/// Organisms whose resistance rate reaches the high-risk threshold, most
/// resistant first.
pub fn high_risk_organisms(tests: &[TestRecord], config: &AnalyticsConfig) -> Vec<RiskScore> {
    let mut groups: HashMap<String, Vec<&TestRecord>> = HashMap::new();
    for record in tests {
        groups.entry(record.organism.clone()).or_default().push(record);
    }
    let mut scores: Vec<RiskScore> = score_groups(groups, &config.risk)
        .into_iter()
        .filter(|s| s.resistance_rate >= config.high_risk_resistance_percent)
        .collect();
    scores.sort_by(|a, b| {
        b.resistance_rate
            .total_cmp(&a.resistance_rate)
            .then_with(|| a.entity.cmp(&b.entity))
    });
    scores
}

pub fn to_frame(rows: &[RiskScore]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Column::new(
            risk::ENTITY.into(),
            rows.iter().map(|r| r.entity.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            risk::RISK_SCORE.into(),
            rows.iter().map(|r| r.score).collect::<Vec<_>>(),
        ),
        Column::new(
            risk::RISK_LEVEL.into(),
            rows.iter().map(|r| r.level.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            risk::RESISTANCE_RATE.into(),
            rows.iter().map(|r| r.resistance_rate).collect::<Vec<_>>(),
        ),
        Column::new(
            risk::TEST_COUNT.into(),
            rows.iter().map(|r| r.test_count as u64).collect::<Vec<_>>(),
        ),
        Column::new(
            risk::ANTIBIOTIC_DIVERSITY.into(),
            rows.iter().map(|r| r.antibiotic_diversity as u64).collect::<Vec<_>>(),
        ),
        Column::new(
            risk::RISK_FACTORS.into(),
            rows.iter()
                .map(|r| {
                    r.factors
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; ")
                })
                .collect::<Vec<_>>(),
        ),
    ])
}
