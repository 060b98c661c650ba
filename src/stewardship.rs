//! Antibiotic stewardship: usage recommendations and resistance burden.

use std::collections::BTreeMap;
use std::fmt;

use polars::prelude::*;
use serde::Serialize;

use crate::aggregation::{overall_statistics, ResultCounts};
use crate::config::{AnalyticsConfig, StewardshipTiers};
use crate::dataset::Dataset;
use crate::model::TestRecord;
use crate::schema::stewardship;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Preferred,
    Good,
    Caution,
    Avoid,
}

impl Recommendation {
    /// Tier for a susceptibility percentage.
    pub fn for_susceptibility(percent: f64, tiers: &StewardshipTiers) -> Self {
        if percent > tiers.preferred_above {
            Self::Preferred
        } else if percent > tiers.good_above {
            Self::Good
        } else if percent > tiers.caution_above {
            Self::Caution
        } else {
            Self::Avoid
        }
    }

    /// 1 (use first) to 4 (avoid).
    pub fn priority(&self) -> u8 {
        match self {
            Self::Preferred => 1,
            Self::Good => 2,
            Self::Caution => 3,
            Self::Avoid => 4,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Preferred => "PREFERRED - Excellent susceptibility",
            Self::Good => "GOOD - Acceptable for use",
            Self::Caution => "CAUTION - Declining efficacy",
            Self::Avoid => "AVOID - Poor efficacy",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AntibioticRecommendation {
    pub antibiotic: String,
    pub susceptibility_rate: f64,
    pub tests: usize,
    pub recommendation: Recommendation,
    pub priority: u8,
}

/// Rank antibiotics with at least `recommendation_min_tests` results by
/// susceptibility.
pub fn antibiotic_recommendations(
    tests: &[TestRecord],
    config: &AnalyticsConfig,
) -> Vec<AntibioticRecommendation> {
    let mut by_antibiotic: BTreeMap<&str, ResultCounts> = BTreeMap::new();
    for record in tests {
        by_antibiotic
            .entry(record.antibiotic.as_str())
            .or_default()
            .add(record.result);
    }

    let mut rows: Vec<AntibioticRecommendation> = by_antibiotic
        .into_iter()
        .filter(|(_, counts)| counts.total >= config.recommendation_min_tests)
        .map(|(antibiotic, counts)| {
            let rate = counts.percent_susceptible();
            let recommendation = Recommendation::for_susceptibility(rate, &config.stewardship);
            AntibioticRecommendation {
                antibiotic: antibiotic.to_string(),
                susceptibility_rate: rate,
                tests: counts.total,
                recommendation,
                priority: recommendation.priority(),
            }
        })
        .collect();
    rows.sort_by(|a, b| b.susceptibility_rate.total_cmp(&a.susceptibility_rate));
    rows
}

pub fn recommendations_to_frame(rows: &[AntibioticRecommendation]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Column::new(
            stewardship::ANTIBIOTIC.into(),
            rows.iter().map(|r| r.antibiotic.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            stewardship::SUSCEPTIBILITY_RATE.into(),
            rows.iter().map(|r| r.susceptibility_rate).collect::<Vec<_>>(),
        ),
        Column::new(
            stewardship::TESTS.into(),
            rows.iter().map(|r| r.tests as u64).collect::<Vec<_>>(),
        ),
        Column::new(
            stewardship::RECOMMENDATION.into(),
            rows.iter().map(|r| r.recommendation.to_string()).collect::<Vec<_>>(),
        ),
        Column::new(
            stewardship::PRIORITY.into(),
            rows.iter().map(|r| r.priority as u32).collect::<Vec<_>>(),
        ),
    ])
}

// ── Burden ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PublicHealthImpact {
    Low,
    Moderate,
    High,
    Critical,
}

impl PublicHealthImpact {
    pub fn for_resistance(percent: f64, tiers: &StewardshipTiers) -> Self {
        if percent > tiers.critical_impact_above {
            Self::Critical
        } else if percent > tiers.high_impact_above {
            Self::High
        } else if percent > tiers.moderate_impact_above {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for PublicHealthImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Critical => "CRITICAL - Urgent intervention needed",
            Self::High => "HIGH - Enhanced surveillance recommended",
            Self::Moderate => "MODERATE - Continued monitoring",
            Self::Low => "LOW - Maintain current practices",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResistanceBurden {
    pub total_tests: usize,
    pub resistant_tests: usize,
    pub overall_resistance_rate: f64,
    /// Keyed by source category; tests without a categorised sample are
    /// left out of this breakdown.
    pub resistance_by_category: BTreeMap<String, f64>,
    pub impact: PublicHealthImpact,
}

/// Public-health burden of resistance. `None` unless both tables have rows.
pub fn resistance_burden(dataset: &Dataset, config: &AnalyticsConfig) -> Option<ResistanceBurden> {
    if dataset.samples().is_empty() {
        return None;
    }
    let overall = overall_statistics(dataset.tests())?;

    let mut by_category: BTreeMap<String, ResultCounts> = BTreeMap::new();
    for record in dataset.tests() {
        if let Some(category) = dataset.sample_of(record).and_then(|s| s.source_category) {
            by_category
                .entry(category.to_string())
                .or_default()
                .add(record.result);
        }
    }

    Some(ResistanceBurden {
        total_tests: overall.total_tests,
        resistant_tests: overall.resistant,
        overall_resistance_rate: overall.percent_resistant,
        resistance_by_category: by_category
            .into_iter()
            .map(|(category, counts)| (category, counts.percent_resistant()))
            .collect(),
        impact: PublicHealthImpact::for_resistance(overall.percent_resistant, &config.stewardship),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{intermediate, resistant, sample, susceptible};
    use crate::model::SourceCategory;

    #[test]
    fn test_recommendation_tiers() {
        let mut tests = Vec::new();
        for i in 0..10 {
            let isolate = format!("I{i}");
            // Gentamicin 90% S, Ampicillin 50% S, Tetracycline 20% S
            tests.push(if i < 9 {
                susceptible("S", &isolate, "E. coli", "Gentamicin")
            } else {
                resistant("S", &isolate, "E. coli", "Gentamicin")
            });
            tests.push(if i < 5 {
                susceptible("S", &isolate, "E. coli", "Ampicillin")
            } else {
                intermediate("S", &isolate, "E. coli", "Ampicillin")
            });
            tests.push(if i < 2 {
                susceptible("S", &isolate, "E. coli", "Tetracycline")
            } else {
                resistant("S", &isolate, "E. coli", "Tetracycline")
            });
        }
        // below the test floor
        tests.push(susceptible("S", "I0", "E. coli", "Colistin"));

        let rows = antibiotic_recommendations(&tests, &AnalyticsConfig::default());
        let names: Vec<&str> = rows.iter().map(|r| r.antibiotic.as_str()).collect();
        assert_eq!(names, vec!["Gentamicin", "Ampicillin", "Tetracycline"]);
        assert_eq!(rows[0].recommendation, Recommendation::Preferred);
        assert_eq!(rows[0].priority, 1);
        assert_eq!(rows[1].recommendation, Recommendation::Caution);
        assert_eq!(rows[2].recommendation.to_string(), "AVOID - Poor efficacy");
        assert_eq!(rows[2].priority, 4);

        let frame = recommendations_to_frame(&rows).unwrap();
        assert_eq!(frame.height(), 3);
    }

    #[test]
    fn test_burden_by_category() {
        let samples = vec![
            sample("S1", "Ashanti", "Kumasi", SourceCategory::Food),
            sample("S2", "Volta", "Ho", SourceCategory::Environment),
        ];
        let tests = vec![
            resistant("S1", "I1", "E. coli", "Ampicillin"),
            resistant("S1", "I1", "E. coli", "Tetracycline"),
            susceptible("S2", "I2", "E. coli", "Ampicillin"),
            resistant("S2", "I2", "E. coli", "Tetracycline"),
        ];
        let dataset = Dataset::new(samples, tests);
        let burden = resistance_burden(&dataset, &AnalyticsConfig::default()).unwrap();
        assert_eq!(burden.overall_resistance_rate, 75.0);
        assert_eq!(burden.impact, PublicHealthImpact::Critical);
        assert_eq!(burden.resistance_by_category["FOOD"], 100.0);
        assert_eq!(burden.resistance_by_category["ENVIRONMENT"], 50.0);
    }

    #[test]
    fn test_burden_requires_both_tables() {
        let tests = vec![resistant("S1", "I1", "E. coli", "Ampicillin")];
        let config = AnalyticsConfig::default();
        assert!(resistance_burden(&Dataset::new(vec![], tests), &config).is_none());
        let samples = vec![sample("S1", "Ashanti", "Kumasi", SourceCategory::Food)];
        assert!(resistance_burden(&Dataset::new(samples, vec![]), &config).is_none());
        assert_eq!(
            PublicHealthImpact::for_resistance(15.0, &config.stewardship),
            PublicHealthImpact::Low
        );
    }

    #[test]
    fn test_cutoffs_follow_config() {
        let defaults = StewardshipTiers::default();
        assert_eq!(Recommendation::for_susceptibility(85.0, &defaults), Recommendation::Preferred);
        assert_eq!(Recommendation::for_susceptibility(80.0, &defaults), Recommendation::Good);

        let strict = StewardshipTiers {
            preferred_above: 90.0,
            critical_impact_above: 40.0,
            ..StewardshipTiers::default()
        };
        assert_eq!(Recommendation::for_susceptibility(85.0, &strict), Recommendation::Good);
        assert_eq!(
            PublicHealthImpact::for_resistance(45.0, &strict),
            PublicHealthImpact::Critical
        );
        assert_eq!(
            PublicHealthImpact::for_resistance(45.0, &defaults),
            PublicHealthImpact::High
        );
    }
}
