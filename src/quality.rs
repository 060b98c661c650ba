//! Data Quality Assessor and surveillance KPIs.
//!
//! Quality metrics caveat the other outputs; they never block them.

use std::collections::HashSet;
use std::fmt;

use chrono::{Duration, NaiveDate};
use serde::{Serialize, Serializer};

use crate::dataset::Dataset;

/// Below this share of samples with coordinates, geography is flagged.
pub const MIN_COORDINATE_COVERAGE: f64 = 0.5;
/// Below this share of dated tests, dates are flagged.
pub const MIN_DATE_COVERAGE: f64 = 0.8;
/// Look-back for the recent-activity KPI.
pub const KPI_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QualityIssue {
    LowGeographicCoverage,
    MissingTestDates,
    UnlinkedTests { count: usize },
    RejectedRows { samples: usize, tests: usize },
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowGeographicCoverage => f.write_str("Low geographic data coverage"),
            Self::MissingTestDates => f.write_str("Missing test dates"),
            Self::UnlinkedTests { count } => write!(f, "{count} tests reference unknown samples"),
            Self::RejectedRows { samples, tests } => {
                write!(f, "{samples} sample rows and {tests} test rows were rejected on load")
            }
        }
    }
}

impl Serialize for QualityIssue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQualityReport {
    pub total_samples: usize,
    pub total_tests: usize,
    pub samples_with_coordinates: usize,
    pub tests_with_dates: usize,
    pub tests_linked_to_samples: usize,
    /// Fractions in 0..=1; zero when the underlying table is empty.
    pub coordinate_coverage: f64,
    pub date_coverage: f64,
    pub sample_link_coverage: f64,
    pub tests_per_sample: f64,
    pub distinct_organisms: usize,
    pub distinct_antibiotics: usize,
    pub rejected_samples: usize,
    pub rejected_tests: usize,
    /// Mean of the coverage fractions available for the non-empty tables.
    pub completeness_score: f64,
    pub issues: Vec<QualityIssue>,
}

fn fraction(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> usize {
    values.collect::<HashSet<_>>().len()
}

pub fn assess_data_quality(dataset: &Dataset) -> DataQualityReport {
    let samples = dataset.samples();
    let tests = dataset.tests();

    let samples_with_coordinates = samples.iter().filter(|s| s.has_valid_coordinates()).count();
    let tests_with_dates = tests.iter().filter(|t| t.test_date.is_some()).count();
    let tests_linked_to_samples = tests.iter().filter(|t| dataset.sample_of(t).is_some()).count();
    let distinct_organisms = distinct(tests.iter().map(|t| t.organism.as_str()));
    let distinct_antibiotics = distinct(tests.iter().map(|t| t.antibiotic.as_str()));

    let coordinate_coverage = fraction(samples_with_coordinates, samples.len());
    let date_coverage = fraction(tests_with_dates, tests.len());

    let mut components = Vec::with_capacity(2);
    let mut issues = Vec::new();
    if !samples.is_empty() {
        components.push(coordinate_coverage);
        if coordinate_coverage < MIN_COORDINATE_COVERAGE {
            issues.push(QualityIssue::LowGeographicCoverage);
        }
    }
    if !tests.is_empty() {
        components.push(date_coverage);
        if date_coverage < MIN_DATE_COVERAGE {
            issues.push(QualityIssue::MissingTestDates);
        }
    }
    let unlinked = tests.len() - tests_linked_to_samples;
    if unlinked > 0 && !samples.is_empty() {
        issues.push(QualityIssue::UnlinkedTests { count: unlinked });
    }
    if dataset.rejected_samples() > 0 || dataset.rejected_tests() > 0 {
        issues.push(QualityIssue::RejectedRows {
            samples: dataset.rejected_samples(),
            tests: dataset.rejected_tests(),
        });
    }
    let completeness_score = if components.is_empty() {
        0.0
    } else {
        components.iter().sum::<f64>() / components.len() as f64
    };

    for issue in &issues {
        log::warn!("Data quality: {issue}");
    }

    DataQualityReport {
        total_samples: samples.len(),
        total_tests: tests.len(),
        samples_with_coordinates,
        tests_with_dates,
        tests_linked_to_samples,
        coordinate_coverage,
        date_coverage,
        sample_link_coverage: fraction(tests_linked_to_samples, tests.len()),
        tests_per_sample: fraction(tests.len(), samples.len()),
        distinct_organisms,
        distinct_antibiotics,
        rejected_samples: dataset.rejected_samples(),
        rejected_tests: dataset.rejected_tests(),
        completeness_score,
        issues,
    }
}

// ── KPIs ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestingActivity {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveillanceKpis {
    pub total_samples: usize,
    pub total_tests: usize,
    pub tests_per_sample: f64,
    pub organisms_identified: usize,
    pub antibiotics_tested: usize,
    /// Tests dated within the 30 days up to and including `as_of`.
    pub recent_tests: usize,
    pub testing_activity: TestingActivity,
    /// Percent of samples with usable coordinates.
    pub geographic_coverage_percent: f64,
}

/// Headline indicators as of a given day. `None` unless both tables have rows.
pub fn surveillance_kpis(dataset: &Dataset, as_of: NaiveDate) -> Option<SurveillanceKpis> {
    let samples = dataset.samples();
    let tests = dataset.tests();
    if samples.is_empty() || tests.is_empty() {
        return None;
    }

    let window_start = Duration::try_days(KPI_WINDOW_DAYS)
        .and_then(|window| as_of.checked_sub_signed(window))
        .unwrap_or(NaiveDate::MIN);
    let recent_tests = tests
        .iter()
        .filter(|t| t.test_date.is_some_and(|d| d >= window_start && d <= as_of))
        .count();
    let with_coordinates = samples.iter().filter(|s| s.has_valid_coordinates()).count();

    Some(SurveillanceKpis {
        total_samples: samples.len(),
        total_tests: tests.len(),
        tests_per_sample: fraction(tests.len(), samples.len()),
        organisms_identified: distinct(tests.iter().map(|t| t.organism.as_str())),
        antibiotics_tested: distinct(tests.iter().map(|t| t.antibiotic.as_str())),
        recent_tests,
        testing_activity: if recent_tests > 0 {
            TestingActivity::Active
        } else {
            TestingActivity::Inactive
        },
        geographic_coverage_percent: fraction(with_coordinates, samples.len()) * 100.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{date, dated, resistant, sample, susceptible};
    use crate::model::SourceCategory;

    fn dataset() -> Dataset {
        let samples = vec![
            sample("S1", "Ashanti", "Kumasi", SourceCategory::Food).with_coordinates(6.69, -1.62),
            sample("S2", "Volta", "Ho", SourceCategory::Environment),
            sample("S3", "Volta", "Ho", SourceCategory::Environment),
        ];
        let tests = vec![
            dated(resistant("S1", "I1", "E. coli", "Ampicillin"), 2024, 3, 1),
            dated(susceptible("S1", "I1", "E. coli", "Gentamicin"), 2024, 3, 20),
            resistant("S2", "I2", "Salmonella", "Ampicillin"),
            dated(susceptible("S9", "I3", "Salmonella", "Tetracycline"), 2024, 1, 2),
        ];
        Dataset::new(samples, tests)
    }

    #[test]
    fn test_quality_metrics() {
        let report = assess_data_quality(&dataset());
        assert_eq!(report.samples_with_coordinates, 1);
        assert_eq!(report.tests_with_dates, 3);
        assert_eq!(report.tests_linked_to_samples, 3);
        assert_eq!(report.distinct_organisms, 2);
        assert_eq!(report.distinct_antibiotics, 3);
        assert!((report.tests_per_sample - 4.0 / 3.0).abs() < 1e-12);
        let expected = (1.0 / 3.0 + 0.75) / 2.0;
        assert!((report.completeness_score - expected).abs() < 1e-12);
        assert_eq!(
            report.issues,
            vec![
                QualityIssue::LowGeographicCoverage,
                QualityIssue::MissingTestDates,
                QualityIssue::UnlinkedTests { count: 1 },
            ]
        );
        assert_eq!(report.issues[0].to_string(), "Low geographic data coverage");
    }

    #[test]
    fn test_empty_dataset_scores_zero() {
        let report = assess_data_quality(&Dataset::default());
        assert_eq!(report.completeness_score, 0.0);
        assert_eq!(report.tests_per_sample, 0.0);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_kpis() {
        let kpis = surveillance_kpis(&dataset(), date(2024, 3, 25)).unwrap();
        assert_eq!(kpis.total_samples, 3);
        assert_eq!(kpis.recent_tests, 2);
        assert_eq!(kpis.testing_activity, TestingActivity::Active);
        assert!((kpis.geographic_coverage_percent - 100.0 / 3.0).abs() < 1e-9);

        let later = surveillance_kpis(&dataset(), date(2025, 1, 1)).unwrap();
        assert_eq!(later.testing_activity, TestingActivity::Inactive);

        assert!(surveillance_kpis(&Dataset::default(), date(2024, 1, 1)).is_none());
    }

    #[test]
    fn test_kpis_at_earliest_date() {
        let kpis = surveillance_kpis(&dataset(), NaiveDate::MIN).unwrap();
        assert_eq!(kpis.recent_tests, 0);
        assert_eq!(kpis.testing_activity, TestingActivity::Inactive);
    }
}
