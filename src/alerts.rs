//! Surveillance Alert Generator and emerging-resistance screening.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use serde::Serialize;

use crate::aggregation::{aggregate, overall_statistics, GroupingKey, ResultCounts};
use crate::catalog::DrugClassCatalog;
use crate::config::AnalyticsConfig;
use crate::dataset::Dataset;
use crate::mdr::detect_mdr;
use crate::model::TestRecord;
use crate::schema::alert;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    ResistanceThreshold,
    MdrDetection,
    HighResistanceCombo,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResistanceThreshold => "resistance_threshold",
            Self::MdrDetection => "mdr_detection",
            Self::HighResistanceCombo => "high_resistance_combo",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub severity: Severity,
    pub message: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    /// Set for organism-antibiotic alerts only.
    pub organism: Option<String>,
    pub antibiotic: Option<String>,
    pub resistance_rate: Option<f64>,
    pub tests: Option<usize>,
}

impl Alert {
    fn new(severity: Severity, alert_type: AlertType, message: String) -> Self {
        Self {
            severity,
            message,
            alert_type,
            organism: None,
            antibiotic: None,
            resistance_rate: None,
            tests: None,
        }
    }
}

/// Evaluate every alert rule against the snapshot.
///
/// Rules fire independently and appear in rule order: overall resistance,
/// MDR presence, then one alert per qualifying organism-antibiotic pair in
/// aggregation order.
pub fn generate_alerts(
    dataset: &Dataset,
    catalog: &DrugClassCatalog,
    config: &AnalyticsConfig,
) -> Vec<Alert> {
    let tests = dataset.tests();
    let mut alerts = Vec::new();

    if let Some(overall) = overall_statistics(tests) {
        if overall.percent_resistant > config.overall_resistance_alert_percent {
            alerts.push(Alert::new(
                Severity::High,
                AlertType::ResistanceThreshold,
                format!(
                    "Overall resistance exceeds {}%: {:.1}%",
                    config.overall_resistance_alert_percent, overall.percent_resistant
                ),
            ));
        }
    }

    let mdr = detect_mdr(tests, catalog, config.mdr_class_threshold);
    if !mdr.is_empty() {
        alerts.push(Alert::new(
            Severity::High,
            AlertType::MdrDetection,
            format!("{} multi-drug resistant isolates detected", mdr.len()),
        ));
    }

    let combos = aggregate(dataset, &[GroupingKey::ByOrganism, GroupingKey::ByAntibiotic]);
    for row in combos.iter() {
        if row.total_tests < config.combo_min_tests
            || row.percent_resistant <= config.combo_resistance_alert_percent
        {
            continue;
        }
        let (organism, antibiotic) = (&row.key[0], &row.key[1]);
        alerts.push(Alert {
            organism: Some(organism.clone()),
            antibiotic: Some(antibiotic.clone()),
            resistance_rate: Some(row.percent_resistant),
            tests: Some(row.total_tests),
            ..Alert::new(
                Severity::Medium,
                AlertType::HighResistanceCombo,
                format!(
                    "{organism} shows {:.1}% resistance to {antibiotic}",
                    row.percent_resistant
                ),
            )
        });
    }

    if !alerts.is_empty() {
        log::warn!("{} surveillance alerts raised", alerts.len());
    }
    alerts
}

pub fn alerts_to_frame(rows: &[Alert]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Column::new(
            alert::SEVERITY.into(),
            rows.iter().map(|r| r.severity.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            alert::MESSAGE.into(),
            rows.iter().map(|r| r.message.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            alert::ALERT_TYPE.into(),
            rows.iter().map(|r| r.alert_type.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            alert::ORGANISM.into(),
            rows.iter().map(|r| r.organism.as_deref()).collect::<Vec<_>>(),
        ),
        Column::new(
            alert::ANTIBIOTIC.into(),
            rows.iter().map(|r| r.antibiotic.as_deref()).collect::<Vec<_>>(),
        ),
        Column::new(
            alert::RESISTANCE_RATE.into(),
            rows.iter().map(|r| r.resistance_rate).collect::<Vec<_>>(),
        ),
        Column::new(
            alert::TESTS.into(),
            rows.iter().map(|r| r.tests.map(|t| t as u64)).collect::<Vec<_>>(),
        ),
    ])
}

// ── Emerging resistance ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmergingResistance {
    pub organism: String,
    pub antibiotic: String,
    pub resistance_rate: f64,
    pub tests: usize,
    pub severity: Severity,
}

/// Organism-antibiotic pairs with high resistance in the most recent window.
///
/// The window ends at the latest test date in the data and spans
/// `emerging_window_days` before it. Most resistant first.
pub fn emerging_resistance(
    tests: &[TestRecord],
    config: &AnalyticsConfig,
) -> Vec<EmergingResistance> {
    let Some(latest) = tests.iter().filter_map(|t| t.test_date).max() else {
        return Vec::new();
    };
    let cutoff = Duration::try_days(config.emerging_window_days)
        .and_then(|window| latest.checked_sub_signed(window))
        .unwrap_or(NaiveDate::MIN);

    let mut combos: BTreeMap<(&str, &str), ResultCounts> = BTreeMap::new();
    for record in tests {
        if record.test_date.is_some_and(|d| d >= cutoff) {
            combos
                .entry((record.organism.as_str(), record.antibiotic.as_str()))
                .or_default()
                .add(record.result);
        }
    }

    let mut emerging: Vec<EmergingResistance> = combos
        .into_iter()
        .filter(|(_, counts)| {
            counts.total >= config.emerging_min_tests
                && counts.percent_resistant() > config.emerging_resistance_percent
        })
        .map(|((organism, antibiotic), counts)| {
            let rate = counts.percent_resistant();
            EmergingResistance {
                organism: organism.to_string(),
                antibiotic: antibiotic.to_string(),
                resistance_rate: rate,
                tests: counts.total,
                severity: if rate > config.emerging_critical_percent {
                    Severity::Critical
                } else {
                    Severity::High
                },
            }
        })
        .collect();
    // combos were visited in key order, so a stable sort keeps ties by name
    emerging.sort_by(|a, b| b.resistance_rate.total_cmp(&a.resistance_rate));
    emerging
}

pub fn emerging_to_frame(rows: &[EmergingResistance]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Column::new(
            alert::ORGANISM.into(),
            rows.iter().map(|r| r.organism.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            alert::ANTIBIOTIC.into(),
            rows.iter().map(|r| r.antibiotic.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            alert::RESISTANCE_RATE.into(),
            rows.iter().map(|r| r.resistance_rate).collect::<Vec<_>>(),
        ),
        Column::new(
            alert::TESTS.into(),
            rows.iter().map(|r| r.tests as u64).collect::<Vec<_>>(),
        ),
        Column::new(
            alert::SEVERITY.into(),
            rows.iter().map(|r| r.severity.as_str()).collect::<Vec<_>>(),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{dated, resistant, resistant_isolates, susceptible};

    fn mixed(resistant_n: usize, total: usize) -> Vec<TestRecord> {
        (0..total)
            .map(|i| {
                let isolate = format!("I{i}");
                // spread over organisms so no single combo reaches the test floor
                let organism = format!("Org{}", i % 20);
                if i < resistant_n {
                    resistant("S", &isolate, &organism, "Ampicillin")
                } else {
                    susceptible("S", &isolate, &organism, "Ampicillin")
                }
            })
            .collect()
    }

    fn types(alerts: &[Alert]) -> Vec<AlertType> {
        alerts.iter().map(|a| a.alert_type).collect()
    }

    #[test]
    fn test_overall_threshold_is_strict() {
        let config = AnalyticsConfig::default();
        let catalog = DrugClassCatalog::builtin();

        let above = generate_alerts(&Dataset::new(vec![], mixed(32, 100)), &catalog, &config);
        assert_eq!(types(&above), vec![AlertType::ResistanceThreshold]);
        assert_eq!(above[0].severity, Severity::High);
        assert_eq!(above[0].message, "Overall resistance exceeds 30%: 32.0%");

        let at = generate_alerts(&Dataset::new(vec![], mixed(30, 100)), &catalog, &config);
        assert!(at.is_empty());
        let below = generate_alerts(&Dataset::new(vec![], mixed(25, 100)), &catalog, &config);
        assert!(below.is_empty());
    }

    #[test]
    fn test_mdr_alert() {
        let mut tests = resistant_isolates(
            "E. coli",
            &[("X", &["Ampicillin", "Tetracycline", "Gentamicin"])],
        );
        tests.extend(mixed(0, 20));
        let alerts = generate_alerts(
            &Dataset::new(vec![], tests),
            &DrugClassCatalog::builtin(),
            &AnalyticsConfig::default(),
        );
        assert_eq!(types(&alerts), vec![AlertType::MdrDetection]);
        assert_eq!(alerts[0].message, "1 multi-drug resistant isolates detected");
    }

    #[test]
    fn test_one_alert_per_combo() {
        let mut tests = Vec::new();
        for (organism, antibiotic) in [("E. coli", "Ampicillin"), ("Salmonella", "Tetracycline")] {
            for i in 0..10 {
                let isolate = format!("{organism}-{i}");
                tests.push(if i < 6 {
                    resistant("S", &isolate, organism, antibiotic)
                } else {
                    susceptible("S", &isolate, organism, antibiotic)
                });
            }
        }
        // plenty of susceptible tests keep the overall rate low
        tests.extend(mixed(0, 60));
        // 9 tests at 100% stays under the test floor
        for i in 0..9 {
            tests.push(resistant("S", &format!("K{i}"), "Klebsiella", "Colistin"));
        }

        let alerts = generate_alerts(
            &Dataset::new(vec![], tests),
            &DrugClassCatalog::builtin(),
            &AnalyticsConfig::default(),
        );
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|a| a.alert_type == AlertType::HighResistanceCombo));
        assert!(alerts.iter().all(|a| a.severity == Severity::Medium));
        assert_eq!(alerts[0].message, "E. coli shows 60.0% resistance to Ampicillin");
        assert_eq!(alerts[1].organism.as_deref(), Some("Salmonella"));

        let frame = alerts_to_frame(&alerts).unwrap();
        assert_eq!(frame.height(), 2);
    }

    #[test]
    fn test_empty_input_raises_nothing() {
        let alerts = generate_alerts(
            &Dataset::default(),
            &DrugClassCatalog::builtin(),
            &AnalyticsConfig::default(),
        );
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_emerging_resistance_window() {
        let mut tests = Vec::new();
        // recent: 5 of 5 resistant
        for day in 1..=5 {
            let record = resistant("S", &format!("R{day}"), "E. coli", "Ciprofloxacin");
            tests.push(dated(record, 2024, 6, day));
        }
        // recent: 4 of 6 resistant (66.7%)
        for day in 1..=6 {
            let record = if day <= 4 {
                resistant("S", &format!("T{day}"), "Salmonella", "Tetracycline")
            } else {
                susceptible("S", &format!("T{day}"), "Salmonella", "Tetracycline")
            };
            tests.push(dated(record, 2024, 5, day));
        }
        // old: outside the 90-day window
        for day in 1..=5 {
            let record = resistant("S", &format!("O{day}"), "Klebsiella", "Colistin");
            tests.push(dated(record, 2023, 1, day));
        }

        let emerging = emerging_resistance(&tests, &AnalyticsConfig::default());
        assert_eq!(emerging.len(), 2);
        assert_eq!(emerging[0].organism, "E. coli");
        assert_eq!(emerging[0].severity, Severity::Critical);
        assert_eq!(emerging[1].severity, Severity::High);
        assert_eq!(emerging[1].tests, 6);

        assert!(emerging_resistance(&[], &AnalyticsConfig::default()).is_empty());
        let frame = emerging_to_frame(&emerging).unwrap();
        assert_eq!(frame.height(), 2);
    }

    #[test]
    fn test_oversized_window_covers_all_history() {
        let config = AnalyticsConfig {
            emerging_window_days: i64::MAX,
            ..AnalyticsConfig::default()
        };
        let tests: Vec<TestRecord> = (1..=5)
            .map(|year| {
                let record = resistant("S", &format!("R{year}"), "E. coli", "Colistin");
                dated(record, 1990 + year, 1, 1)
            })
            .collect();
        let emerging = emerging_resistance(&tests, &config);
        assert_eq!(emerging.len(), 1);
        assert_eq!(emerging[0].tests, 5);
    }
}
