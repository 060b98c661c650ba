//! Co-Resistance Pattern Miner and within-class cross-resistance.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use polars::prelude::*;
use serde::Serialize;

use crate::catalog::DrugClassCatalog;
use crate::dataset::group_by_isolate;
use crate::model::TestRecord;
use crate::schema::{isolate, pattern};

/// Separator used when rendering an antibiotic combination.
pub const SIGNATURE_SEPARATOR: &str = ", ";

/// A recurring set of antibiotics to which the same isolates are resistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoResistancePattern {
    /// Sorted, distinct.
    pub antibiotics: Vec<String>,
    /// `antibiotics` joined, e.g. `"Ampicillin, Tetracycline"`.
    pub signature: String,
    /// Isolates carrying exactly this resistant set.
    pub count: usize,
}

/// Count resistant-antibiotic signatures across isolates.
///
/// An isolate contributes one signature: the sorted set of antibiotics it
/// is resistant to. Isolates resistant to fewer than two antibiotics carry
/// no pattern. Signatures seen fewer than `min_occurrence` times are
/// dropped. Ordered by count descending, then signature.
pub fn co_resistance_patterns(
    tests: &[TestRecord],
    min_occurrence: usize,
) -> Vec<CoResistancePattern> {
    let resistant = tests.iter().filter(|t| t.is_resistant());

    let mut tally: HashMap<Vec<&str>, usize> = HashMap::new();
    for records in group_by_isolate(resistant).values() {
        let set: BTreeSet<&str> = records.iter().map(|r| r.antibiotic.as_str()).collect();
        if set.len() < 2 {
            continue;
        }
        *tally.entry(set.into_iter().collect()).or_default() += 1;
    }

    let mut patterns: Vec<CoResistancePattern> = tally
        .into_iter()
        .filter(|(_, count)| *count >= min_occurrence)
        .map(|(antibiotics, count)| CoResistancePattern {
            signature: antibiotics.join(SIGNATURE_SEPARATOR),
            antibiotics: antibiotics.into_iter().map(str::to_string).collect(),
            count,
        })
        .collect();
    patterns.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.signature.cmp(&b.signature)));

    log::debug!(
        "{} co-resistance patterns with at least {min_occurrence} isolates",
        patterns.len()
    );
    patterns
}

pub fn patterns_to_frame(rows: &[CoResistancePattern]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Column::new(
            pattern::ANTIBIOTIC_COMBINATION.into(),
            rows.iter().map(|r| r.signature.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            pattern::ANTIBIOTIC_COUNT.into(),
            rows.iter().map(|r| r.antibiotics.len() as u64).collect::<Vec<_>>(),
        ),
        Column::new(
            pattern::COUNT.into(),
            rows.iter().map(|r| r.count as u64).collect::<Vec<_>>(),
        ),
    ])
}

// ── Cross-resistance ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CrossResistanceLevel {
    /// Every tested member of the class was resistant.
    High,
    Moderate,
}

impl fmt::Display for CrossResistanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::High => "High",
            Self::Moderate => "Moderate",
        })
    }
}

/// Resistance to two or more members of the same drug class in one isolate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossResistance {
    pub isolate_id: String,
    pub organism: String,
    pub drug_class: String,
    pub resistant_antibiotics: Vec<String>,
    pub resistant_count: usize,
    pub tested_count: usize,
    pub level: CrossResistanceLevel,
}

#[derive(Default)]
struct ClassTally<'a> {
    tested: BTreeSet<&'a str>,
    resistant: BTreeSet<&'a str>,
}

/// Screen every isolate for within-class cross-resistance.
///
/// Ordered by isolate, then drug class.
pub fn cross_resistance(tests: &[TestRecord], catalog: &DrugClassCatalog) -> Vec<CrossResistance> {
    let mut rows = Vec::new();
    for (isolate_id, records) in group_by_isolate(tests) {
        let mut by_class: BTreeMap<&str, ClassTally> = BTreeMap::new();
        for record in &records {
            for class in catalog.classes_of(&record.antibiotic) {
                let tally = by_class.entry(class).or_default();
                tally.tested.insert(record.antibiotic.as_str());
                if record.is_resistant() {
                    tally.resistant.insert(record.antibiotic.as_str());
                }
            }
        }

        for (class, tally) in by_class {
            if tally.tested.len() < 2 || tally.resistant.len() < 2 {
                continue;
            }
            let level = if tally.resistant.len() == tally.tested.len() {
                CrossResistanceLevel::High
            } else {
                CrossResistanceLevel::Moderate
            };
            rows.push(CrossResistance {
                isolate_id: isolate_id.to_string(),
                organism: records[0].organism.clone(),
                drug_class: class.to_string(),
                resistant_count: tally.resistant.len(),
                tested_count: tally.tested.len(),
                resistant_antibiotics: tally.resistant.into_iter().map(str::to_string).collect(),
                level,
            });
        }
    }
    log::debug!("{} within-class cross-resistance findings", rows.len());
    rows
}

pub fn cross_resistance_to_frame(rows: &[CrossResistance]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Column::new(
            isolate::ISOLATE_ID.into(),
            rows.iter().map(|r| r.isolate_id.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            isolate::ORGANISM.into(),
            rows.iter().map(|r| r.organism.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            isolate::DRUG_CLASS.into(),
            rows.iter().map(|r| r.drug_class.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            isolate::RESISTANT_ANTIBIOTICS.into(),
            rows.iter()
                .map(|r| r.resistant_antibiotics.join(SIGNATURE_SEPARATOR))
                .collect::<Vec<_>>(),
        ),
        Column::new(
            isolate::RESISTANT_COUNT.into(),
            rows.iter().map(|r| r.resistant_count as u64).collect::<Vec<_>>(),
        ),
        Column::new(
            isolate::TESTED_COUNT.into(),
            rows.iter().map(|r| r.tested_count as u64).collect::<Vec<_>>(),
        ),
        Column::new(
            isolate::LEVEL.into(),
            rows.iter().map(|r| r.level.to_string()).collect::<Vec<_>>(),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{resistant, resistant_isolates, susceptible};

    #[test]
    fn test_shared_signature_is_counted() {
        let tests = resistant_isolates(
            "E. coli",
            &[
                ("X", &["Tetracycline", "Ampicillin"]),
                ("Y", &["Ampicillin", "Tetracycline"]),
                ("Z", &["Ampicillin", "Tetracycline", "Gentamicin"]),
            ],
        );
        let patterns = co_resistance_patterns(&tests, 2);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].signature, "Ampicillin, Tetracycline");
        assert_eq!(patterns[0].count, 2);
    }

    #[test]
    fn test_single_antibiotic_is_not_a_pattern() {
        let tests =
            resistant_isolates("E. coli", &[("X", &["Ampicillin"]), ("Y", &["Ampicillin"])]);
        assert!(co_resistance_patterns(&tests, 1).is_empty());
    }

    #[test]
    fn test_order_and_count_bound() {
        let tests = resistant_isolates(
            "Salmonella",
            &[
                ("A", &["Ampicillin", "Colistin"]),
                ("B", &["Ampicillin", "Tetracycline"]),
                ("C", &["Ampicillin", "Tetracycline"]),
                ("D", &["Ampicillin", "Colistin"]),
                ("E", &["Ampicillin", "Colistin"]),
                ("F", &["Ampicillin"]),
            ],
        );
        let patterns = co_resistance_patterns(&tests, 1);
        let signatures: Vec<&str> = patterns.iter().map(|p| p.signature.as_str()).collect();
        assert_eq!(signatures, vec!["Ampicillin, Colistin", "Ampicillin, Tetracycline"]);
        let total: usize = patterns.iter().map(|p| p.count).sum();
        assert!(total <= 5);
        assert!(patterns.iter().all(|p| p.antibiotics.len() >= 2));

        let frame = patterns_to_frame(&patterns).unwrap();
        assert_eq!(frame.height(), 2);
    }

    #[test]
    fn test_min_occurrence_filters() {
        let tests = resistant_isolates(
            "E. coli",
            &[("X", &["Ampicillin", "Tetracycline"]), ("Y", &["Ampicillin", "Tetracycline"])],
        );
        assert!(co_resistance_patterns(&tests, 3).is_empty());
        assert!(co_resistance_patterns(&[], 1).is_empty());
    }

    #[test]
    fn test_cross_resistance_levels() {
        let catalog = DrugClassCatalog::builtin();
        let tests = vec![
            resistant("S1", "I1", "E. coli", "Ampicillin"),
            resistant("S1", "I1", "E. coli", "Ceftriaxone"),
            susceptible("S1", "I1", "E. coli", "Cefepime"),
            resistant("S1", "I1", "E. coli", "Ciprofloxacin"),
            resistant("S1", "I1", "E. coli", "Levofloxacin"),
            resistant("S2", "I2", "E. coli", "Gentamicin"),
            susceptible("S2", "I2", "E. coli", "Amikacin"),
        ];
        let rows = cross_resistance(&tests, &catalog);
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].drug_class, "Beta-lactams");
        assert_eq!(rows[0].resistant_count, 2);
        assert_eq!(rows[0].tested_count, 3);
        assert_eq!(rows[0].level, CrossResistanceLevel::Moderate);

        assert_eq!(rows[1].drug_class, "Quinolones");
        assert_eq!(rows[1].level, CrossResistanceLevel::High);
        assert_eq!(rows[1].resistant_antibiotics, vec!["Ciprofloxacin", "Levofloxacin"]);

        let frame = cross_resistance_to_frame(&rows).unwrap();
        assert_eq!(frame.height(), 2);
    }
}
