//! MDR Detector: isolates resistant across at least N distinct drug classes.

use polars::prelude::*;
use serde::Serialize;

use crate::catalog::DrugClassCatalog;
use crate::dataset::group_by_isolate;
use crate::model::TestRecord;
use crate::schema::isolate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MdrIsolate {
    pub isolate_id: String,
    pub organism: String,
    pub sample_id: String,
    /// Number of distinct drug classes with at least one resistant result.
    pub resistant_drug_classes: usize,
    /// The classes themselves, sorted.
    pub drug_classes: Vec<String>,
}

/// Flag every isolate resistant to `threshold` or more distinct classes.
///
/// Only resistant tests are grouped. The result contains every qualifying
/// isolate, listed by `isolate_id`.
pub fn detect_mdr(
    tests: &[TestRecord],
    catalog: &DrugClassCatalog,
    threshold: usize,
) -> Vec<MdrIsolate> {
    let resistant = tests.iter().filter(|t| t.is_resistant());

    let flagged: Vec<MdrIsolate> = group_by_isolate(resistant)
        .into_iter()
        .filter_map(|(isolate_id, records)| {
            let classes = catalog.distinct_classes(records.iter().map(|r| r.antibiotic.as_str()));
            if classes.len() < threshold {
                return None;
            }
            let first = records[0];
            Some(MdrIsolate {
                isolate_id: isolate_id.to_string(),
                organism: first.organism.clone(),
                sample_id: first.sample_id.clone(),
                resistant_drug_classes: classes.len(),
                drug_classes: classes.into_iter().map(str::to_string).collect(),
            })
        })
        .collect();

    log::debug!("{} MDR isolates at threshold {threshold}", flagged.len());
    flagged
}

pub fn to_frame(rows: &[MdrIsolate]) -> PolarsResult<DataFrame> {
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
            isolate::SAMPLE_ID.into(),
            rows.iter().map(|r| r.sample_id.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            isolate::RESISTANT_DRUG_CLASSES.into(),
            rows.iter().map(|r| r.resistant_drug_classes as u64).collect::<Vec<_>>(),
        ),
        Column::new(
            isolate::DRUG_CLASSES.into(),
            rows.iter().map(|r| r.drug_classes.join(", ")).collect::<Vec<_>>(),
        ),
    ])
}
