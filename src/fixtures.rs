//! Record builders shared by unit tests.

use chrono::NaiveDate;

use crate::model::{SampleRecord, SourceCategory, SusceptibilityResult, TestRecord};

pub fn record(
    sample_id: &str,
    isolate_id: &str,
    organism: &str,
    antibiotic: &str,
    result: SusceptibilityResult,
) -> TestRecord {
    TestRecord::new(sample_id, isolate_id, organism, antibiotic, result)
}

pub fn resistant(
    sample_id: &str,
    isolate_id: &str,
    organism: &str,
    antibiotic: &str,
) -> TestRecord {
    record(sample_id, isolate_id, organism, antibiotic, SusceptibilityResult::Resistant)
}

pub fn intermediate(
    sample_id: &str,
    isolate_id: &str,
    organism: &str,
    antibiotic: &str,
) -> TestRecord {
    record(sample_id, isolate_id, organism, antibiotic, SusceptibilityResult::Intermediate)
}

pub fn susceptible(
    sample_id: &str,
    isolate_id: &str,
    organism: &str,
    antibiotic: &str,
) -> TestRecord {
    record(sample_id, isolate_id, organism, antibiotic, SusceptibilityResult::Susceptible)
}

pub fn dated(record: TestRecord, year: i32, month: u32, day: u32) -> TestRecord {
    record.with_test_date(date(year, month, day))
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid fixture date")
}

pub fn sample(
    sample_id: &str,
    region: &str,
    district: &str,
    category: SourceCategory,
) -> SampleRecord {
    SampleRecord::new(sample_id, region, district, Some(category))
}

/// One isolate per entry, resistant to every listed antibiotic.
pub fn resistant_isolates(organism: &str, isolates: &[(&str, &[&str])]) -> Vec<TestRecord> {
    isolates
        .iter()
        .flat_map(|(isolate_id, antibiotics)| {
            antibiotics
                .iter()
                .map(move |ab| resistant(&format!("S-{isolate_id}"), isolate_id, organism, ab))
        })
        .collect()
}
