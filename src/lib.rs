#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::types::PyModule;

pub mod aggregation;
pub mod alerts;
pub mod catalog;
pub mod config;
pub mod dataset;
pub mod error;
pub mod forecast;
pub mod mdr;
pub mod mechanisms;
pub mod model;
pub mod patterns;
pub mod period;
pub mod quality;
pub mod risk;
pub mod schema;
pub mod stewardship;
pub mod summary;

#[cfg(test)]
mod fixtures;
#[cfg(feature = "python")]
mod python;

pub use aggregation::{
    aggregate, overall_statistics, resistance_series, GroupingKey, ResistanceSummary,
    ResistanceTable,
};
pub use alerts::{emerging_resistance, generate_alerts, Alert, AlertType, Severity};
pub use catalog::DrugClassCatalog;
pub use config::AnalyticsConfig;
pub use dataset::{Dataset, DatasetFilter};
pub use error::{AmrError, Result};
pub use forecast::{forecast_series, forecast_values, trend_direction, Forecast};
pub use mdr::{detect_mdr, MdrIsolate};
pub use model::{SampleRecord, SourceCategory, SusceptibilityResult, TestRecord};
pub use patterns::{co_resistance_patterns, cross_resistance, CoResistancePattern};
pub use period::{Period, TimeUnit};
pub use quality::{assess_data_quality, surveillance_kpis, DataQualityReport};
pub use risk::{score_entities, score_organism, RiskLevel, RiskScore};
pub use summary::{build_summary, build_summary_as_of, SurveillanceSummary};

/// Export schema constants as Python submodules
#[cfg(feature = "python")]
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Test records
    let test = PyModule::new(m.py(), "test")?;
    test.add("SAMPLE_ID", schema::test::SAMPLE_ID)?;
    test.add("ISOLATE_ID", schema::test::ISOLATE_ID)?;
    test.add("ORGANISM", schema::test::ORGANISM)?;
    test.add("ANTIBIOTIC", schema::test::ANTIBIOTIC)?;
    test.add("RESULT", schema::test::RESULT)?;
    test.add("METHOD", schema::test::METHOD)?;
    test.add("GUIDELINE", schema::test::GUIDELINE)?;
    test.add("TEST_DATE", schema::test::TEST_DATE)?;
    test.add("MIC_VALUE", schema::test::MIC_VALUE)?;
    m.add_submodule(&test)?;

    // Sample records
    let sample = PyModule::new(m.py(), "sample")?;
    sample.add("SAMPLE_ID", schema::sample::SAMPLE_ID)?;
    sample.add("COLLECTION_DATE", schema::sample::COLLECTION_DATE)?;
    sample.add("REGION", schema::sample::REGION)?;
    sample.add("DISTRICT", schema::sample::DISTRICT)?;
    sample.add("SITE_TYPE", schema::sample::SITE_TYPE)?;
    sample.add("SOURCE_CATEGORY", schema::sample::SOURCE_CATEGORY)?;
    sample.add("SOURCE_TYPE", schema::sample::SOURCE_TYPE)?;
    sample.add("LATITUDE", schema::sample::LATITUDE)?;
    sample.add("LONGITUDE", schema::sample::LONGITUDE)?;
    m.add_submodule(&sample)?;

    // Catalog
    let catalog = PyModule::new(m.py(), "catalog")?;
    catalog.add("ANTIBIOTIC", schema::catalog::ANTIBIOTIC)?;
    catalog.add("DRUG_CLASS", schema::catalog::DRUG_CLASS)?;
    m.add_submodule(&catalog)?;

    // Resistance summary
    let summary = PyModule::new(m.py(), "summary")?;
    summary.add("TOTAL_TESTS", schema::summary::TOTAL_TESTS)?;
    summary.add("RESISTANT", schema::summary::RESISTANT)?;
    summary.add("INTERMEDIATE", schema::summary::INTERMEDIATE)?;
    summary.add("SUSCEPTIBLE", schema::summary::SUSCEPTIBLE)?;
    summary.add("PERCENT_RESISTANT", schema::summary::PERCENT_RESISTANT)?;
    summary.add("PERCENT_INTERMEDIATE", schema::summary::PERCENT_INTERMEDIATE)?;
    summary.add("PERCENT_SUSCEPTIBLE", schema::summary::PERCENT_SUSCEPTIBLE)?;
    summary.add("PERIOD", schema::summary::PERIOD)?;
    m.add_submodule(&summary)?;

    // Isolate-level findings
    let isolate = PyModule::new(m.py(), "isolate")?;
    isolate.add("ISOLATE_ID", schema::isolate::ISOLATE_ID)?;
    isolate.add("ORGANISM", schema::isolate::ORGANISM)?;
    isolate.add("SAMPLE_ID", schema::isolate::SAMPLE_ID)?;
    isolate.add("RESISTANT_DRUG_CLASSES", schema::isolate::RESISTANT_DRUG_CLASSES)?;
    isolate.add("DRUG_CLASS", schema::isolate::DRUG_CLASS)?;
    isolate.add("DRUG_CLASSES", schema::isolate::DRUG_CLASSES)?;
    isolate.add("RESISTANT_COUNT", schema::isolate::RESISTANT_COUNT)?;
    isolate.add("TESTED_COUNT", schema::isolate::TESTED_COUNT)?;
    isolate.add("RESISTANT_ANTIBIOTICS", schema::isolate::RESISTANT_ANTIBIOTICS)?;
    isolate.add("TESTED_ANTIBIOTICS", schema::isolate::TESTED_ANTIBIOTICS)?;
    isolate.add("LEVEL", schema::isolate::LEVEL)?;
    isolate.add("MECHANISM", schema::isolate::MECHANISM)?;
    isolate.add("CONFIDENCE", schema::isolate::CONFIDENCE)?;
    m.add_submodule(&isolate)?;

    // Co-resistance patterns
    let pattern = PyModule::new(m.py(), "pattern")?;
    pattern.add("ANTIBIOTIC_COMBINATION", schema::pattern::ANTIBIOTIC_COMBINATION)?;
    pattern.add("ANTIBIOTIC_COUNT", schema::pattern::ANTIBIOTIC_COUNT)?;
    pattern.add("COUNT", schema::pattern::COUNT)?;
    m.add_submodule(&pattern)?;

    // Risk
    let risk = PyModule::new(m.py(), "risk")?;
    risk.add("ENTITY", schema::risk::ENTITY)?;
    risk.add("RISK_SCORE", schema::risk::RISK_SCORE)?;
    risk.add("RISK_LEVEL", schema::risk::RISK_LEVEL)?;
    risk.add("RESISTANCE_RATE", schema::risk::RESISTANCE_RATE)?;
    risk.add("TEST_COUNT", schema::risk::TEST_COUNT)?;
    risk.add("ANTIBIOTIC_DIVERSITY", schema::risk::ANTIBIOTIC_DIVERSITY)?;
    risk.add("RISK_FACTORS", schema::risk::RISK_FACTORS)?;
    m.add_submodule(&risk)?;

    // Alerts
    let alert = PyModule::new(m.py(), "alert")?;
    alert.add("SEVERITY", schema::alert::SEVERITY)?;
    alert.add("MESSAGE", schema::alert::MESSAGE)?;
    alert.add("ALERT_TYPE", schema::alert::ALERT_TYPE)?;
    alert.add("ORGANISM", schema::alert::ORGANISM)?;
    alert.add("ANTIBIOTIC", schema::alert::ANTIBIOTIC)?;
    alert.add("RESISTANCE_RATE", schema::alert::RESISTANCE_RATE)?;
    alert.add("TESTS", schema::alert::TESTS)?;
    m.add_submodule(&alert)?;

    // Stewardship
    let stewardship = PyModule::new(m.py(), "stewardship")?;
    stewardship.add("ANTIBIOTIC", schema::stewardship::ANTIBIOTIC)?;
    stewardship.add("SUSCEPTIBILITY_RATE", schema::stewardship::SUSCEPTIBILITY_RATE)?;
    stewardship.add("TESTS", schema::stewardship::TESTS)?;
    stewardship.add("RECOMMENDATION", schema::stewardship::RECOMMENDATION)?;
    stewardship.add("PRIORITY", schema::stewardship::PRIORITY)?;
    m.add_submodule(&stewardship)?;

    Ok(())
}

#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::AmrAnalytics>()?;
    m.add_function(wrap_pyfunction!(python::init_logging, m)?)?;
    add_schema_exports(m)?;
    Ok(())
}
