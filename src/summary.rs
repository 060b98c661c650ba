//! Every analytic output in one serialisable bundle for the report layer.

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregation::{
    aggregate, overall_statistics, resistance_series, GroupingKey, ResistanceSeries,
    ResistanceSummary,
};
use crate::alerts::{emerging_resistance, generate_alerts, Alert, EmergingResistance};
use crate::catalog::DrugClassCatalog;
use crate::config::AnalyticsConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::forecast::{forecast_series, trend_direction, Forecast, TrendDirection};
use crate::mdr::{detect_mdr, MdrIsolate};
use crate::mechanisms::{screen_mechanisms, MechanismFinding};
use crate::patterns::{
    co_resistance_patterns, cross_resistance, CoResistancePattern, CrossResistance,
};
use crate::period::TimeUnit;
use crate::quality::{assess_data_quality, surveillance_kpis, DataQualityReport, SurveillanceKpis};
use crate::risk::{high_risk_organisms, score_entities, RiskScore};
use crate::stewardship::{
    antibiotic_recommendations, resistance_burden, AntibioticRecommendation, ResistanceBurden,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveillanceSummary {
    pub as_of: NaiveDate,
    pub overall: Option<ResistanceSummary>,
    pub by_organism: Vec<ResistanceSummary>,
    pub by_antibiotic: Vec<ResistanceSummary>,
    pub by_organism_antibiotic: Vec<ResistanceSummary>,
    pub by_region: Vec<ResistanceSummary>,
    pub by_source_category: Vec<ResistanceSummary>,
    pub monthly_series: ResistanceSeries,
    pub mdr_isolates: Vec<MdrIsolate>,
    pub co_resistance_patterns: Vec<CoResistancePattern>,
    pub cross_resistance: Vec<CrossResistance>,
    pub mechanisms: Vec<MechanismFinding>,
    pub organism_risk: Vec<RiskScore>,
    pub region_risk: Vec<RiskScore>,
    pub high_risk_organisms: Vec<RiskScore>,
    pub forecast: Forecast,
    pub trend: TrendDirection,
    pub alerts: Vec<Alert>,
    pub emerging_resistance: Vec<EmergingResistance>,
    pub recommendations: Vec<AntibioticRecommendation>,
    pub burden: Option<ResistanceBurden>,
    pub data_quality: DataQualityReport,
    pub kpis: Option<SurveillanceKpis>,
}

impl SurveillanceSummary {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Run every component with KPIs taken as of today.
pub fn build_summary(
    dataset: &Dataset,
    catalog: &DrugClassCatalog,
    config: &AnalyticsConfig,
) -> SurveillanceSummary {
    build_summary_as_of(dataset, catalog, config, chrono::Local::now().date_naive())
}

pub fn build_summary_as_of(
    dataset: &Dataset,
    catalog: &DrugClassCatalog,
    config: &AnalyticsConfig,
    as_of: NaiveDate,
) -> SurveillanceSummary {
    let tests = dataset.tests();
    let by = |keys: &[GroupingKey]| aggregate(dataset, keys).into_rows();
    let monthly_series = resistance_series(tests, TimeUnit::Month);

    let summary = SurveillanceSummary {
        as_of,
        overall: overall_statistics(tests),
        by_organism: by(&[GroupingKey::ByOrganism]),
        by_antibiotic: by(&[GroupingKey::ByAntibiotic]),
        by_organism_antibiotic: by(&[GroupingKey::ByOrganism, GroupingKey::ByAntibiotic]),
        by_region: by(&[GroupingKey::ByRegion]),
        by_source_category: by(&[GroupingKey::BySourceCategory]),
        forecast: forecast_series(
            &monthly_series,
            config.forecast_horizon,
            config.forecast_min_history,
        ),
        monthly_series,
        mdr_isolates: detect_mdr(tests, catalog, config.mdr_class_threshold),
        co_resistance_patterns: co_resistance_patterns(tests, config.min_pattern_occurrence),
        cross_resistance: cross_resistance(tests, catalog),
        mechanisms: screen_mechanisms(tests),
        organism_risk: score_entities(dataset, GroupingKey::ByOrganism, config),
        region_risk: score_entities(dataset, GroupingKey::ByRegion, config),
        high_risk_organisms: high_risk_organisms(tests, config),
        trend: trend_direction(tests, config),
        alerts: generate_alerts(dataset, catalog, config),
        emerging_resistance: emerging_resistance(tests, config),
        recommendations: antibiotic_recommendations(tests, config),
        burden: resistance_burden(dataset, config),
        data_quality: assess_data_quality(dataset),
        kpis: surveillance_kpis(dataset, as_of),
    };
    log::info!(
        "Summary built: {} tests, {} MDR isolates, {} alerts",
        tests.len(),
        summary.mdr_isolates.len(),
        summary.alerts.len()
    );
    summary
}
