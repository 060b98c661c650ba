//! Surveillance policy constants.
//!
//! Every threshold the analytics use lives here so a deployment can retune
//! policy by shipping a JSON file instead of touching algorithm code.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AmrError, Result};

/// Minimum number of distinct resistant drug classes for an isolate to be MDR.
pub const MDR_CLASS_THRESHOLD: usize = 3;
/// Minimum isolates sharing a signature before it is reported as a pattern.
pub const MIN_PATTERN_OCCURRENCE: usize = 3;
/// Overall resistance percentage above which a HIGH alert fires.
pub const OVERALL_RESISTANCE_ALERT_PERCENT: f64 = 30.0;
/// Organism-antibiotic resistance percentage above which a MEDIUM alert fires.
pub const COMBO_RESISTANCE_ALERT_PERCENT: f64 = 50.0;
/// Minimum tests behind an organism-antibiotic combination before it may alert.
pub const COMBO_MIN_TESTS: usize = 10;
/// Default number of periods projected by the forecaster.
pub const FORECAST_HORIZON: usize = 3;
/// Historical periods needed before a forecast is labelled "Moderate".
pub const FORECAST_MIN_HISTORY: usize = 6;
/// Half-over-half change (percentage points) that counts as a trend.
pub const TREND_CHANGE_THRESHOLD_PERCENT: f64 = 5.0;
pub const EMERGING_WINDOW_DAYS: i64 = 90;
/// Longest emerging-resistance window a config may ask for.
pub const MAX_EMERGING_WINDOW_DAYS: i64 = 36_500;
pub const EMERGING_RESISTANCE_PERCENT: f64 = 60.0;
pub const EMERGING_CRITICAL_PERCENT: f64 = 80.0;
pub const EMERGING_MIN_TESTS: usize = 5;
/// Resistance rate at or above which an organism is listed as high risk.
pub const HIGH_RISK_RESISTANCE_PERCENT: f64 = 50.0;
pub const RECOMMENDATION_MIN_TESTS: usize = 5;
/// Susceptibility percentages strictly above which an antibiotic is
/// PREFERRED, GOOD or CAUTION; anything lower is AVOID.
pub const PREFERRED_SUSCEPTIBILITY_PERCENT: f64 = 80.0;
pub const GOOD_SUSCEPTIBILITY_PERCENT: f64 = 60.0;
pub const CAUTION_SUSCEPTIBILITY_PERCENT: f64 = 40.0;
/// Overall resistance percentages strictly above which the public-health
/// impact is CRITICAL, HIGH or MODERATE; anything lower is LOW.
pub const CRITICAL_IMPACT_PERCENT: f64 = 50.0;
pub const HIGH_IMPACT_PERCENT: f64 = 30.0;
pub const MODERATE_IMPACT_PERCENT: f64 = 15.0;

/// One step of a piecewise risk component: strictly above `above` earns `points`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub above: f64,
    pub points: u32,
}

impl Tier {
    pub const fn new(above: f64, points: u32) -> Self {
        Self { above, points }
    }
}

/// Step tables and level cutoffs for the composite risk score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskTiers {
    /// Resistance rate (percent), highest step first.
    pub resistance_rate: Vec<Tier>,
    /// Number of tests, highest step first.
    pub volume: Vec<Tier>,
    /// Distinct antibiotics tested, highest step first.
    pub diversity: Vec<Tier>,
    pub critical_at: u32,
    pub high_at: u32,
    pub moderate_at: u32,
}

impl Default for RiskTiers {
    fn default() -> Self {
        Self {
            resistance_rate: vec![Tier::new(70.0, 40), Tier::new(50.0, 30), Tier::new(30.0, 20)],
            volume: vec![Tier::new(100.0, 20), Tier::new(50.0, 15), Tier::new(20.0, 10)],
            diversity: vec![Tier::new(10.0, 40), Tier::new(5.0, 25), Tier::new(2.0, 15)],
            critical_at: 70,
            high_at: 50,
            moderate_at: 30,
        }
    }
}

/// Cutoffs for stewardship recommendations and burden impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StewardshipTiers {
    pub preferred_above: f64,
    pub good_above: f64,
    pub caution_above: f64,
    pub critical_impact_above: f64,
    pub high_impact_above: f64,
    pub moderate_impact_above: f64,
}

impl Default for StewardshipTiers {
    fn default() -> Self {
        Self {
            preferred_above: PREFERRED_SUSCEPTIBILITY_PERCENT,
            good_above: GOOD_SUSCEPTIBILITY_PERCENT,
            caution_above: CAUTION_SUSCEPTIBILITY_PERCENT,
            critical_impact_above: CRITICAL_IMPACT_PERCENT,
            high_impact_above: HIGH_IMPACT_PERCENT,
            moderate_impact_above: MODERATE_IMPACT_PERCENT,
        }
    }
}

/// Tunable analytics policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub mdr_class_threshold: usize,
    pub min_pattern_occurrence: usize,
    pub overall_resistance_alert_percent: f64,
    pub combo_resistance_alert_percent: f64,
    pub combo_min_tests: usize,
    pub risk: RiskTiers,
    pub forecast_horizon: usize,
    pub forecast_min_history: usize,
    pub trend_change_threshold_percent: f64,
    pub emerging_window_days: i64,
    pub emerging_resistance_percent: f64,
    pub emerging_critical_percent: f64,
    pub emerging_min_tests: usize,
    pub high_risk_resistance_percent: f64,
    pub recommendation_min_tests: usize,
    pub stewardship: StewardshipTiers,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            mdr_class_threshold: MDR_CLASS_THRESHOLD,
            min_pattern_occurrence: MIN_PATTERN_OCCURRENCE,
            overall_resistance_alert_percent: OVERALL_RESISTANCE_ALERT_PERCENT,
            combo_resistance_alert_percent: COMBO_RESISTANCE_ALERT_PERCENT,
            combo_min_tests: COMBO_MIN_TESTS,
            risk: RiskTiers::default(),
            forecast_horizon: FORECAST_HORIZON,
            forecast_min_history: FORECAST_MIN_HISTORY,
            trend_change_threshold_percent: TREND_CHANGE_THRESHOLD_PERCENT,
            emerging_window_days: EMERGING_WINDOW_DAYS,
            emerging_resistance_percent: EMERGING_RESISTANCE_PERCENT,
            emerging_critical_percent: EMERGING_CRITICAL_PERCENT,
            emerging_min_tests: EMERGING_MIN_TESTS,
            high_risk_resistance_percent: HIGH_RISK_RESISTANCE_PERCENT,
            recommendation_min_tests: RECOMMENDATION_MIN_TESTS,
            stewardship: StewardshipTiers::default(),
        }
    }
}

impl AnalyticsConfig {
    /// Parse a JSON document; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading analytics config from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.mdr_class_threshold == 0 {
            return Err(AmrError::InvalidConfig(
                "mdr_class_threshold must be at least 1".into(),
            ));
        }
        if self.min_pattern_occurrence == 0 {
            return Err(AmrError::InvalidConfig(
                "min_pattern_occurrence must be at least 1".into(),
            ));
        }
        if self.forecast_min_history < 2 {
            return Err(AmrError::InvalidConfig(
                "forecast_min_history must be at least 2".into(),
            ));
        }
        if !(0..=MAX_EMERGING_WINDOW_DAYS).contains(&self.emerging_window_days) {
            return Err(AmrError::InvalidConfig(format!(
                "emerging_window_days must be within 0..={MAX_EMERGING_WINDOW_DAYS}, got {}",
                self.emerging_window_days
            )));
        }

        let percents = [
            ("overall_resistance_alert_percent", self.overall_resistance_alert_percent),
            ("combo_resistance_alert_percent", self.combo_resistance_alert_percent),
            ("trend_change_threshold_percent", self.trend_change_threshold_percent),
            ("emerging_resistance_percent", self.emerging_resistance_percent),
            ("emerging_critical_percent", self.emerging_critical_percent),
            ("high_risk_resistance_percent", self.high_risk_resistance_percent),
            ("stewardship.preferred_above", self.stewardship.preferred_above),
            ("stewardship.good_above", self.stewardship.good_above),
            ("stewardship.caution_above", self.stewardship.caution_above),
            ("stewardship.critical_impact_above", self.stewardship.critical_impact_above),
            ("stewardship.high_impact_above", self.stewardship.high_impact_above),
            ("stewardship.moderate_impact_above", self.stewardship.moderate_impact_above),
        ];
        for (name, value) in percents {
            if !(0.0..=100.0).contains(&value) {
                return Err(AmrError::InvalidConfig(format!(
                    "{name} must be within 0..=100, got {value}"
                )));
            }
        }

        for (name, tiers) in [
            ("risk.resistance_rate", &self.risk.resistance_rate),
            ("risk.volume", &self.risk.volume),
            ("risk.diversity", &self.risk.diversity),
        ] {
            if tiers.windows(2).any(|w| w[0].above <= w[1].above) {
                return Err(AmrError::InvalidConfig(format!(
                    "{name} tiers must be ordered from highest to lowest threshold"
                )));
            }
        }
        let max_points = [&self.risk.resistance_rate, &self.risk.volume, &self.risk.diversity]
            .iter()
            .map(|tiers| tiers.iter().map(|t| t.points).max().unwrap_or(0))
            .sum::<u32>();
        if max_points > 100 {
            return Err(AmrError::InvalidConfig(format!(
                "risk components can sum to {max_points}, above the 100-point ceiling"
            )));
        }
        let stewardship = &self.stewardship;
        if !(stewardship.preferred_above > stewardship.good_above
            && stewardship.good_above > stewardship.caution_above)
        {
            return Err(AmrError::InvalidConfig(
                "stewardship recommendation cutoffs must satisfy preferred > good > caution".into(),
            ));
        }
        if !(stewardship.critical_impact_above > stewardship.high_impact_above
            && stewardship.high_impact_above > stewardship.moderate_impact_above)
        {
            return Err(AmrError::InvalidConfig(
                "stewardship impact cutoffs must satisfy critical > high > moderate".into(),
            ));
        }
        if !(self.risk.critical_at >= self.risk.high_at
            && self.risk.high_at >= self.risk.moderate_at)
        {
            return Err(AmrError::InvalidConfig(
                "risk level cutoffs must satisfy critical >= high >= moderate".into(),
            ));
        }
        Ok(())
    }
}
