//! Trend Forecaster and half-over-half trend direction.

use std::fmt;

use serde::Serialize;

use crate::aggregation::{ResistanceSeries, ResultCounts};
use crate::alerts::Severity;
use crate::config::AnalyticsConfig;
use crate::model::TestRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    Low,
    Moderate,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Stable,
    Decreasing,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Increasing => "increasing",
            Self::Stable => "stable",
            Self::Decreasing => "decreasing",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    /// 1-based position in the combined history + forecast sequence.
    pub period_index: usize,
    pub periods_ahead: usize,
    /// Calendar label, when the forecast was made from a dated series.
    pub label: Option<String>,
    /// Value of the fitted line. Not clamped, so it may leave 0..=100.
    pub predicted_percent: f64,
    pub confidence: Confidence,
}

impl ForecastPoint {
    /// The prediction clamped to a valid percentage.
    pub fn bounded_percent(&self) -> f64 {
        self.predicted_percent.clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendProjection {
    pub slope: f64,
    pub intercept: f64,
    pub history: usize,
    pub trend: Trend,
    pub confidence: Confidence,
    pub points: Vec<ForecastPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Forecast {
    /// Fewer than two periods; no line can be fitted.
    InsufficientData { periods_available: usize },
    Projected(TrendProjection),
}

impl Forecast {
    pub fn projection(&self) -> Option<&TrendProjection> {
        match self {
            Self::Projected(projection) => Some(projection),
            Self::InsufficientData { .. } => None,
        }
    }
}

/// Ordinary least squares of `values` against their index 0..n.
/// Requires at least two values.
fn least_squares(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;
    let (mut sxx, mut sxy) = (0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }
    let slope = sxy / sxx;
    (slope, mean_y - slope * mean_x)
}

/// Fit a line through `values` (one per period, oldest first) and project
/// it `horizon` periods ahead.
///
/// Confidence is `Moderate` from `min_history` periods on, `Low` below it.
pub fn forecast_values(values: &[f64], horizon: usize, min_history: usize) -> Forecast {
    if values.len() < 2 {
        return Forecast::InsufficientData {
            periods_available: values.len(),
        };
    }
    let (slope, intercept) = least_squares(values);
    let confidence = if values.len() >= min_history {
        Confidence::Moderate
    } else {
        Confidence::Low
    };
    let trend = if slope > 0.0 {
        Trend::Increasing
    } else if slope < 0.0 {
        Trend::Decreasing
    } else {
        Trend::Stable
    };

    let last_index = values.len() - 1;
    let points = (1..=horizon)
        .map(|ahead| ForecastPoint {
            period_index: last_index + ahead + 1,
            periods_ahead: ahead,
            label: None,
            predicted_percent: slope * (last_index + ahead) as f64 + intercept,
            confidence,
        })
        .collect();

    Forecast::Projected(TrendProjection {
        slope,
        intercept,
        history: values.len(),
        trend,
        confidence,
        points,
    })
}

/// Forecast a time-bucketed resistance series, labelling each projected
/// period with its calendar name.
pub fn forecast_series(series: &ResistanceSeries, horizon: usize, min_history: usize) -> Forecast {
    let mut forecast = forecast_values(&series.percentages(), horizon, min_history);
    if let (Forecast::Projected(projection), Some(last)) = (&mut forecast, series.last_period()) {
        for point in &mut projection.points {
            point.label = Some(last.advance(point.periods_ahead).label());
        }
    }
    match &forecast {
        Forecast::Projected(p) => log::debug!(
            "Forecast over {} {:?} periods: slope {:.4}, {} confidence",
            p.history,
            series.unit,
            p.slope,
            p.confidence
        ),
        Forecast::InsufficientData { periods_available } => {
            log::debug!("Forecast skipped: {periods_available} periods available")
        }
    }
    forecast
}

// ── Trend direction ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendAssessment {
    pub trend: Trend,
    pub first_half_percent: f64,
    pub second_half_percent: f64,
    /// Second half minus first half, in percentage points.
    pub change_percent: f64,
    pub risk: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrendDirection {
    InsufficientData,
    Assessed(TrendAssessment),
}

/// Compare resistance in the earlier and later half of the dated tests.
///
/// Tests are ordered by date, split at the midpoint, and the change in
/// percent resistant is classified against the configured threshold.
pub fn trend_direction(tests: &[TestRecord], config: &AnalyticsConfig) -> TrendDirection {
    let mut dated: Vec<&TestRecord> = tests.iter().filter(|t| t.test_date.is_some()).collect();
    if dated.len() < 2 {
        return TrendDirection::InsufficientData;
    }
    dated.sort_by_key(|t| t.test_date);

    let (first, second) = dated.split_at(dated.len() / 2);
    let first_half_percent = ResultCounts::from_records(first.iter().copied()).percent_resistant();
    let second_half_percent =
        ResultCounts::from_records(second.iter().copied()).percent_resistant();
    let change_percent = second_half_percent - first_half_percent;

    let threshold = config.trend_change_threshold_percent;
    let trend = if change_percent > threshold {
        Trend::Increasing
    } else if change_percent < -threshold {
        Trend::Decreasing
    } else {
        Trend::Stable
    };
    let risk = if change_percent > threshold {
        Severity::High
    } else if change_percent > 0.0 {
        Severity::Medium
    } else {
        Severity::Low
    };

    TrendDirection::Assessed(TrendAssessment {
        trend,
        first_half_percent,
        second_half_percent,
        change_percent,
        risk,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::resistance_series;
    use crate::fixtures::{dated, resistant, susceptible};
    use crate::period::TimeUnit;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn test_linear_series_projection() {
        let forecast = forecast_values(&[10.0, 15.0, 20.0, 25.0], 2, 6);
        let projection = forecast.projection().unwrap();
        assert_close(projection.slope, 5.0);
        assert_eq!(projection.trend, Trend::Increasing);
        assert_eq!(projection.confidence, Confidence::Low);

        let indices: Vec<usize> = projection.points.iter().map(|p| p.period_index).collect();
        assert_eq!(indices, vec![5, 6]);
        assert_close(projection.points[0].predicted_percent, 30.0);
        assert_close(projection.points[1].predicted_percent, 35.0);
    }

    #[test]
    fn test_refuses_short_history() {
        assert_eq!(
            forecast_values(&[], 3, 6),
            Forecast::InsufficientData { periods_available: 0 }
        );
        assert_eq!(
            forecast_values(&[42.0], 3, 6),
            Forecast::InsufficientData { periods_available: 1 }
        );
    }

    #[test]
    fn test_confidence_and_flat_series() {
        let forecast = forecast_values(&[20.0; 6], 1, 6);
        let projection = forecast.projection().unwrap();
        assert_eq!(projection.confidence, Confidence::Moderate);
        assert_eq!(projection.trend, Trend::Stable);
        assert_close(projection.points[0].predicted_percent, 20.0);
    }

    #[test]
    fn test_increasing_series_projects_above_fit() {
        let values = [0.0, 1.0, 2.0, 3.0, 100.0];
        let projection = forecast_values(&values, 3, 6).projection().cloned().unwrap();
        assert!(projection.slope > 0.0);
        let last_fitted = projection.slope * 4.0 + projection.intercept;
        let mut previous = last_fitted;
        for point in &projection.points {
            assert!(point.predicted_percent > previous);
            previous = point.predicted_percent;
        }
    }

    #[test]
    fn test_bounded_percent() {
        let projection = forecast_values(&[90.0, 99.0], 2, 6).projection().cloned().unwrap();
        assert!(projection.points[1].predicted_percent > 100.0);
        assert_eq!(projection.points[1].bounded_percent(), 100.0);
    }

    #[test]
    fn test_series_labels() {
        let tests = vec![
            dated(resistant("S", "1", "A", "X"), 2024, 11, 2),
            dated(susceptible("S", "2", "A", "X"), 2024, 11, 3),
            dated(resistant("S", "3", "A", "X"), 2024, 12, 1),
        ];
        let series = resistance_series(&tests, TimeUnit::Month);
        let forecast = forecast_series(&series, 2, 6);
        let labels: Vec<Option<String>> = forecast
            .projection()
            .unwrap()
            .points
            .iter()
            .map(|p| p.label.clone())
            .collect();
        assert_eq!(labels, vec![Some("2025-01".to_string()), Some("2025-02".to_string())]);
    }

    #[test]
    fn test_trend_direction_orders_by_date() {
        // listed out of order: the early tests are susceptible, the late ones resistant
        let tests = vec![
            dated(resistant("S", "1", "A", "X"), 2024, 6, 1),
            dated(susceptible("S", "2", "A", "X"), 2024, 1, 1),
            dated(resistant("S", "3", "A", "X"), 2024, 5, 1),
            dated(susceptible("S", "4", "A", "X"), 2024, 2, 1),
            susceptible("S", "5", "A", "X"),
        ];
        let direction = trend_direction(&tests, &AnalyticsConfig::default());
        let TrendDirection::Assessed(assessment) = direction else {
            panic!("expected an assessment");
        };
        assert_eq!(assessment.first_half_percent, 0.0);
        assert_eq!(assessment.second_half_percent, 100.0);
        assert_eq!(assessment.trend, Trend::Increasing);
        assert_eq!(assessment.risk, Severity::High);
    }

    #[test]
    fn test_trend_direction_stable_and_insufficient() {
        let config = AnalyticsConfig::default();
        let tests = vec![
            dated(resistant("S", "1", "A", "X"), 2024, 1, 1),
            dated(resistant("S", "2", "A", "X"), 2024, 2, 1),
        ];
        let TrendDirection::Assessed(assessment) = trend_direction(&tests, &config) else {
            panic!("expected an assessment");
        };
        assert_eq!(assessment.trend, Trend::Stable);
        assert_eq!(assessment.risk, Severity::Low);

        assert_eq!(trend_direction(&tests[..1], &config), TrendDirection::InsufficientData);
        assert_eq!(trend_direction(&[], &config), TrendDirection::InsufficientData);
    }
}
