use chrono::NaiveDate;
use polars::prelude::{DataFrame, PolarsResult};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyModule;
use pyo3_polars::PyDataFrame;
use serde::Serialize;

use crate::aggregation::{aggregate, resistance_series, GroupingKey};
use crate::alerts::{alerts_to_frame, emerging_resistance, emerging_to_frame, generate_alerts};
use crate::catalog::DrugClassCatalog;
use crate::config::AnalyticsConfig;
use crate::dataset::{Dataset, DatasetFilter};
use crate::error::AmrError;
use crate::forecast::{forecast_series, trend_direction};
use crate::mdr::detect_mdr;
use crate::model::SourceCategory;
use crate::patterns::{
    co_resistance_patterns, cross_resistance, cross_resistance_to_frame, patterns_to_frame,
};
use crate::period::TimeUnit;
use crate::quality::{assess_data_quality, surveillance_kpis};
use crate::risk::{high_risk_organisms, score_entities};
use crate::stewardship::{antibiotic_recommendations, recommendations_to_frame, resistance_burden};
use crate::summary::{build_summary, build_summary_as_of};
use crate::{mdr, mechanisms, risk};

fn frame(result: PolarsResult<DataFrame>) -> PyResult<PyDataFrame> {
    Ok(PyDataFrame(result.map_err(AmrError::from)?))
}

/// Serialise through JSON into plain Python dicts and lists.
fn to_py<T: Serialize>(py: Python<'_>, value: &T) -> PyResult<PyObject> {
    let json = serde_json::to_string(value).map_err(AmrError::from)?;
    Ok(PyModule::import(py, "json")?
        .call_method1("loads", (json,))?
        .unbind())
}

fn parse_unit(unit: &str) -> PyResult<TimeUnit> {
    TimeUnit::parse(unit).ok_or_else(|| PyValueError::new_err(format!("Unknown time unit: {unit}")))
}

fn parse_key(key: &str) -> PyResult<GroupingKey> {
    GroupingKey::parse(key)
        .ok_or_else(|| PyValueError::new_err(format!("Unknown grouping key: {key}")))
}

/// Surveillance analytics over one immutable snapshot of samples and tests.
#[pyclass]
pub struct AmrAnalytics {
    dataset: Dataset,
    catalog: DrugClassCatalog,
    config: AnalyticsConfig,
}

impl AmrAnalytics {
    fn build(
        dataset: Dataset,
        config_json: Option<&str>,
        catalog: Option<DrugClassCatalog>,
    ) -> PyResult<Self> {
        let config = match config_json {
            Some(json) => AnalyticsConfig::from_json_str(json)?,
            None => AnalyticsConfig::default(),
        };
        Ok(Self {
            dataset,
            catalog: catalog.unwrap_or_default(),
            config,
        })
    }
}

#[pymethods]
impl AmrAnalytics {
    #[new]
    #[pyo3(signature = (samples, tests, config_json=None, catalog=None))]
    fn new(
        samples: PyDataFrame,
        tests: PyDataFrame,
        config_json: Option<&str>,
        catalog: Option<PyDataFrame>,
    ) -> PyResult<Self> {
        let dataset = Dataset::from_frames(&samples.0, &tests.0)?;
        let catalog = catalog.map(|c| DrugClassCatalog::from_frame(&c.0)).transpose()?;
        Self::build(dataset, config_json, catalog)
    }

    /// Load samples and tests from CSV or Parquet files.
    #[staticmethod]
    #[pyo3(signature = (samples_path, tests_path, config_json=None, catalog_path=None))]
    fn from_files(
        samples_path: &str,
        tests_path: &str,
        config_json: Option<&str>,
        catalog_path: Option<&str>,
    ) -> PyResult<Self> {
        let dataset = Dataset::from_files(samples_path, tests_path)?;
        let catalog = catalog_path.map(DrugClassCatalog::from_path).transpose()?;
        Self::build(dataset, config_json, catalog)
    }

    /// A new instance restricted to the selection; this one is unchanged.
    #[pyo3(signature = (
        organisms=None, antibiotics=None, source_categories=None, source_types=None,
        site_types=None, regions=None, districts=None, date_from=None, date_to=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn filter(
        &self,
        organisms: Option<Vec<String>>,
        antibiotics: Option<Vec<String>>,
        source_categories: Option<Vec<String>>,
        source_types: Option<Vec<String>>,
        site_types: Option<Vec<String>>,
        regions: Option<Vec<String>>,
        districts: Option<Vec<String>>,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> PyResult<Self> {
        let source_categories = source_categories
            .unwrap_or_default()
            .iter()
            .map(|raw| {
                SourceCategory::parse(raw)
                    .ok_or_else(|| PyValueError::new_err(format!("Unknown source category: {raw}")))
            })
            .collect::<PyResult<Vec<_>>>()?;
        let filter = DatasetFilter {
            organisms: organisms.unwrap_or_default(),
            antibiotics: antibiotics.unwrap_or_default(),
            source_categories,
            source_types: source_types.unwrap_or_default(),
            site_types: site_types.unwrap_or_default(),
            regions: regions.unwrap_or_default(),
            districts: districts.unwrap_or_default(),
            date_from,
            date_to,
        };
        Ok(Self {
            dataset: self.dataset.filter(&filter),
            catalog: self.catalog.clone(),
            config: self.config.clone(),
        })
    }

    #[getter]
    fn sample_count(&self) -> usize {
        self.dataset.samples().len()
    }

    #[getter]
    fn test_count(&self) -> usize {
        self.dataset.tests().len()
    }

    // ── Tabular outputs ─────────────────────────────────────────────────────

    /// S/I/R statistics grouped by the named keys, e.g. `["organism", "antibiotic"]`
    /// or `["region", "month"]`.
    #[pyo3(signature = (keys=vec!["organism".to_string()]))]
    fn resistance_summary(&self, keys: Vec<String>) -> PyResult<PyDataFrame> {
        let keys = keys.iter().map(|k| parse_key(k)).collect::<PyResult<Vec<_>>>()?;
        frame(aggregate(&self.dataset, &keys).to_frame())
    }

    #[pyo3(signature = (unit="month"))]
    fn resistance_series(&self, unit: &str) -> PyResult<PyDataFrame> {
        frame(resistance_series(self.dataset.tests(), parse_unit(unit)?).to_frame())
    }

    fn mdr_isolates(&self) -> PyResult<PyDataFrame> {
        let rows = detect_mdr(self.dataset.tests(), &self.catalog, self.config.mdr_class_threshold);
        frame(mdr::to_frame(&rows))
    }

    fn co_resistance_patterns(&self) -> PyResult<PyDataFrame> {
        let rows = co_resistance_patterns(self.dataset.tests(), self.config.min_pattern_occurrence);
        frame(patterns_to_frame(&rows))
    }

    fn cross_resistance(&self) -> PyResult<PyDataFrame> {
        frame(cross_resistance_to_frame(&cross_resistance(self.dataset.tests(), &self.catalog)))
    }

    fn resistance_mechanisms(&self) -> PyResult<PyDataFrame> {
        frame(mechanisms::to_frame(&mechanisms::screen_mechanisms(self.dataset.tests())))
    }

    #[pyo3(signature = (key="organism"))]
    fn risk_scores(&self, key: &str) -> PyResult<PyDataFrame> {
        frame(risk::to_frame(&score_entities(&self.dataset, parse_key(key)?, &self.config)))
    }

    fn high_risk_organisms(&self) -> PyResult<PyDataFrame> {
        frame(risk::to_frame(&high_risk_organisms(self.dataset.tests(), &self.config)))
    }

    fn alerts(&self) -> PyResult<PyDataFrame> {
        frame(alerts_to_frame(&generate_alerts(&self.dataset, &self.catalog, &self.config)))
    }

    fn emerging_resistance(&self) -> PyResult<PyDataFrame> {
        frame(emerging_to_frame(&emerging_resistance(self.dataset.tests(), &self.config)))
    }

    fn recommendations(&self) -> PyResult<PyDataFrame> {
        let rows = antibiotic_recommendations(self.dataset.tests(), &self.config);
        frame(recommendations_to_frame(&rows))
    }

    // ── Structured outputs ──────────────────────────────────────────────────

    #[pyo3(signature = (unit="month", horizon=None))]
    fn forecast(&self, py: Python<'_>, unit: &str, horizon: Option<usize>) -> PyResult<PyObject> {
        let series = resistance_series(self.dataset.tests(), parse_unit(unit)?);
        let horizon = horizon.unwrap_or(self.config.forecast_horizon);
        to_py(py, &forecast_series(&series, horizon, self.config.forecast_min_history))
    }

    fn trend_direction(&self, py: Python<'_>) -> PyResult<PyObject> {
        to_py(py, &trend_direction(self.dataset.tests(), &self.config))
    }

    fn data_quality(&self, py: Python<'_>) -> PyResult<PyObject> {
        to_py(py, &assess_data_quality(&self.dataset))
    }

    fn resistance_burden(&self, py: Python<'_>) -> PyResult<PyObject> {
        to_py(py, &resistance_burden(&self.dataset, &self.config))
    }

    fn kpis(&self, py: Python<'_>, as_of: NaiveDate) -> PyResult<PyObject> {
        to_py(py, &surveillance_kpis(&self.dataset, as_of))
    }

    /// Every output as one JSON document.
    #[pyo3(signature = (as_of=None))]
    fn summary_json(&self, as_of: Option<NaiveDate>) -> PyResult<String> {
        let summary = match as_of {
            Some(day) => build_summary_as_of(&self.dataset, &self.catalog, &self.config, day),
            None => build_summary(&self.dataset, &self.catalog, &self.config),
        };
        Ok(summary.to_json()?)
    }
}

/// Install the `env_logger` backend for the crate's log output.
///
/// `RUST_LOG` wins over `level` when set. Returns False when a logger was
/// already installed.
#[pyfunction]
#[pyo3(signature = (level="info"))]
pub fn init_logging(level: &str) -> bool {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .try_init()
        .is_ok()
}
