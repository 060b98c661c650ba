//! Immutable in-memory snapshot of sample and test records.
//!
//! The snapshot is built once from polars DataFrames (handed over from Python
//! or read from CSV/Parquet files) and then shared read-only by every
//! analytics component.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AmrError, Result};
use crate::model::{
    non_blank, parse_date, Guideline, SampleRecord, SourceCategory, SusceptibilityResult,
    TestMethod, TestRecord,
};
use crate::schema::{sample, test};

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    samples: Vec<SampleRecord>,
    tests: Vec<TestRecord>,
    sample_index: HashMap<String, usize>,
    rejected_samples: usize,
    rejected_tests: usize,
}

impl Dataset {
    /// Build a snapshot from already-typed records.
    ///
    /// Duplicate `sample_id`s keep the first occurrence.
    pub fn new(samples: Vec<SampleRecord>, tests: Vec<TestRecord>) -> Self {
        let mut kept = Vec::with_capacity(samples.len());
        let mut sample_index = HashMap::with_capacity(samples.len());
        let mut rejected_samples = 0;
        for record in samples {
            if sample_index.contains_key(&record.sample_id) {
                log::warn!("Duplicate sample_id {} ignored", record.sample_id);
                rejected_samples += 1;
                continue;
            }
            sample_index.insert(record.sample_id.clone(), kept.len());
            kept.push(record);
        }
        Self {
            samples: kept,
            tests,
            sample_index,
            rejected_samples,
            rejected_tests: 0,
        }
    }

    /// Build a snapshot from sample and test DataFrames.
    ///
    /// Required columns must exist; individual rows with unusable values are
    /// skipped and counted rather than failing the whole load.
    pub fn from_frames(samples: &DataFrame, tests: &DataFrame) -> Result<Self> {
        let (sample_records, bad_samples) = samples_from_frame(samples)?;
        let (test_records, bad_tests) = tests_from_frame(tests)?;
        let mut dataset = Self::new(sample_records, test_records);
        dataset.rejected_samples += bad_samples;
        dataset.rejected_tests = bad_tests;
        log::info!(
            "Loaded {} samples and {} tests ({} sample rows and {} test rows rejected)",
            dataset.samples.len(),
            dataset.tests.len(),
            dataset.rejected_samples,
            dataset.rejected_tests
        );
        Ok(dataset)
    }

    /// Load a snapshot from CSV or Parquet files.
    pub fn from_files(
        samples_path: impl AsRef<Path>,
        tests_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let samples = read_table(samples_path.as_ref())?;
        let tests = read_table(tests_path.as_ref())?;
        Self::from_frames(&samples, &tests)
    }

    pub fn samples(&self) -> &[SampleRecord] {
        &self.samples
    }

    pub fn tests(&self) -> &[TestRecord] {
        &self.tests
    }

    pub fn sample(&self, sample_id: &str) -> Option<&SampleRecord> {
        self.sample_index.get(sample_id).map(|&i| &self.samples[i])
    }

    /// The sample a test belongs to, if it is present in this snapshot.
    pub fn sample_of(&self, record: &TestRecord) -> Option<&SampleRecord> {
        self.sample(&record.sample_id)
    }

    pub fn rejected_samples(&self) -> usize {
        self.rejected_samples
    }

    pub fn rejected_tests(&self) -> usize {
        self.rejected_tests
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.tests.is_empty()
    }

    /// A new snapshot restricted by `filter`. The source is left untouched.
    pub fn filter(&self, filter: &DatasetFilter) -> Dataset {
        let samples: Vec<SampleRecord> = self
            .samples
            .iter()
            .filter(|s| filter.accepts_sample(s))
            .cloned()
            .collect();

        let restrict_to_samples = filter.restricts_samples();
        let retained: HashSet<&str> = samples.iter().map(|s| s.sample_id.as_str()).collect();

        let tests: Vec<TestRecord> = self
            .tests
            .iter()
            .filter(|t| filter.accepts_test(t))
            .filter(|t| !restrict_to_samples || retained.contains(t.sample_id.as_str()))
            .cloned()
            .collect();

        log::debug!(
            "Filter kept {}/{} samples and {}/{} tests",
            samples.len(),
            self.samples.len(),
            tests.len(),
            self.tests.len()
        );

        let mut filtered = Dataset::new(samples, tests);
        filtered.rejected_samples = self.rejected_samples;
        filtered.rejected_tests = self.rejected_tests;
        filtered
    }
}

/// Selection applied to a snapshot. Empty lists mean "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetFilter {
    pub organisms: Vec<String>,
    pub antibiotics: Vec<String>,
    pub source_categories: Vec<SourceCategory>,
    pub source_types: Vec<String>,
    pub site_types: Vec<String>,
    pub regions: Vec<String>,
    pub districts: Vec<String>,
    /// Inclusive lower bound on `test_date`.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on `test_date`.
    pub date_to: Option<NaiveDate>,
}

impl DatasetFilter {
    fn restricts_samples(&self) -> bool {
        !(self.source_categories.is_empty()
            && self.source_types.is_empty()
            && self.site_types.is_empty()
            && self.regions.is_empty()
            && self.districts.is_empty())
    }

    fn accepts_sample(&self, record: &SampleRecord) -> bool {
        let category_ok = self.source_categories.is_empty()
            || record
                .source_category
                .is_some_and(|c| self.source_categories.contains(&c));
        category_ok
            && matches_optional(&self.source_types, record.source_type.as_deref())
            && matches_optional(&self.site_types, record.site_type.as_deref())
            && matches(&self.regions, &record.region)
            && matches(&self.districts, &record.district)
    }

    fn accepts_test(&self, record: &TestRecord) -> bool {
        if !matches(&self.organisms, &record.organism)
            || !matches(&self.antibiotics, &record.antibiotic)
        {
            return false;
        }
        if self.date_from.is_none() && self.date_to.is_none() {
            return true;
        }
        match record.test_date {
            Some(date) => {
                self.date_from.map_or(true, |from| date >= from)
                    && self.date_to.map_or(true, |to| date <= to)
            }
            None => false,
        }
    }
}

fn matches(allowed: &[String], value: &str) -> bool {
    allowed.is_empty() || allowed.iter().any(|a| a == value)
}

fn matches_optional(allowed: &[String], value: Option<&str>) -> bool {
    allowed.is_empty() || value.is_some_and(|v| matches(allowed, v))
}

/// Group test records by isolate, ordered by `isolate_id`.
pub fn group_by_isolate<'a, I>(tests: I) -> BTreeMap<&'a str, Vec<&'a TestRecord>>
where
    I: IntoIterator<Item = &'a TestRecord>,
{
    let mut groups: BTreeMap<&'a str, Vec<&'a TestRecord>> = BTreeMap::new();
    for record in tests {
        groups.entry(record.isolate_id.as_str()).or_default().push(record);
    }
    groups
}

// ── Table loading ───────────────────────────────────────────────────────────

/// Read a CSV or Parquet file into a DataFrame, chosen by file extension.
pub fn read_table(path: &Path) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    log::info!("Reading {}", path.display());
    match extension.as_deref() {
        Some("csv") => read_csv_as_strings(path),
        Some("parquet") | Some("pq") => {
            let file = File::open(path)?;
            Ok(ParquetReader::new(file).finish()?)
        }
        _ => Err(AmrError::UnsupportedFile(path.display().to_string())),
    }
}

/// Read a CSV file with all columns as String dtype and trimmed column names.
fn read_csv_as_strings(path: &Path) -> Result<DataFrame> {
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;
    Ok(df)
}

pub(crate) fn require_columns(df: &DataFrame, required: &[&str]) -> Result<()> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(AmrError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

/// Column values rendered as strings; an absent column yields all `None`.
pub(crate) fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let Ok(column) = df.column(name) else {
        return Ok(vec![None; df.height()]);
    };
    let column = column.cast(&DataType::String)?;
    Ok(column.str()?.into_iter().map(non_blank).collect())
}

fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    Ok(string_values(df, name)?
        .into_iter()
        .map(|v| v.and_then(|s| s.parse::<f64>().ok()).filter(|f| f.is_finite()))
        .collect())
}

fn tests_from_frame(df: &DataFrame) -> Result<(Vec<TestRecord>, usize)> {
    require_columns(df, &test::REQUIRED)?;

    let sample_ids = string_values(df, test::SAMPLE_ID)?;
    let isolate_ids = string_values(df, test::ISOLATE_ID)?;
    let organisms = string_values(df, test::ORGANISM)?;
    let antibiotics = string_values(df, test::ANTIBIOTIC)?;
    let results = string_values(df, test::RESULT)?;
    let methods = string_values(df, test::METHOD)?;
    let guidelines = string_values(df, test::GUIDELINE)?;
    let dates = string_values(df, test::TEST_DATE)?;
    let mics = float_values(df, test::MIC_VALUE)?;

    let mut records = Vec::with_capacity(df.height());
    let mut rejected = 0;
    for i in 0..df.height() {
        let result = results[i].as_deref().and_then(SusceptibilityResult::parse);
        let (Some(sample_id), Some(isolate_id), Some(organism), Some(antibiotic), Some(result)) = (
            sample_ids[i].clone(),
            isolate_ids[i].clone(),
            organisms[i].clone(),
            antibiotics[i].clone(),
            result,
        ) else {
            log::warn!("Skipping test row {i}: missing identifier or unrecognised result");
            rejected += 1;
            continue;
        };

        records.push(TestRecord {
            sample_id,
            isolate_id,
            organism,
            antibiotic,
            result,
            method: methods[i].as_deref().and_then(TestMethod::parse),
            guideline: guidelines[i].as_deref().and_then(Guideline::parse),
            test_date: dates[i].as_deref().and_then(parse_date),
            mic_value: mics[i],
        });
    }
    Ok((records, rejected))
}

fn samples_from_frame(df: &DataFrame) -> Result<(Vec<SampleRecord>, usize)> {
    require_columns(df, &sample::REQUIRED)?;

    let sample_ids = string_values(df, sample::SAMPLE_ID)?;
    let collection_dates = string_values(df, sample::COLLECTION_DATE)?;
    let regions = string_values(df, sample::REGION)?;
    let districts = string_values(df, sample::DISTRICT)?;
    let site_types = string_values(df, sample::SITE_TYPE)?;
    let categories = string_values(df, sample::SOURCE_CATEGORY)?;
    let source_types = string_values(df, sample::SOURCE_TYPE)?;
    let latitudes = float_values(df, sample::LATITUDE)?;
    let longitudes = float_values(df, sample::LONGITUDE)?;

    let mut records = Vec::with_capacity(df.height());
    let mut rejected = 0;
    for i in 0..df.height() {
        let Some(sample_id) = sample_ids[i].clone() else {
            log::warn!("Skipping sample row {i}: missing sample_id");
            rejected += 1;
            continue;
        };
        records.push(SampleRecord {
            sample_id,
            collection_date: collection_dates[i].as_deref().and_then(parse_date),
            region: regions[i].clone().unwrap_or_default(),
            district: districts[i].clone().unwrap_or_default(),
            site_type: site_types[i].clone(),
            source_category: categories[i].as_deref().and_then(SourceCategory::parse),
            source_type: source_types[i].clone(),
            latitude: latitudes[i],
            longitude: longitudes[i],
        });
    }
    Ok((records, rejected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{dated, resistant, sample, susceptible};

    fn test_frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new(test::SAMPLE_ID.into(), &["S1", "S1", "S2", "S2"]),
            Column::new(test::ISOLATE_ID.into(), &["I1", "I1", "I2", "I2"]),
            Column::new(test::ORGANISM.into(), &["E. coli", "E. coli", "Salmonella", "Salmonella"]),
            Column::new(
                test::ANTIBIOTIC.into(),
                &["Ampicillin", "Gentamicin", "Ampicillin", "Tetracycline"],
            ),
            Column::new(test::RESULT.into(), &["R", "S", "X", "Resistant"]),
            Column::new(
                test::TEST_DATE.into(),
                &["2024-01-10", "garbage", "2024-02-01", "2024-02-03"],
            ),
        ])
        .unwrap()
    }

    fn sample_frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new(sample::SAMPLE_ID.into(), &["S1", "S2", "S2"]),
            Column::new(
                sample::COLLECTION_DATE.into(),
                &["2024-01-05", "2024-01-28", "2024-01-28"],
            ),
            Column::new(sample::REGION.into(), &["Ashanti", "Volta", "Volta"]),
            Column::new(sample::DISTRICT.into(), &["Kumasi", "Ho", "Ho"]),
            Column::new(sample::SOURCE_CATEGORY.into(), &["FOOD", "ENVIRONMENT", "ENVIRONMENT"]),
            Column::new(sample::LATITUDE.into(), &[Some("6.69"), None, None]),
            Column::new(sample::LONGITUDE.into(), &[Some("-1.62"), None, None]),
        ])
        .unwrap()
    }

    #[test]
    fn test_from_frames_skips_bad_rows() {
        let dataset = Dataset::from_frames(&sample_frame(), &test_frame()).unwrap();
        assert_eq!(dataset.tests().len(), 3);
        assert_eq!(dataset.rejected_tests(), 1);
        assert_eq!(dataset.samples().len(), 2);
        assert_eq!(dataset.rejected_samples(), 1);
        assert_eq!(dataset.tests()[1].test_date, None);
        assert!(dataset.sample("S1").unwrap().has_valid_coordinates());
        assert_eq!(
            dataset.sample("S2").unwrap().source_category,
            Some(SourceCategory::Environment)
        );
    }

    #[test]
    fn test_missing_required_column() {
        let tests = test_frame().drop(test::RESULT).unwrap();
        let err = Dataset::from_frames(&sample_frame(), &tests).unwrap_err();
        assert!(matches!(err, AmrError::MissingColumn(c) if c == test::RESULT));
    }

    #[test]
    fn test_empty_frames() {
        let tests = DataFrame::new(
            test::REQUIRED
                .iter()
                .map(|name| Column::new((*name).into(), Vec::<String>::new()))
                .collect(),
        )
        .unwrap();
        let samples = DataFrame::new(
            sample::REQUIRED
                .iter()
                .map(|name| Column::new((*name).into(), Vec::<String>::new()))
                .collect(),
        )
        .unwrap();
        let dataset = Dataset::from_frames(&samples, &tests).unwrap();
        assert!(dataset.is_empty());
    }

    #[test]
    fn test_csv_roundtrip_through_loader() {
        let dir = std::env::temp_dir().join(format!("amr-signals-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let samples_path = dir.join("samples.csv");
        let tests_path = dir.join("ast_results.csv");
        std::fs::write(
            &samples_path,
            " sample_id ,collection_date,region,district,source_category,latitude,longitude\n\
             S1,2024-01-05,Ashanti,Kumasi,FOOD,6.69,-1.62\n",
        )
        .unwrap();
        std::fs::write(
            &tests_path,
            "sample_id,isolate_id,organism,antibiotic,result,test_date\n\
             S1,I1,E. coli,Ampicillin,R,2024-01-10\n\
             S1,I1,E. coli,Gentamicin,S,\n",
        )
        .unwrap();

        let dataset = Dataset::from_files(&samples_path, &tests_path).unwrap();
        assert_eq!(dataset.samples().len(), 1);
        assert_eq!(dataset.tests().len(), 2);
        assert_eq!(dataset.tests()[1].test_date, None);

        let unsupported = Dataset::from_files(dir.join("samples.xlsx"), &tests_path);
        assert!(matches!(unsupported, Err(AmrError::UnsupportedFile(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_filter_by_sample_and_test_attributes() {
        let samples = vec![
            sample("S1", "Ashanti", "Kumasi", SourceCategory::Food),
            sample("S2", "Volta", "Ho", SourceCategory::Environment),
        ];
        let tests = vec![
            dated(resistant("S1", "I1", "E. coli", "Ampicillin"), 2024, 1, 10),
            dated(susceptible("S1", "I1", "E. coli", "Gentamicin"), 2024, 3, 1),
            resistant("S2", "I2", "Salmonella", "Ampicillin"),
        ];
        let dataset = Dataset::new(samples, tests);

        let by_region = dataset.filter(&DatasetFilter {
            regions: vec!["Ashanti".into()],
            ..Default::default()
        });
        assert_eq!(by_region.samples().len(), 1);
        assert_eq!(by_region.tests().len(), 2);

        let by_date = dataset.filter(&DatasetFilter {
            date_to: NaiveDate::from_ymd_opt(2024, 1, 31),
            ..Default::default()
        });
        assert_eq!(by_date.tests().len(), 1);

        let by_antibiotic = dataset.filter(&DatasetFilter {
            antibiotics: vec!["Ampicillin".into()],
            ..Default::default()
        });
        assert_eq!(by_antibiotic.tests().len(), 2);
        assert_eq!(by_antibiotic.samples().len(), 2);

        // the source snapshot is untouched
        assert_eq!(dataset.tests().len(), 3);
    }

    #[test]
    fn test_group_by_isolate_orders_by_id() {
        let tests = vec![
            resistant("S1", "I2", "E. coli", "Ampicillin"),
            resistant("S1", "I1", "E. coli", "Ampicillin"),
            susceptible("S1", "I2", "E. coli", "Gentamicin"),
        ];
        let groups = group_by_isolate(&tests);
        let ids: Vec<&str> = groups.keys().copied().collect();
        assert_eq!(ids, vec!["I1", "I2"]);
        assert_eq!(groups["I2"].len(), 2);
    }
}
