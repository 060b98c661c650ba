//! Typed susceptibility-test and sample records.
//!
//! Records are created once when a dataset snapshot is built and are never
//! mutated by the analytics. Categorical fields that the upload pipeline may
//! spell in several ways are parsed leniently; anything unrecognised becomes
//! `None` rather than an error.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Formats accepted for `test_date` and `collection_date`.
pub const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Outcome of one antibiotic susceptibility test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SusceptibilityResult {
    Susceptible,
    Intermediate,
    Resistant,
}

impl SusceptibilityResult {
    /// Accepts the short codes `S`/`I`/`R` and the full words, in any case.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "S" | "SUSCEPTIBLE" => Some(Self::Susceptible),
            "I" | "INTERMEDIATE" => Some(Self::Intermediate),
            "R" | "RESISTANT" => Some(Self::Resistant),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Susceptible => "S",
            Self::Intermediate => "I",
            Self::Resistant => "R",
        }
    }
}

impl fmt::Display for SusceptibilityResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Susceptible => "Susceptible",
            Self::Intermediate => "Intermediate",
            Self::Resistant => "Resistant",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestMethod {
    DiskDiffusion,
    MinimumInhibitoryConcentration,
}

impl TestMethod {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dd" | "disk-diffusion" | "disk diffusion" => Some(Self::DiskDiffusion),
            "mic" | "minimum-inhibitory-concentration" | "minimum inhibitory concentration" => {
                Some(Self::MinimumInhibitoryConcentration)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Guideline {
    Clsi,
    Eucast,
}

impl Guideline {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CLSI" => Some(Self::Clsi),
            "EUCAST" => Some(Self::Eucast),
            _ => None,
        }
    }
}

/// Where a sample was collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceCategory {
    Environment,
    Food,
    Human,
    Animal,
    Aquaculture,
}

impl SourceCategory {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ENVIRONMENT" => Some(Self::Environment),
            "FOOD" => Some(Self::Food),
            "HUMAN" => Some(Self::Human),
            "ANIMAL" => Some(Self::Animal),
            "AQUACULTURE" => Some(Self::Aquaculture),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Environment => "ENVIRONMENT",
            Self::Food => "FOOD",
            Self::Human => "HUMAN",
            Self::Animal => "ANIMAL",
            Self::Aquaculture => "AQUACULTURE",
        }
    }
}

impl fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One susceptibility test result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    pub sample_id: String,
    pub isolate_id: String,
    pub organism: String,
    pub antibiotic: String,
    pub result: SusceptibilityResult,
    pub method: Option<TestMethod>,
    pub guideline: Option<Guideline>,
    /// `None` when the raw value could not be parsed.
    pub test_date: Option<NaiveDate>,
    pub mic_value: Option<f64>,
}

impl TestRecord {
    pub fn new(
        sample_id: impl Into<String>,
        isolate_id: impl Into<String>,
        organism: impl Into<String>,
        antibiotic: impl Into<String>,
        result: SusceptibilityResult,
    ) -> Self {
        Self {
            sample_id: sample_id.into(),
            isolate_id: isolate_id.into(),
            organism: organism.into(),
            antibiotic: antibiotic.into(),
            result,
            method: None,
            guideline: None,
            test_date: None,
            mic_value: None,
        }
    }

    pub fn with_test_date(mut self, date: NaiveDate) -> Self {
        self.test_date = Some(date);
        self
    }

    pub fn is_resistant(&self) -> bool {
        self.result == SusceptibilityResult::Resistant
    }
}

/// One collection event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub sample_id: String,
    pub collection_date: Option<NaiveDate>,
    pub region: String,
    pub district: String,
    pub site_type: Option<String>,
    pub source_category: Option<SourceCategory>,
    pub source_type: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl SampleRecord {
    pub fn new(
        sample_id: impl Into<String>,
        region: impl Into<String>,
        district: impl Into<String>,
        source_category: Option<SourceCategory>,
    ) -> Self {
        Self {
            sample_id: sample_id.into(),
            collection_date: None,
            region: region.into(),
            district: district.into(),
            site_type: None,
            source_category,
            source_type: None,
            latitude: None,
            longitude: None,
        }
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// True when both coordinates are present and within WGS84 bounds.
    pub fn has_valid_coordinates(&self) -> bool {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => {
                (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
            }
            _ => false,
        }
    }
}

/// Parse a calendar date from any of the accepted formats.
///
/// Timestamps (`2024-03-09 14:30:00`, `2024-03-09T14:30:00.000000`) keep
/// their date part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            let (day, time) = raw.split_at_checked(10)?;
            if !time.starts_with([' ', 'T']) {
                return None;
            }
            NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
        })
}

/// Blank, `nan` and `null` cells become `None`.
pub(crate) fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| {
            !s.is_empty() && !s.eq_ignore_ascii_case("nan") && !s.eq_ignore_ascii_case("null")
        })
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_parsing() {
        assert_eq!(SusceptibilityResult::parse("R"), Some(SusceptibilityResult::Resistant));
        assert_eq!(
            SusceptibilityResult::parse(" resistant "),
            Some(SusceptibilityResult::Resistant)
        );
        assert_eq!(SusceptibilityResult::parse("i"), Some(SusceptibilityResult::Intermediate));
        assert_eq!(
            SusceptibilityResult::parse("Susceptible"),
            Some(SusceptibilityResult::Susceptible)
        );
        assert_eq!(SusceptibilityResult::parse("X"), None);
    }

    #[test]
    fn test_date_parsing() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9);
        assert_eq!(parse_date("2024-03-09"), expected);
        assert_eq!(parse_date("09/03/2024"), expected);
        assert_eq!(parse_date("2024-03-09 14:30:00"), expected);
        assert_eq!(parse_date("2024-03-09T14:30:00"), expected);
        assert_eq!(parse_date("2024-03-09 00:00:00.000000"), expected);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("2024-02-30"), None);
    }

    #[test]
    fn test_coordinates_validation() {
        let sample = SampleRecord::new("S1", "Greater Accra", "Accra", Some(SourceCategory::Food));
        assert!(!sample.has_valid_coordinates());
        assert!(sample.clone().with_coordinates(5.6, -0.19).has_valid_coordinates());
        assert!(!sample.with_coordinates(95.0, -0.19).has_valid_coordinates());
    }

    #[test]
    fn test_categorical_parsing() {
        assert_eq!(TestMethod::parse("DD"), Some(TestMethod::DiskDiffusion));
        assert_eq!(TestMethod::parse("mic"), Some(TestMethod::MinimumInhibitoryConcentration));
        assert_eq!(Guideline::parse("eucast"), Some(Guideline::Eucast));
        assert_eq!(SourceCategory::parse("food"), Some(SourceCategory::Food));
        assert_eq!(SourceCategory::parse("space"), None);
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(Some("nan")), None);
        assert_eq!(non_blank(Some(" Accra ")), Some("Accra".to_string()));
    }
}
