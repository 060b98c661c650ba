//! Phenotypic resistance-mechanism screening.
//!
//! Each rule looks at one isolate's results against a small screening panel.
//! Antibiotic names match a panel drug when they contain it, ignoring case,
//! so `"Ceftazidime 30ug"` counts as Ceftazidime. Organisms are matched the
//! same way against the names each rule applies to.

use std::fmt;

use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

use crate::dataset::group_by_isolate;
use crate::model::{SusceptibilityResult, TestRecord};
use crate::schema::isolate;

const THIRD_GEN_CEPHALOSPORINS: [&str; 4] =
    ["ceftazidime", "cefotaxime", "ceftriaxone", "cefpodoxime"];
const AMPC_PANEL: [&str; 4] = ["ceftazidime", "cefotaxime", "ceftriaxone", "cefepime"];
const CARBAPENEMS: [&str; 4] = ["imipenem", "meropenem", "ertapenem", "doripenem"];
const ANTI_STAPHYLOCOCCAL_PENICILLINS: [&str; 2] = ["oxacillin", "methicillin"];

const ESBL_PRODUCERS: [&str; 7] = [
    "escherichia",
    "e. coli",
    "klebsiella",
    "enterobacter",
    "salmonella",
    "proteus",
    "citrobacter",
];
const AMPC_PRODUCERS: [&str; 5] = [
    "enterobacter",
    "citrobacter",
    "serratia",
    "pseudomonas",
    "acinetobacter",
];
const STAPHYLOCOCCUS_AUREUS: [&str; 2] = ["staphylococcus aureus", "s. aureus"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Mechanism {
    Esbl,
    Carbapenemase,
    Mrsa,
    AmpC,
    Vrsa,
    Visa,
}

impl Mechanism {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Esbl => "ESBL",
            Self::Carbapenemase => "Carbapenemase",
            Self::Mrsa => "MRSA",
            Self::AmpC => "AmpC",
            Self::Vrsa => "VRSA",
            Self::Visa => "VISA",
        }
    }
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MechanismConfidence {
    High,
    Moderate,
}

impl fmt::Display for MechanismConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::High => "High",
            Self::Moderate => "Moderate",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MechanismFinding {
    pub isolate_id: String,
    pub organism: String,
    pub mechanism: Mechanism,
    pub confidence: MechanismConfidence,
    /// Panel drugs with a resistant (or, for VISA, intermediate) result.
    pub resistant_antibiotics: usize,
    /// Panel drugs tested at all.
    pub tested_antibiotics: usize,
}

/// Panel drugs tested and panel drugs with at least one matching result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PanelHits {
    tested: usize,
    matched: usize,
}

impl PanelHits {
    fn confidence(&self) -> MechanismConfidence {
        if self.matched == self.tested {
            MechanismConfidence::High
        } else {
            MechanismConfidence::Moderate
        }
    }
}

fn name_matches(name: &str, terms: &[&str]) -> bool {
    let name = name.to_lowercase();
    terms.iter().any(|term| name.contains(term))
}

fn screen_panel(
    records: &[&TestRecord],
    panel: &[&str],
    wanted: SusceptibilityResult,
) -> PanelHits {
    let mut hits = PanelHits::default();
    for drug in panel {
        let mut on_panel = records
            .iter()
            .filter(|r| name_matches(&r.antibiotic, &[*drug]))
            .peekable();
        if on_panel.peek().is_none() {
            continue;
        }
        hits.tested += 1;
        if on_panel.any(|r| r.result == wanted) {
            hits.matched += 1;
        }
    }
    hits
}

fn screen_isolate(isolate_id: &str, records: &[&TestRecord]) -> Vec<MechanismFinding> {
    let organism = records[0].organism.as_str();
    let finding = |mechanism, confidence, hits: PanelHits| MechanismFinding {
        isolate_id: isolate_id.to_string(),
        organism: organism.to_string(),
        mechanism,
        confidence,
        resistant_antibiotics: hits.matched,
        tested_antibiotics: hits.tested,
    };
    let mut findings = Vec::new();
    let resistant = SusceptibilityResult::Resistant;

    if name_matches(organism, &ESBL_PRODUCERS) {
        let hits = screen_panel(records, &THIRD_GEN_CEPHALOSPORINS, resistant);
        if hits.tested >= 2 && hits.matched >= 2 {
            findings.push(finding(Mechanism::Esbl, hits.confidence(), hits));
        }
    }

    let hits = screen_panel(records, &CARBAPENEMS, resistant);
    if hits.matched >= 1 {
        findings.push(finding(Mechanism::Carbapenemase, MechanismConfidence::High, hits));
    }

    if name_matches(organism, &AMPC_PRODUCERS) {
        let hits = screen_panel(records, &AMPC_PANEL, resistant);
        if hits.tested >= 2 && hits.matched >= 2 {
            findings.push(finding(Mechanism::AmpC, hits.confidence(), hits));
        }
    }

    if name_matches(organism, &STAPHYLOCOCCUS_AUREUS) {
        let single = PanelHits { tested: 1, matched: 1 };
        let methicillin = screen_panel(records, &ANTI_STAPHYLOCOCCAL_PENICILLINS, resistant);
        if methicillin.matched >= 1 {
            findings.push(finding(Mechanism::Mrsa, MechanismConfidence::High, single));
        }

        let vancomycin_r = screen_panel(records, &["vancomycin"], resistant);
        let vancomycin_i =
            screen_panel(records, &["vancomycin"], SusceptibilityResult::Intermediate);
        if vancomycin_r.matched >= 1 {
            findings.push(finding(Mechanism::Vrsa, MechanismConfidence::High, single));
        } else if vancomycin_i.matched >= 1 {
            findings.push(finding(Mechanism::Visa, MechanismConfidence::High, single));
        }
    }
    findings
}

/// Screen every isolate for known resistance mechanisms.
///
/// Isolates are screened in parallel. The result holds one row per
/// (isolate, mechanism), ordered by isolate then mechanism.
pub fn screen_mechanisms(tests: &[TestRecord]) -> Vec<MechanismFinding> {
    let groups: Vec<(&str, Vec<&TestRecord>)> = group_by_isolate(tests).into_iter().collect();

    let mut findings: Vec<MechanismFinding> = groups
        .par_iter()
        .flat_map_iter(|(isolate_id, records)| screen_isolate(isolate_id, records))
        .collect();
    findings.sort_by(|a, b| a.isolate_id.cmp(&b.isolate_id).then(a.mechanism.cmp(&b.mechanism)));
    findings.dedup_by(|a, b| a.isolate_id == b.isolate_id && a.mechanism == b.mechanism);

    log::debug!("{} resistance-mechanism findings", findings.len());
    findings
}

pub fn to_frame(rows: &[MechanismFinding]) -> PolarsResult<DataFrame> {
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
            isolate::MECHANISM.into(),
            rows.iter().map(|r| r.mechanism.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            isolate::CONFIDENCE.into(),
            rows.iter().map(|r| r.confidence.to_string()).collect::<Vec<_>>(),
        ),
        Column::new(
            isolate::RESISTANT_ANTIBIOTICS.into(),
            rows.iter().map(|r| r.resistant_antibiotics as u64).collect::<Vec<_>>(),
        ),
        Column::new(
            isolate::TESTED_ANTIBIOTICS.into(),
            rows.iter().map(|r| r.tested_antibiotics as u64).collect::<Vec<_>>(),
        ),
    ])
}
