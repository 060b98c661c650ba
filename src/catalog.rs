//! Drug-Class Catalog: antibiotic name to pharmacological class(es).
//!
//! Loaded and validated once, then shared read-only by the MDR detector,
//! the cross-resistance screen and anything else that reasons in classes.
//! Antibiotics missing from the catalog act as a class of their own, named
//! after the antibiotic, so they still count without failing.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;

use polars::prelude::*;

use crate::dataset::{read_table, require_columns, string_values};
use crate::error::{AmrError, Result};
use crate::schema::catalog;

/// Reference table shipped with the crate.
const BUILTIN_ENTRIES: &[(&str, &str)] = &[
    ("Amoxicillin", "Beta-lactams"),
    ("Amoxicillin-clavulanate", "Beta-lactams"),
    ("Ampicillin", "Beta-lactams"),
    ("Penicillin", "Beta-lactams"),
    ("Piperacillin", "Beta-lactams"),
    ("Oxacillin", "Beta-lactams"),
    ("Methicillin", "Beta-lactams"),
    ("Cephalosporin", "Beta-lactams"),
    ("Cefazolin", "Beta-lactams"),
    ("Cephalexin", "Beta-lactams"),
    ("Cefuroxime", "Beta-lactams"),
    ("Cefaclor", "Beta-lactams"),
    ("Cefoxitin", "Beta-lactams"),
    ("Ceftazidime", "Beta-lactams"),
    ("Cefotaxime", "Beta-lactams"),
    ("Ceftriaxone", "Beta-lactams"),
    ("Cefpodoxime", "Beta-lactams"),
    ("Cefepime", "Beta-lactams"),
    ("Imipenem", "Carbapenems"),
    ("Meropenem", "Carbapenems"),
    ("Ertapenem", "Carbapenems"),
    ("Doripenem", "Carbapenems"),
    ("Ciprofloxacin", "Quinolones"),
    ("Levofloxacin", "Quinolones"),
    ("Norfloxacin", "Quinolones"),
    ("Ofloxacin", "Quinolones"),
    ("Nalidixic acid", "Quinolones"),
    ("Gentamicin", "Aminoglycosides"),
    ("Streptomycin", "Aminoglycosides"),
    ("Tobramycin", "Aminoglycosides"),
    ("Amikacin", "Aminoglycosides"),
    ("Kanamycin", "Aminoglycosides"),
    ("Tetracycline", "Tetracyclines"),
    ("Doxycycline", "Tetracyclines"),
    ("Minocycline", "Tetracyclines"),
    ("Sulfamethoxazole", "Sulfonamides"),
    ("Trimethoprim", "Folate antagonists"),
    ("Trimethoprim-sulfamethoxazole", "Folate antagonists"),
    ("Chloramphenicol", "Phenicols"),
    ("Florfenicol", "Phenicols"),
    ("Erythromycin", "Macrolides"),
    ("Azithromycin", "Macrolides"),
    ("Clarithromycin", "Macrolides"),
    ("Clindamycin", "Lincosamides"),
    ("Vancomycin", "Glycopeptides"),
    ("Teicoplanin", "Glycopeptides"),
    ("Colistin", "Polymyxins"),
    ("Nitrofurantoin", "Nitrofurans"),
    ("Linezolid", "Oxazolidinones"),
    ("Fosfomycin", "Fosfomycins"),
];

#[derive(Debug, Clone)]
pub struct DrugClassCatalog {
    /// Keyed by normalised antibiotic name.
    classes: HashMap<String, Vec<String>>,
}

fn normalize(antibiotic: &str) -> String {
    antibiotic.trim().to_lowercase()
}

impl DrugClassCatalog {
    /// The reference table shipped with the crate.
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN_ENTRIES.iter().copied())
            .expect("built-in drug-class table is valid")
    }

    /// Build and validate a catalog from `(antibiotic, drug_class)` pairs.
    ///
    /// An antibiotic may appear under several classes; a repeated pair, or a
    /// blank name on either side, is rejected. Class labels are matched
    /// case-insensitively and keep the first spelling seen.
    pub fn from_entries<I, A, C>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (A, C)>,
        A: AsRef<str>,
        C: AsRef<str>,
    {
        let mut classes: HashMap<String, Vec<String>> = HashMap::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut labels: HashMap<String, String> = HashMap::new();

        for (row, (antibiotic, class)) in entries.into_iter().enumerate() {
            let antibiotic = antibiotic.as_ref().trim();
            let class = class.as_ref().trim();
            if antibiotic.is_empty() || class.is_empty() {
                return Err(AmrError::InvalidCatalog(format!(
                    "row {row} has a blank antibiotic or drug class"
                )));
            }
            let key = normalize(antibiotic);
            let class_key = normalize(class);
            if !seen.insert((key.clone(), class_key.clone())) {
                return Err(AmrError::InvalidCatalog(format!(
                    "duplicate entry {antibiotic} -> {class}"
                )));
            }
            let label = labels.entry(class_key).or_insert_with(|| class.to_string());
            classes.entry(key).or_default().push(label.clone());
        }

        if classes.is_empty() {
            log::warn!("Drug-class catalog is empty; every antibiotic will be its own class");
        }
        Ok(Self { classes })
    }

    /// Load from a DataFrame with `antibiotic` and `drug_class` columns.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        require_columns(df, &[catalog::ANTIBIOTIC, catalog::DRUG_CLASS])?;
        let antibiotics = string_values(df, catalog::ANTIBIOTIC)?;
        let classes = string_values(df, catalog::DRUG_CLASS)?;
        Self::from_entries(
            antibiotics
                .into_iter()
                .zip(classes)
                .map(|(a, c)| (a.unwrap_or_default(), c.unwrap_or_default())),
        )
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_frame(&read_table(path.as_ref())?)
    }

    /// Classes for an antibiotic; unknown antibiotics are their own class.
    pub fn classes_of<'a>(&'a self, antibiotic: &'a str) -> Vec<&'a str> {
        match self.classes.get(&normalize(antibiotic)) {
            Some(classes) => classes.iter().map(String::as_str).collect(),
            None => vec![antibiotic.trim()],
        }
    }

    /// Distinct classes covered by a set of antibiotics.
    ///
    /// Classes are compared case-insensitively, so an unknown antibiotic
    /// spelled two ways still counts once.
    pub fn distinct_classes<'a, I>(&'a self, antibiotics: I) -> BTreeSet<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut by_key: BTreeMap<String, &'a str> = BTreeMap::new();
        for class in antibiotics.into_iter().flat_map(|ab| self.classes_of(ab)) {
            by_key.entry(normalize(class)).or_insert(class);
        }
        by_key.into_values().collect()
    }

    pub fn contains(&self, antibiotic: &str) -> bool {
        self.classes.contains_key(&normalize(antibiotic))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Default for DrugClassCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup_is_case_insensitive() {
        let catalog = DrugClassCatalog::builtin();
        assert_eq!(catalog.classes_of("Ampicillin"), vec!["Beta-lactams"]);
        assert_eq!(catalog.classes_of(" tetracycline "), vec!["Tetracyclines"]);
        assert!(catalog.contains("GENTAMICIN"));
    }

    #[test]
    fn test_unknown_antibiotic_is_singleton_class() {
        let catalog = DrugClassCatalog::builtin();
        assert_eq!(catalog.classes_of("Zorbamycin"), vec!["Zorbamycin"]);
        assert!(!catalog.contains("Zorbamycin"));
    }

    #[test]
    fn test_combination_drug_is_one_class() {
        let catalog = DrugClassCatalog::builtin();
        assert_eq!(
            catalog.classes_of("Trimethoprim-sulfamethoxazole"),
            vec!["Folate antagonists"]
        );
        let classes = catalog.distinct_classes(["Trimethoprim-sulfamethoxazole", "Trimethoprim"]);
        assert_eq!(classes.len(), 1);
    }

    #[test]
    fn test_multi_class_antibiotic() {
        let catalog = DrugClassCatalog::from_entries([
            ("Sulfatrim", "Sulfonamides"),
            ("Sulfatrim", "Folate antagonists"),
        ])
        .unwrap();
        let classes = catalog.distinct_classes(["Sulfatrim"]);
        assert_eq!(classes.len(), 2);
        assert!(classes.contains("Sulfonamides"));
    }

    #[test]
    fn test_class_labels_are_case_insensitive() {
        let catalog = DrugClassCatalog::from_entries([
            ("Ampicillin", "Beta-lactams"),
            ("Amoxicillin", "beta-lactams "),
            ("Gentamicin", "Aminoglycosides"),
        ])
        .unwrap();
        assert_eq!(catalog.classes_of("Amoxicillin"), vec!["Beta-lactams"]);
        let classes = catalog.distinct_classes(["Ampicillin", "Amoxicillin", "Gentamicin"]);
        assert_eq!(
            classes.into_iter().collect::<Vec<_>>(),
            vec!["Aminoglycosides", "Beta-lactams"]
        );

        let unknown = catalog.distinct_classes(["Zorbamycin", "zorbamycin"]);
        assert_eq!(unknown.len(), 1);
    }

    #[test]
    fn test_validation_rejects_duplicates_and_blanks() {
        let dup = DrugClassCatalog::from_entries([
            ("Ampicillin", "Beta-lactams"),
            ("ampicillin", "beta-lactams"),
        ]);
        assert!(matches!(dup, Err(AmrError::InvalidCatalog(_))));
        let blank = DrugClassCatalog::from_entries([("Ampicillin", " ")]);
        assert!(matches!(blank, Err(AmrError::InvalidCatalog(_))));
    }

    #[test]
    fn test_from_frame() {
        let df = DataFrame::new(vec![
            Column::new(catalog::ANTIBIOTIC.into(), &["Ampicillin", "Colistin"]),
            Column::new(catalog::DRUG_CLASS.into(), &["Penicillins", "Polymyxins"]),
        ])
        .unwrap();
        let catalog = DrugClassCatalog::from_frame(&df).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.classes_of("ampicillin"), vec!["Penicillins"]);
        // Not in this custom table, so it falls back to its own name.
        assert_eq!(catalog.classes_of("Gentamicin"), vec!["Gentamicin"]);
    }
}
