/// Column-name constants for amr-signals tables.
/// Single source of truth - exported to Python via PyO3.

// ── Test record columns ─────────────────────────────────────────────────────
pub mod test {
    pub const SAMPLE_ID: &str = "sample_id";
    pub const ISOLATE_ID: &str = "isolate_id";
    pub const ORGANISM: &str = "organism";
    pub const ANTIBIOTIC: &str = "antibiotic";
    pub const RESULT: &str = "result";
    pub const METHOD: &str = "method";
    pub const GUIDELINE: &str = "guideline";
    pub const TEST_DATE: &str = "test_date";
    pub const MIC_VALUE: &str = "mic_value";

    pub const REQUIRED: [&str; 6] =
        [SAMPLE_ID, ISOLATE_ID, ORGANISM, ANTIBIOTIC, RESULT, TEST_DATE];
}

// ── Sample record columns ───────────────────────────────────────────────────
pub mod sample {
    pub const SAMPLE_ID: &str = "sample_id";
    pub const COLLECTION_DATE: &str = "collection_date";
    pub const REGION: &str = "region";
    pub const DISTRICT: &str = "district";
    pub const SITE_TYPE: &str = "site_type";
    pub const SOURCE_CATEGORY: &str = "source_category";
    pub const SOURCE_TYPE: &str = "source_type";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";

    pub const REQUIRED: [&str; 5] = [SAMPLE_ID, COLLECTION_DATE, REGION, DISTRICT, SOURCE_CATEGORY];
}

// ── Drug-class catalog columns ──────────────────────────────────────────────
pub mod catalog {
    pub const ANTIBIOTIC: &str = "antibiotic";
    pub const DRUG_CLASS: &str = "drug_class";
}

// ── Resistance summary columns ──────────────────────────────────────────────
pub mod summary {
    pub const TOTAL_TESTS: &str = "total_tests";
    pub const RESISTANT: &str = "resistant";
    pub const INTERMEDIATE: &str = "intermediate";
    pub const SUSCEPTIBLE: &str = "susceptible";
    pub const PERCENT_RESISTANT: &str = "percent_resistant";
    pub const PERCENT_INTERMEDIATE: &str = "percent_intermediate";
    pub const PERCENT_SUSCEPTIBLE: &str = "percent_susceptible";
    pub const PERIOD: &str = "period";
}

// ── MDR / cross-resistance / mechanism columns ──────────────────────────────
pub mod isolate {
    pub const ISOLATE_ID: &str = "isolate_id";
    pub const ORGANISM: &str = "organism";
    pub const SAMPLE_ID: &str = "sample_id";
    pub const RESISTANT_DRUG_CLASSES: &str = "resistant_drug_classes";
    pub const DRUG_CLASS: &str = "drug_class";
    pub const DRUG_CLASSES: &str = "drug_classes";
    pub const RESISTANT_COUNT: &str = "resistant_count";
    pub const TESTED_COUNT: &str = "tested_count";
    pub const RESISTANT_ANTIBIOTICS: &str = "resistant_antibiotics";
    pub const TESTED_ANTIBIOTICS: &str = "tested_antibiotics";
    pub const LEVEL: &str = "level";
    pub const MECHANISM: &str = "resistance_mechanism";
    pub const CONFIDENCE: &str = "confidence";
}

// ── Co-resistance pattern columns ───────────────────────────────────────────
pub mod pattern {
    pub const ANTIBIOTIC_COMBINATION: &str = "antibiotic_combination";
    pub const ANTIBIOTIC_COUNT: &str = "antibiotic_count";
    pub const COUNT: &str = "count";
}

// ── Risk score columns ──────────────────────────────────────────────────────
pub mod risk {
    pub const ENTITY: &str = "entity";
    pub const RISK_SCORE: &str = "risk_score";
    pub const RISK_LEVEL: &str = "risk_level";
    pub const RESISTANCE_RATE: &str = "resistance_rate";
    pub const TEST_COUNT: &str = "test_count";
    pub const ANTIBIOTIC_DIVERSITY: &str = "antibiotic_diversity";
    pub const RISK_FACTORS: &str = "risk_factors";
}

// ── Forecast columns ────────────────────────────────────────────────────────
pub mod forecast {
    pub const PERIOD_INDEX: &str = "period_index";
    pub const PERIODS_AHEAD: &str = "periods_ahead";
    pub const PERIOD: &str = "period";
    pub const PREDICTED_RESISTANCE: &str = "predicted_resistance_rate";
    pub const CONFIDENCE: &str = "confidence";
}

// ── Alert columns ───────────────────────────────────────────────────────────
pub mod alert {
    pub const SEVERITY: &str = "severity";
    pub const MESSAGE: &str = "message";
    pub const ALERT_TYPE: &str = "type";
    pub const ORGANISM: &str = "organism";
    pub const ANTIBIOTIC: &str = "antibiotic";
    pub const RESISTANCE_RATE: &str = "resistance_rate";
    pub const TESTS: &str = "tests";
}

// ── Stewardship columns ─────────────────────────────────────────────────────
pub mod stewardship {
    pub const ANTIBIOTIC: &str = "antibiotic";
    pub const SUSCEPTIBILITY_RATE: &str = "susceptibility_rate";
    pub const TESTS: &str = "tests";
    pub const RECOMMENDATION: &str = "recommendation";
    pub const PRIORITY: &str = "priority";
}
