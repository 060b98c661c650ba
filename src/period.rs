//! Calendar time buckets used for trend analysis.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Aggregation unit for time-bucketed statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    Month,
    Quarter,
    Year,
}

impl TimeUnit {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "month" | "monthly" | "m" => Some(Self::Month),
            "quarter" | "quarterly" | "q" => Some(Self::Quarter),
            "year" | "yearly" | "annual" | "y" => Some(Self::Year),
            _ => None,
        }
    }
}

/// A single calendar period. Periods of the same unit order chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Period {
    Year(i32),
    /// year, quarter (1-4)
    Quarter(i32, u32),
    /// year, month (1-12)
    Month(i32, u32),
}

impl Period {
    pub fn containing(date: NaiveDate, unit: TimeUnit) -> Self {
        match unit {
            TimeUnit::Month => Period::Month(date.year(), date.month()),
            TimeUnit::Quarter => Period::Quarter(date.year(), (date.month() - 1) / 3 + 1),
            TimeUnit::Year => Period::Year(date.year()),
        }
    }

    pub fn unit(&self) -> TimeUnit {
        match self {
            Period::Year(_) => TimeUnit::Year,
            Period::Quarter(..) => TimeUnit::Quarter,
            Period::Month(..) => TimeUnit::Month,
        }
    }

    /// The period immediately after this one.
    pub fn next(&self) -> Self {
        match *self {
            Period::Year(year) => Period::Year(year + 1),
            Period::Quarter(year, 4) => Period::Quarter(year + 1, 1),
            Period::Quarter(year, quarter) => Period::Quarter(year, quarter + 1),
            Period::Month(year, 12) => Period::Month(year + 1, 1),
            Period::Month(year, month) => Period::Month(year, month + 1),
        }
    }

    /// The period `n` steps after this one.
    pub fn advance(&self, n: usize) -> Self {
        (0..n).fold(*self, |period, _| period.next())
    }

    /// Human-readable label: `2025-01`, `2025 Q1` or `2025`.
    pub fn label(&self) -> String {
        match self {
            Period::Year(year) => format!("{year}"),
            Period::Quarter(year, quarter) => format!("{year} Q{quarter}"),
            Period::Month(year, month) => format!("{year}-{month:02}"),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
