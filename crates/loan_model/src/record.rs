//! Raw loan-application records
//!
//! A record is one source row keyed by (trimmed) column name. Cells keep
//! their original text; trimming and null detection happen on access so the
//! same rules apply at training and inference time.

use crate::errors::{ModelError, Result};
use std::collections::BTreeMap;

/// Identifier column, dropped before modeling
pub const IDENTIFIER_COLUMN: &str = "loan_id";
/// Target label column (approval outcome)
pub const TARGET_COLUMN: &str = "loan_status";
/// Education level (categorical)
pub const EDUCATION_COLUMN: &str = "education";
/// Employment status (categorical)
pub const SELF_EMPLOYED_COLUMN: &str = "self_employed";

/// The four asset-value columns folded into [`ASSETS_COLUMN`]
pub const ASSET_COLUMNS: [&str; 4] = [
    "residential_assets_value",
    "commercial_assets_value",
    "luxury_assets_value",
    "bank_asset_value",
];

/// Derived column holding the sum of [`ASSET_COLUMNS`]
pub const ASSETS_COLUMN: &str = "Assets";

/// Categorical columns encoded by the default transform
pub const CATEGORICAL_COLUMNS: [&str; 3] = [EDUCATION_COLUMN, SELF_EMPLOYED_COLUMN, TARGET_COLUMN];

/// Columns every input dataset must carry
pub const REQUIRED_COLUMNS: [&str; 11] = [
    IDENTIFIER_COLUMN,
    EDUCATION_COLUMN,
    SELF_EMPLOYED_COLUMN,
    "loan_amount",
    "loan_term",
    "cibil_score",
    "residential_assets_value",
    "commercial_assets_value",
    "luxury_assets_value",
    "bank_asset_value",
    TARGET_COLUMN,
];

/// Cell contents treated as missing (compared case-insensitively after trim)
const NULL_MARKERS: [&str; 5] = ["", "na", "n/a", "nan", "null"];

/// Returns true when a raw cell denotes a missing value
pub fn is_null_cell(raw: &str) -> bool {
    let trimmed = raw.trim();
    NULL_MARKERS
        .iter()
        .any(|marker| trimmed.eq_ignore_ascii_case(marker))
}

/// One raw row, keyed by trimmed column name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    cells: BTreeMap<String, String>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from header/cell pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut record = Self::new();
        for (column, value) in pairs {
            record.insert(column.as_ref(), value);
        }
        record
    }

    pub fn insert(&mut self, column: &str, value: impl Into<String>) {
        self.cells.insert(column.trim().to_string(), value.into());
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    /// Raw cell text, untrimmed
    pub fn raw(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    /// Trimmed, non-null cell value.
    ///
    /// `row` is the 1-based data row used in error messages.
    pub fn require(&self, column: &str, row: usize) -> Result<&str> {
        let raw = self
            .raw(column)
            .ok_or_else(|| ModelError::MissingColumn(column.to_string()))?;
        if is_null_cell(raw) {
            return Err(ModelError::MissingValue {
                column: column.to_string(),
                row,
            });
        }
        Ok(raw.trim())
    }

    /// Finite numeric cell value
    pub fn numeric(&self, column: &str, row: usize) -> Result<f64> {
        let text = self.require(column, row)?;
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(ModelError::Parse {
                column: column.to_string(),
                row,
                value: text.to_string(),
            }),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }
}
