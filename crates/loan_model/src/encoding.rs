//! Categorical encoding
//!
//! Each categorical column owns one [`CategoryMapping`]. Codes are assigned
//! to the sorted distinct trimmed values, so the same set of values always
//! maps to the same codes `0..k`. The mapping is stored in both directions
//! and persisted with the model.

use crate::errors::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Value ↔ code mapping for a single categorical column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMapping {
    /// Column this mapping belongs to
    pub column: String,
    /// Category value → code
    pub codes: BTreeMap<String, u32>,
    /// Code → category value (index is the code)
    pub values: Vec<String>,
}

impl CategoryMapping {
    /// Build a mapping from every observed value of `column`.
    ///
    /// Values are trimmed before they are collected.
    pub fn fit<I, S>(column: impl Into<String>, observed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = observed
            .into_iter()
            .map(|value| value.as_ref().trim().to_string())
            .collect();

        let values: Vec<String> = distinct.into_iter().collect();
        let codes = values
            .iter()
            .enumerate()
            .map(|(code, value)| (value.clone(), code as u32))
            .collect();

        Self {
            column: column.into(),
            codes,
            values,
        }
    }

    /// Number of distinct categories
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Code for a (possibly untrimmed) category value
    pub fn encode(&self, value: &str) -> Result<u32> {
        let trimmed = value.trim();
        self.codes
            .get(trimmed)
            .copied()
            .ok_or_else(|| ModelError::Encoding {
                column: self.column.clone(),
                value: trimmed.to_string(),
            })
    }

    /// Category value for a code
    pub fn decode(&self, code: u32) -> Result<&str> {
        self.values
            .get(code as usize)
            .map(String::as_str)
            .ok_or_else(|| ModelError::Encoding {
                column: self.column.clone(),
                value: format!("#{code}"),
            })
    }

    /// Check that both directions describe the same bijection onto `0..k`
    pub fn validate(&self) -> Result<()> {
        if self.values.is_empty() {
            return Err(ModelError::InvalidModel(format!(
                "mapping for `{}` has no categories",
                self.column
            )));
        }
        if self.codes.len() != self.values.len() {
            return Err(ModelError::InvalidModel(format!(
                "mapping for `{}` has {} codes but {} values",
                self.column,
                self.codes.len(),
                self.values.len()
            )));
        }
        for (code, value) in self.values.iter().enumerate() {
            if self.codes.get(value) != Some(&(code as u32)) {
                return Err(ModelError::InvalidModel(format!(
                    "mapping for `{}` is inconsistent at code {code}",
                    self.column
                )));
            }
        }
        Ok(())
    }
}
