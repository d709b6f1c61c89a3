//! Persisted feature transform
//!
//! Describes how a [`RawRecord`] becomes a model feature vector: which
//! columns feed the derived `Assets` feature, which columns are categorical
//! and the mapping each one uses, and the order of the resulting features.
//! The trainer builds this once from the training table and applies it row by
//! row; inference applies the persisted copy through the same code.

use crate::encoding::CategoryMapping;
use crate::errors::{ModelError, Result};
use crate::record::RawRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTransform {
    /// Identifier column dropped from every record
    pub identifier: String,
    /// Target label column
    pub target: String,
    /// Source columns summed into `derived_column`
    pub asset_columns: Vec<String>,
    /// Name of the derived asset-sum feature
    pub derived_column: String,
    /// Model feature order (target excluded)
    pub feature_names: Vec<String>,
    /// One independent mapping per categorical column, target included
    pub mappings: BTreeMap<String, CategoryMapping>,
}

impl FeatureTransform {
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn mapping(&self, column: &str) -> Option<&CategoryMapping> {
        self.mappings.get(column)
    }

    pub fn target_mapping(&self) -> Result<&CategoryMapping> {
        self.mappings.get(&self.target).ok_or_else(|| {
            ModelError::InvalidModel(format!("no mapping for target `{}`", self.target))
        })
    }

    /// Exact sum of the asset columns for one record
    pub fn derive_assets(&self, record: &RawRecord, row: usize) -> Result<f64> {
        let mut total = 0.0;
        for column in &self.asset_columns {
            total += record.numeric(column, row)?;
        }
        Ok(total)
    }

    /// Unscaled feature vector for one record, in `feature_names` order
    pub fn encode_features(&self, record: &RawRecord, row: usize) -> Result<Vec<f64>> {
        let mut features = Vec::with_capacity(self.feature_names.len());

        for name in &self.feature_names {
            let value = if *name == self.derived_column {
                self.derive_assets(record, row)?
            } else if let Some(mapping) = self.mappings.get(name) {
                f64::from(mapping.encode(record.require(name, row)?)?)
            } else {
                record.numeric(name, row)?
            };
            features.push(value);
        }

        Ok(features)
    }

    /// Feature vector for a single standalone record (reported as row 1)
    pub fn encode_record(&self, record: &RawRecord) -> Result<Vec<f64>> {
        self.encode_features(record, 1)
    }

    /// Encoded target label for one record
    pub fn encode_target(&self, record: &RawRecord, row: usize) -> Result<u32> {
        let mapping = self.target_mapping()?;
        mapping.encode(record.require(&self.target, row)?)
    }

    /// Original label for an encoded class
    pub fn decode_target(&self, code: u32) -> Result<&str> {
        self.target_mapping()?.decode(code)
    }

    pub fn validate(&self) -> Result<()> {
        if self.feature_names.is_empty() {
            return Err(ModelError::InvalidModel("transform has no features".into()));
        }
        if self.feature_names.iter().any(|name| *name == self.target)
            || self.feature_names.iter().any(|name| *name == self.identifier)
        {
            return Err(ModelError::InvalidModel(
                "identifier or target listed as a feature".into(),
            ));
        }
        if self
            .feature_names
            .iter()
            .any(|name| self.asset_columns.contains(name))
        {
            return Err(ModelError::InvalidModel(
                "asset source column listed as a feature".into(),
            ));
        }
        for (column, mapping) in &self.mappings {
            if *column != mapping.column {
                return Err(ModelError::InvalidModel(format!(
                    "mapping stored under `{column}` belongs to `{}`",
                    mapping.column
                )));
            }
            mapping.validate()?;
        }
        self.target_mapping()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ASSETS_COLUMN, ASSET_COLUMNS};

    fn transform() -> FeatureTransform {
        let mut mappings = BTreeMap::new();
        mappings.insert(
            "education".to_string(),
            CategoryMapping::fit("education", ["Graduate", "Not Graduate"]),
        );
        mappings.insert(
            "loan_status".to_string(),
            CategoryMapping::fit("loan_status", ["Approved", "Rejected"]),
        );
        FeatureTransform {
            identifier: "loan_id".into(),
            target: "loan_status".into(),
            asset_columns: ASSET_COLUMNS.iter().map(|c| c.to_string()).collect(),
            derived_column: ASSETS_COLUMN.into(),
            feature_names: vec!["education".into(), "cibil_score".into(), ASSETS_COLUMN.into()],
            mappings,
        }
    }

    fn record() -> RawRecord {
        RawRecord::from_pairs([
            ("loan_id", "1"),
            ("education", " Not Graduate"),
            ("cibil_score", "778"),
            ("residential_assets_value", "100"),
            ("commercial_assets_value", "200"),
            ("luxury_assets_value", "50"),
            ("bank_asset_value", "25"),
            ("loan_status", " Approved"),
        ])
    }

    #[test]
    fn encodes_in_feature_order() {
        let t = transform();
        assert_eq!(t.encode_features(&record(), 1).unwrap(), vec![1.0, 778.0, 375.0]);
        assert_eq!(t.encode_record(&record()).unwrap(), vec![1.0, 778.0, 375.0]);
        assert_eq!(t.encode_target(&record(), 1).unwrap(), 0);
        assert_eq!(t.decode_target(1).unwrap(), "Rejected");
    }

    #[test]
    fn null_asset_is_not_zero_filled() {
        let mut r = record();
        r.insert("luxury_assets_value", "");
        assert!(matches!(
            transform().derive_assets(&r, 7),
            Err(ModelError::MissingValue { ref column, row: 7 }) if column == "luxury_assets_value"
        ));
    }

    #[test]
    fn unseen_category_fails_at_inference() {
        let mut r = record();
        r.insert("education", "PhD");
        assert!(matches!(
            transform().encode_features(&r, 1),
            Err(ModelError::Encoding { .. })
        ));
    }

    #[test]
    fn validation_rejects_target_as_feature() {
        let mut t = transform();
        assert!(t.validate().is_ok());
        t.feature_names.push("loan_status".into());
        assert!(t.validate().is_err());
    }
}
