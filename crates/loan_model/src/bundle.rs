//! Model bundle
//!
//! The persisted artifact: the fitted forest together with the feature
//! transform and scaling parameters its inputs were produced with. The
//! `content_hash` covers everything except `metadata`, so retraining on the
//! same data with the same seeds reproduces the same hash.

use crate::errors::{ModelError, Result};
use crate::forest::RandomForest;
use crate::record::RawRecord;
use crate::scaling::ScalingParams;
use crate::serde_canon::hash_canonical_hex;
use crate::transform::FeatureTransform;
use serde::{Deserialize, Serialize};

/// Current bundle format version
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// Provenance of a bundle; excluded from the content hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleMetadata {
    /// Unix timestamp (seconds) of training
    pub created_at: i64,
    /// Version of the trainer that produced the bundle
    pub trainer_version: String,
    pub train_rows: usize,
    pub test_rows: usize,
    pub split_seed: u64,
    pub forest_seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub format_version: u32,
    /// BLAKE3 hex digest of the hashed content
    pub content_hash: String,
    pub metadata: BundleMetadata,
    pub transform: FeatureTransform,
    pub scaling: ScalingParams,
    pub forest: RandomForest,
}

#[derive(Serialize)]
struct HashedContent<'a> {
    format_version: u32,
    transform: &'a FeatureTransform,
    scaling: &'a ScalingParams,
    forest: &'a RandomForest,
}

impl ModelBundle {
    /// Assemble, validate and hash a bundle
    pub fn new(
        transform: FeatureTransform,
        scaling: ScalingParams,
        forest: RandomForest,
        metadata: BundleMetadata,
    ) -> Result<Self> {
        let mut bundle = Self {
            format_version: BUNDLE_FORMAT_VERSION,
            content_hash: String::new(),
            metadata,
            transform,
            scaling,
            forest,
        };
        bundle.validate_structure()?;
        bundle.content_hash = bundle.compute_hash()?;
        Ok(bundle)
    }

    pub fn compute_hash(&self) -> Result<String> {
        Ok(hash_canonical_hex(&HashedContent {
            format_version: self.format_version,
            transform: &self.transform,
            scaling: &self.scaling,
            forest: &self.forest,
        })?)
    }

    /// Structural checks plus content hash verification
    pub fn verify(&self) -> Result<()> {
        self.validate_structure()?;
        let actual = self.compute_hash()?;
        if actual != self.content_hash {
            return Err(ModelError::InvalidModel(format!(
                "content hash mismatch: recorded {}, computed {actual}",
                self.content_hash
            )));
        }
        Ok(())
    }

    fn validate_structure(&self) -> Result<()> {
        if self.format_version != BUNDLE_FORMAT_VERSION {
            return Err(ModelError::InvalidModel(format!(
                "Unsupported bundle format version: {}",
                self.format_version
            )));
        }

        self.transform.validate()?;
        self.scaling.validate()?;
        self.forest.validate()?;

        if !self.scaling.names().eq(self.transform.feature_names.iter().map(String::as_str)) {
            return Err(ModelError::InvalidModel(
                "scaling parameters do not match transform features".into(),
            ));
        }
        if self.forest.n_features != self.transform.n_features() {
            return Err(ModelError::InvalidModel(format!(
                "forest expects {} features, transform produces {}",
                self.forest.n_features,
                self.transform.n_features()
            )));
        }
        let n_labels = self.transform.target_mapping()?.len();
        if self.forest.n_classes != n_labels {
            return Err(ModelError::InvalidModel(format!(
                "forest has {} classes, target mapping has {n_labels}",
                self.forest.n_classes
            )));
        }
        Ok(())
    }

    /// Transformed and scaled feature vector for one raw record
    pub fn prepare_record(&self, record: &RawRecord, row: usize) -> Result<Vec<f64>> {
        let encoded = self.transform.encode_features(record, row)?;
        self.scaling.apply_row(&encoded)
    }

    /// Predicted class code for one raw record
    pub fn predict_record(&self, record: &RawRecord, row: usize) -> Result<u32> {
        let features = self.prepare_record(record, row)?;
        self.forest.predict_one(&features)
    }

    /// Predicted label text for one raw record
    pub fn predict_label(&self, record: &RawRecord, row: usize) -> Result<&str> {
        let code = self.predict_record(record, row)?;
        self.transform.decode_target(code)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::encoding::CategoryMapping;
    use crate::forest::{Node, Tree};
    use crate::scaling::FeatureScale;
    use std::collections::BTreeMap;

    pub(crate) fn sample_bundle() -> ModelBundle {
        let mut mappings = BTreeMap::new();
        mappings.insert(
            "education".to_string(),
            CategoryMapping::fit("education", ["Graduate", "Not Graduate"]),
        );
        mappings.insert(
            "loan_status".to_string(),
            CategoryMapping::fit("loan_status", ["Approved", "Rejected"]),
        );
        let transform = FeatureTransform {
            identifier: "loan_id".into(),
            target: "loan_status".into(),
            asset_columns: vec!["residential_assets_value".into(), "bank_asset_value".into()],
            derived_column: "Assets".into(),
            feature_names: vec!["education".into(), "cibil_score".into(), "Assets".into()],
            mappings,
        };
        let scaling = ScalingParams::new(vec![
            FeatureScale { name: "education".into(), mean: 0.5, std: 0.5 },
            FeatureScale { name: "cibil_score".into(), mean: 600.0, std: 100.0 },
            FeatureScale { name: "Assets".into(), mean: 1000.0, std: 500.0 },
        ]);
        // Approve when scaled cibil_score <= 0 is false, i.e. score above 600
        let forest = RandomForest::new(
            vec![Tree::new(vec![
                Node::internal(0, 1, 0.0, 1, 2),
                Node::leaf(1, 1),
                Node::leaf(2, 0),
            ])],
            3,
            2,
        );
        let metadata = BundleMetadata {
            created_at: 0,
            trainer_version: "test".into(),
            train_rows: 8,
            test_rows: 2,
            split_seed: 2,
            forest_seed: 42,
        };
        ModelBundle::new(transform, scaling, forest, metadata).unwrap()
    }

    fn applicant(score: &str) -> RawRecord {
        RawRecord::from_pairs([
            ("education", "Graduate"),
            ("cibil_score", score),
            ("residential_assets_value", "700"),
            ("bank_asset_value", "300"),
        ])
    }

    #[test]
    fn predicts_labels_from_raw_records() {
        let bundle = sample_bundle();
        assert_eq!(bundle.predict_label(&applicant("780"), 1).unwrap(), "Approved");
        assert_eq!(bundle.predict_label(&applicant("410"), 1).unwrap(), "Rejected");
        assert_eq!(
            bundle.prepare_record(&applicant("700"), 1).unwrap(),
            vec![-1.0, 1.0, 0.0]
        );
    }

    #[test]
    fn hash_ignores_metadata() {
        let a = sample_bundle();
        let mut b = sample_bundle();
        b.metadata.created_at = 1_700_000_000;
        assert_eq!(a.content_hash, b.compute_hash().unwrap());
        assert!(b.verify().is_ok());
    }

    #[test]
    fn tampering_breaks_verification() {
        let mut bundle = sample_bundle();
        bundle.scaling.features[1].mean = 650.0;
        assert!(bundle.verify().is_err());
    }

    #[test]
    fn mismatched_class_count_is_rejected() {
        let b = sample_bundle();
        let forest = RandomForest::new(b.forest.trees.clone(), 3, 3);
        assert!(ModelBundle::new(b.transform, b.scaling, forest, b.metadata).is_err());
    }
}
