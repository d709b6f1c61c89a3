//! Random-forest classifier
//!
//! An ensemble of independently grown classification trees. Prediction is a
//! majority vote; ties go to the lowest class code so the result never
//! depends on iteration order.

use super::tree::Tree;
use crate::errors::{ModelError, Result};
use crate::serde_canon::hash_canonical_hex;
use serde::{Deserialize, Serialize};

/// Current forest format version
pub const FOREST_VERSION: i32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RandomForest {
    /// Model format version
    pub version: i32,

    /// Width of the feature vectors the trees were grown on
    pub n_features: usize,

    /// Number of target classes (codes `0..n_classes`)
    pub n_classes: usize,

    /// Trees in the ensemble
    pub trees: Vec<Tree>,
}

impl RandomForest {
    pub fn new(trees: Vec<Tree>, n_features: usize, n_classes: usize) -> Self {
        Self {
            version: FOREST_VERSION,
            n_features,
            n_classes,
            trees,
        }
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != FOREST_VERSION {
            return Err(ModelError::InvalidModel(format!(
                "Unsupported forest version: {}",
                self.version
            )));
        }
        if self.trees.is_empty() {
            return Err(ModelError::InvalidModel("forest has no trees".into()));
        }
        if self.n_classes == 0 {
            return Err(ModelError::InvalidModel("forest has no classes".into()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.n_classes).map_err(|e| {
                ModelError::InvalidModel(format!("Tree {i} validation failed: {e}"))
            })?;
        }
        Ok(())
    }

    /// Per-class vote counts for one feature vector
    pub fn votes(&self, features: &[f64]) -> Result<Vec<usize>> {
        if features.len() != self.n_features {
            return Err(ModelError::FeatureCount {
                expected: self.n_features,
                actual: features.len(),
            });
        }

        let mut votes = vec![0usize; self.n_classes];
        for (i, tree) in self.trees.iter().enumerate() {
            let class = tree
                .evaluate(features)
                .filter(|&c| (c as usize) < self.n_classes)
                .ok_or_else(|| ModelError::InvalidModel(format!("Tree {i} failed to evaluate")))?;
            votes[class as usize] += 1;
        }
        Ok(votes)
    }

    /// Majority-vote class for one feature vector
    pub fn predict_one(&self, features: &[f64]) -> Result<u32> {
        let votes = self.votes(features)?;
        let mut best = 0usize;
        for (class, &count) in votes.iter().enumerate() {
            if count > votes[best] {
                best = class;
            }
        }
        Ok(best as u32)
    }

    /// Fraction of trees voting for each class
    pub fn predict_proba_one(&self, features: &[f64]) -> Result<Vec<f64>> {
        let votes = self.votes(features)?;
        let total = self.trees.len() as f64;
        Ok(votes.into_iter().map(|v| v as f64 / total).collect())
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<u32>> {
        rows.iter().map(|row| self.predict_one(row)).collect()
    }

    /// BLAKE3 hash of the canonical JSON form
    pub fn hash_hex(&self) -> Result<String> {
        Ok(hash_canonical_hex(self)?)
    }
}
