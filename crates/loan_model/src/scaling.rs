//! Standardization parameters
//!
//! Fitted once on the training subset and reused unchanged for the test
//! subset and for inference.

use crate::errors::{ModelError, Result};
use serde::{Deserialize, Serialize};

/// Mean and standard deviation of one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScale {
    pub name: String,
    pub mean: f64,
    /// Population standard deviation. Zero means the feature is centered
    /// but not divided.
    pub std: f64,
}

impl FeatureScale {
    pub fn apply(&self, value: f64) -> f64 {
        if self.std == 0.0 {
            value - self.mean
        } else {
            (value - self.mean) / self.std
        }
    }
}

/// Per-feature scaling, in feature order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingParams {
    pub features: Vec<FeatureScale>,
}

impl ScalingParams {
    pub fn new(features: Vec<FeatureScale>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.name.as_str())
    }

    /// Scale one feature vector
    pub fn apply_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.features.len() {
            return Err(ModelError::FeatureCount {
                expected: self.features.len(),
                actual: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(&self.features)
            .map(|(&value, scale)| scale.apply(value))
            .collect())
    }

    /// Scale every row with the same parameters
    pub fn apply(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.apply_row(row)).collect()
    }

    pub fn validate(&self) -> Result<()> {
        for scale in &self.features {
            if !scale.mean.is_finite() || !scale.std.is_finite() || scale.std < 0.0 {
                return Err(ModelError::InvalidModel(format!(
                    "invalid scaling for `{}`: mean={}, std={}",
                    scale.name, scale.mean, scale.std
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ScalingParams {
        ScalingParams::new(vec![
            FeatureScale {
                name: "a".into(),
                mean: 10.0,
                std: 2.0,
            },
            FeatureScale {
                name: "b".into(),
                mean: 5.0,
                std: 0.0,
            },
        ])
    }

    #[test]
    fn standardizes_and_centers_constant_features() {
        let scaled = params().apply_row(&[14.0, 7.0]).unwrap();
        assert_eq!(scaled, vec![2.0, 2.0]);
    }

    #[test]
    fn rejects_wrong_width() {
        assert!(matches!(
            params().apply_row(&[1.0]),
            Err(ModelError::FeatureCount { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn negative_std_is_invalid() {
        let mut p = params();
        p.features[0].std = -1.0;
        assert!(p.validate().is_err());
    }
}
