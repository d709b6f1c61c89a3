//! Standard scaler
//!
//! Fits per-feature mean and population standard deviation on the train
//! subset. The fitted [`ScalingParams`] are applied unchanged to the test
//! subset and persisted for inference.

use crate::config::ZeroVariancePolicy;
use crate::dataset::EncodedDataset;
use crate::errors::{PipelineError, Result};
use loan_model::{FeatureScale, ScalingParams};
use tracing::{debug, error, warn};

#[derive(Clone, Debug, Default)]
pub struct StandardScaler {
    policy: ZeroVariancePolicy,
}

impl StandardScaler {
    pub fn new(policy: ZeroVariancePolicy) -> Self {
        Self { policy }
    }

    /// Fit on `train`. Only the feature columns are read.
    pub fn fit(&self, train: &EncodedDataset) -> Result<ScalingParams> {
        if train.is_empty() {
            return Err(PipelineError::InvalidInput(
                "cannot fit scaler on an empty subset".into(),
            ));
        }

        let n = train.len() as f64;
        let mut features = Vec::with_capacity(train.n_features());

        for (idx, name) in train.feature_names.iter().enumerate() {
            let column = train.features.iter().map(|row| row[idx]);

            let mean = column.clone().sum::<f64>() / n;
            let constant = column.clone().all(|v| v == train.features[0][idx]);
            let std = if constant {
                0.0
            } else {
                (column.map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
            };

            if std == 0.0 {
                match self.policy {
                    ZeroVariancePolicy::Fail => {
                        error!(feature = %name, "zero variance in train subset");
                        return Err(PipelineError::ZeroVariance(name.clone()));
                    }
                    ZeroVariancePolicy::Passthrough => {
                        warn!(feature = %name, mean, "zero variance, feature centered only");
                    }
                }
            }

            debug!(feature = %name, mean, std, "feature scale fitted");
            features.push(FeatureScale {
                name: name.clone(),
                mean,
                std,
            });
        }

        Ok(ScalingParams::new(features))
    }

    /// Scale every row of `dataset` with `params`
    pub fn transform(params: &ScalingParams, dataset: &EncodedDataset) -> Result<EncodedDataset> {
        Ok(EncodedDataset {
            features: params.apply(&dataset.features)?,
            ..dataset.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(rows: Vec<Vec<f64>>) -> EncodedDataset {
        EncodedDataset {
            feature_names: vec!["a".into(), "b".into()],
            target: "loan_status".into(),
            labels: vec![0; rows.len()],
            features: rows,
        }
    }

    #[test]
    fn population_statistics() {
        let train = dataset(vec![vec![1.0, 10.0], vec![3.0, 20.0], vec![5.0, 30.0], vec![7.0, 40.0]]);
        let params = StandardScaler::default().fit(&train).unwrap();

        assert_eq!(params.features[0].mean, 4.0);
        assert!((params.features[0].std - 5.0f64.sqrt()).abs() < 1e-12);
        assert_eq!(params.features[1].mean, 25.0);

        let scaled = StandardScaler::transform(&params, &train).unwrap();
        let col_mean: f64 = scaled.features.iter().map(|r| r[0]).sum::<f64>() / 4.0;
        assert!(col_mean.abs() < 1e-12);
        assert_eq!(scaled.labels, train.labels);
    }

    #[test]
    fn test_subset_does_not_affect_parameters() {
        let train = dataset(vec![vec![1.0, 2.0], vec![3.0, 6.0]]);
        let params = StandardScaler::default().fit(&train).unwrap();

        let test_a = dataset(vec![vec![100.0, -5.0]]);
        let test_b = dataset(vec![vec![-40.0, 9.0], vec![0.5, 0.5]]);
        StandardScaler::transform(&params, &test_a).unwrap();
        StandardScaler::transform(&params, &test_b).unwrap();

        assert_eq!(StandardScaler::default().fit(&train).unwrap(), params);
        let scaled = StandardScaler::transform(&params, &test_a).unwrap();
        assert_eq!(scaled.features[0][0], (100.0 - 2.0) / 1.0);
    }

    #[test]
    fn constant_feature_fails_by_default() {
        let train = dataset(vec![vec![1.0, 0.1], vec![2.0, 0.1], vec![3.0, 0.1]]);
        assert!(matches!(
            StandardScaler::default().fit(&train),
            Err(PipelineError::ZeroVariance(name)) if name == "b"
        ));
    }

    #[test]
    fn constant_feature_is_centered_under_passthrough() {
        let train = dataset(vec![vec![1.0, 4.0], vec![2.0, 4.0]]);
        let params = StandardScaler::new(ZeroVariancePolicy::Passthrough)
            .fit(&train)
            .unwrap();
        assert_eq!(params.features[1].std, 0.0);

        let scaled = StandardScaler::transform(&params, &dataset(vec![vec![1.0, 6.0]])).unwrap();
        assert_eq!(scaled.features[0][1], 2.0);
        assert!(scaled.features.iter().flatten().all(|v| v.is_finite()));
    }
}
