//! Random-forest trainer
//!
//! Grows `n_trees` CART trees, each on its own bootstrap sample and its own
//! ChaCha8 stream, so a forest depends only on the data and the seed.

use loan_model::{ArtifactStore, ModelBundle, RandomForest};
use rand::Rng;
use tracing::{debug, error, info};

use crate::cart::{CartBuilder, TreeConfig};
use crate::config::{ForestConfig, MaxFeatures};
use crate::dataset::EncodedDataset;
use crate::deterministic::tree_rng;
use crate::errors::{PipelineError, Result};

/// Forest training parameters
#[derive(Clone, Debug, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub seed: u64,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        ForestConfig::default().into()
    }
}

impl From<ForestConfig> for ForestParams {
    fn from(config: ForestConfig) -> Self {
        Self {
            n_trees: config.n_trees,
            seed: config.seed,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            max_features: config.max_features,
            bootstrap: config.bootstrap,
        }
    }
}

/// Random-forest trainer
pub struct ForestTrainer {
    params: ForestParams,
}

impl ForestTrainer {
    pub fn new(params: ForestParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Fit a forest on scaled train features and their labels.
    ///
    /// `n_classes` is the size of the target mapping, which may exceed the
    /// classes present in `train`.
    pub fn train(&self, train: &EncodedDataset, n_classes: usize) -> Result<RandomForest> {
        if train.is_empty() {
            return Err(PipelineError::InvalidInput(
                "cannot train on an empty subset".into(),
            ));
        }
        if train.features.len() != train.labels.len() {
            return Err(PipelineError::InvalidInput(format!(
                "{} feature rows but {} labels",
                train.features.len(),
                train.labels.len()
            )));
        }
        if let Some(&label) = train.labels.iter().find(|&&l| l as usize >= n_classes) {
            return Err(PipelineError::InvalidInput(format!(
                "label {label} outside {n_classes} classes"
            )));
        }
        if self.params.n_trees == 0 {
            return Err(PipelineError::InvalidInput("n_trees must be positive".into()));
        }

        let n_samples = train.len();
        let n_features = train.n_features();
        let tree_config = TreeConfig {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf,
            max_features: self.params.max_features.resolve(n_features),
        };
        info!(
            n_trees = self.params.n_trees,
            seed = self.params.seed,
            max_features = tree_config.max_features,
            bootstrap = self.params.bootstrap,
            rows = n_samples,
            "training random forest"
        );

        let builder = CartBuilder::new(&train.features, &train.labels, n_classes, tree_config);
        let mut trees = Vec::with_capacity(self.params.n_trees);

        for tree_idx in 0..self.params.n_trees {
            let mut rng = tree_rng(self.params.seed, tree_idx);

            let sample: Vec<usize> = if self.params.bootstrap {
                (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
            } else {
                (0..n_samples).collect()
            };

            let tree = builder.build(&sample, &mut rng);
            debug!(
                tree = tree_idx + 1,
                nodes = tree.nodes.len(),
                depth = tree.depth(),
                "tree grown"
            );
            trees.push(tree);
        }

        let forest = RandomForest::new(trees, n_features, n_classes);
        forest.validate()?;
        info!(trees = forest.num_trees(), "model training completed");
        Ok(forest)
    }

    /// Write a bundle to the artifact store
    pub fn persist(store: &ArtifactStore, bundle: &ModelBundle) -> Result<()> {
        store.write(bundle).map_err(|e| {
            let e = PipelineError::from(e);
            error!(path = %store.path().display(), error = %e, "model save failed");
            e
        })?;
        info!(
            path = %store.path().display(),
            hash = %bundle.content_hash,
            "model saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> EncodedDataset {
        let features: Vec<Vec<f64>> = (0..60)
            .map(|i| {
                let x = i as f64;
                vec![x, (i % 7) as f64, (i * 13 % 17) as f64]
            })
            .collect();
        let labels = (0..60).map(|i| u32::from(i >= 30)).collect();
        EncodedDataset {
            feature_names: vec!["a".into(), "b".into(), "c".into()],
            target: "loan_status".into(),
            features,
            labels,
        }
    }

    fn params(n_trees: usize, seed: u64) -> ForestParams {
        ForestParams {
            n_trees,
            seed,
            ..ForestParams::default()
        }
    }

    #[test]
    fn test_train_simple_forest() {
        let data = dataset();
        let forest = ForestTrainer::new(params(25, 42)).train(&data, 2).unwrap();

        assert_eq!(forest.num_trees(), 25);
        assert_eq!(forest.n_features, 3);
        assert_eq!(forest.predict_one(&[2.0, 2.0, 9.0]).unwrap(), 0);
        assert_eq!(forest.predict_one(&[58.0, 2.0, 6.0]).unwrap(), 1);
    }

    #[test]
    fn test_same_seed_same_hash() {
        let data = dataset();
        let a = ForestTrainer::new(params(8, 42)).train(&data, 2).unwrap();
        let b = ForestTrainer::new(params(8, 42)).train(&data, 2).unwrap();
        let c = ForestTrainer::new(params(8, 43)).train(&data, 2).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.hash_hex().unwrap(), b.hash_hex().unwrap());
        assert_ne!(a.hash_hex().unwrap(), c.hash_hex().unwrap());
    }

    #[test]
    fn test_no_bootstrap_fits_training_rows() {
        let data = dataset();
        let forest = ForestTrainer::new(ForestParams {
            bootstrap: false,
            max_features: MaxFeatures::All,
            ..params(3, 1)
        })
        .train(&data, 2)
        .unwrap();

        let predictions = forest.predict(&data.features).unwrap();
        assert_eq!(predictions, data.labels);
    }

    #[test]
    fn test_rejects_bad_labels() {
        let mut data = dataset();
        data.labels[0] = 5;
        assert!(matches!(
            ForestTrainer::new(params(2, 1)).train(&data, 2),
            Err(PipelineError::InvalidInput(_))
        ));
    }
}
