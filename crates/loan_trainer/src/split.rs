//! Seeded train/test partition

use crate::dataset::EncodedDataset;
use crate::errors::{PipelineError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

#[derive(Clone, Debug, PartialEq)]
pub struct DatasetSplit {
    pub train: EncodedDataset,
    pub test: EncodedDataset,
}

/// Row indices of the (train, test) partition.
///
/// The index order is a ChaCha8 shuffle of `0..n`; the first
/// `round(test_fraction * n)` shuffled indices form the test side.
pub fn split_indices(n: usize, test_fraction: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    if n == 0 {
        return Err(PipelineError::InvalidInput("cannot split an empty dataset".into()));
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(PipelineError::InvalidInput(format!(
            "test fraction must be in (0, 1), got {test_fraction}"
        )));
    }

    let n_test = (test_fraction * n as f64).round() as usize;
    if n_test == 0 || n_test >= n {
        return Err(PipelineError::InvalidInput(format!(
            "test fraction {test_fraction} of {n} rows leaves an empty subset"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok((train, indices))
}

/// Partition `dataset` into disjoint train and test subsets
pub fn train_test_split(dataset: &EncodedDataset, test_fraction: f64, seed: u64) -> Result<DatasetSplit> {
    let (train_idx, test_idx) = split_indices(dataset.len(), test_fraction, seed)?;

    let split = DatasetSplit {
        train: dataset.subset(&train_idx),
        test: dataset.subset(&test_idx),
    };
    info!(
        train_rows = split.train.len(),
        test_rows = split.test.len(),
        seed,
        "dataset split"
    );
    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn dataset(n: usize) -> EncodedDataset {
        EncodedDataset {
            feature_names: vec!["x".into()],
            target: "loan_status".into(),
            features: (0..n).map(|i| vec![i as f64]).collect(),
            labels: (0..n).map(|i| (i % 2) as u32).collect(),
        }
    }

    #[test]
    fn thousand_rows_hold_out_two_hundred() {
        let split = train_test_split(&dataset(1000), 0.2, 2).unwrap();
        assert_eq!(split.test.len(), 200);
        assert_eq!(split.train.len(), 800);
    }

    #[test]
    fn same_seed_same_partition() {
        let a = split_indices(50, 0.3, 7).unwrap();
        let b = split_indices(50, 0.3, 7).unwrap();
        let c = split_indices(50, 0.3, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn rejects_degenerate_inputs() {
        assert!(matches!(
            split_indices(0, 0.2, 1),
            Err(PipelineError::InvalidInput(_))
        ));
        for fraction in [0.0, 1.0, -0.5, f64::NAN] {
            assert!(matches!(
                split_indices(10, fraction, 1),
                Err(PipelineError::InvalidInput(_))
            ));
        }
        // round(0.01 * 10) == 0
        assert!(matches!(
            split_indices(10, 0.01, 1),
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(matches!(
            split_indices(1, 0.5, 1),
            Err(PipelineError::InvalidInput(_))
        ));
    }

    proptest! {
        #[test]
        fn partition_is_disjoint_and_complete(n in 2usize..400, fraction in 0.05f64..0.95, seed: u64) {
            let n_test = (fraction * n as f64).round() as usize;
            prop_assume!(n_test > 0 && n_test < n);

            let (train, test) = split_indices(n, fraction, seed).unwrap();
            prop_assert_eq!(test.len(), n_test);

            let train: BTreeSet<_> = train.into_iter().collect();
            let test: BTreeSet<_> = test.into_iter().collect();
            prop_assert!(train.is_disjoint(&test));
            prop_assert_eq!(train.len() + test.len(), n);
        }
    }
}
