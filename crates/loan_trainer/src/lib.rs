//! Loan approval trainer - offline random-forest training pipeline
//!
//! Reads the raw loan CSV, derives and encodes features, splits and scales
//! them, fits a seeded random forest, and persists the model bundle used for
//! inference.

pub mod cart;
pub mod config;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod evaluator;
pub mod logging;
pub mod pipeline;
pub mod scaler;
pub mod schema;
pub mod split;
pub mod trainer;
pub mod transform;

pub use config::{MaxFeatures, PipelineConfig, ZeroVariancePolicy};
pub use dataset::{EncodedDataset, Table};
pub use deterministic::{tree_rng, SplitTieBreaker};
pub use errors::{PipelineError, Result};
pub use evaluator::{evaluate, EvaluationReport};
pub use pipeline::{predict_file, Pipeline, PipelineOutcome, Prediction};
pub use scaler::StandardScaler;
pub use schema::validate_columns;
pub use split::{train_test_split, DatasetSplit};
pub use trainer::{ForestParams, ForestTrainer};
pub use transform::FeatureTransformer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
