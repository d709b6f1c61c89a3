//! Pipeline orchestration
//!
//! Runs the stages in order: ingest, schema validation, feature transform,
//! split, scaling, training, persistence, evaluation. Each stage runs inside
//! its own span under a `run` span carrying the seeds.

use crate::config::PipelineConfig;
use crate::dataset::Table;
use crate::errors::{PipelineError, Result};
use crate::evaluator::{evaluate, EvaluationReport};
use crate::scaler::StandardScaler;
use crate::schema::validate_columns;
use crate::split::train_test_split;
use crate::trainer::ForestTrainer;
use crate::transform::FeatureTransformer;
use loan_model::{ArtifactStore, BundleMetadata, ModelBundle};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, info_span};

/// Result of a successful run
#[derive(Debug)]
pub struct PipelineOutcome {
    pub bundle: ModelBundle,
    pub report: EvaluationReport,
    pub model_path: PathBuf,
}

/// One predicted label for an input row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prediction {
    /// Identifier cell, when the input carries one
    pub id: Option<String>,
    pub label: String,
}

pub struct Pipeline {
    config: PipelineConfig,
}

fn stage<T>(name: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let span = info_span!("stage", stage = name);
    let _enter = span.enter();
    info!("stage started");
    let out = f()?;
    info!("stage completed");
    Ok(out)
}

impl Pipeline {
    /// Validate `config` and build a pipeline around it
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Create parent directories for every output path
    pub fn prepare_directories(&self) -> Result<()> {
        let output = &self.config.output;
        let targets = std::iter::once(output.model_path.as_path())
            .chain(output.train_csv.as_deref())
            .chain(output.test_csv.as_deref())
            .chain(self.config.logging.file_path());

        for target in targets {
            if let Some(dir) = target.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir).map_err(|source| PipelineError::Persistence {
                    path: dir.to_path_buf(),
                    source,
                })?;
            }
        }
        Ok(())
    }

    /// Run every stage end to end
    pub fn run(&self) -> Result<PipelineOutcome> {
        let config = &self.config;
        let run = info_span!(
            "run",
            split_seed = config.split.seed,
            forest_seed = config.forest.seed
        );
        let _enter = run.enter();
        info!(input = %config.data.input.display(), "pipeline started");

        self.prepare_directories()?;

        let table = stage("ingest", || {
            let table = Table::from_csv(&config.data.input)?;
            info!(rows = table.len(), columns = table.headers.len(), "dataset loaded");
            if table.is_empty() {
                return Err(PipelineError::InvalidInput("dataset has no rows".into()));
            }
            Ok(table)
        })?;

        stage("validate", || validate_columns(&table, &config.data.required_columns).map(|_| ()))?;

        let (encoded, transform) =
            stage("transform", || FeatureTransformer::new(&config.data).fit_transform(&table))?;

        let split = stage("split", || {
            let split = train_test_split(&encoded, config.split.test_fraction, config.split.seed)?;
            if let Some(path) = &config.output.train_csv {
                split.train.write_csv(path)?;
            }
            if let Some(path) = &config.output.test_csv {
                split.test.write_csv(path)?;
            }
            Ok(split)
        })?;

        let (scaling, train, test) = stage("scale", || {
            let scaling = StandardScaler::new(config.scaling.zero_variance).fit(&split.train)?;
            let train = StandardScaler::transform(&scaling, &split.train)?;
            let test = StandardScaler::transform(&scaling, &split.test)?;
            Ok((scaling, train, test))
        })?;

        let n_classes = transform.target_mapping()?.len();
        let class_names = transform.target_mapping()?.values.clone();

        let bundle = stage("train", || {
            let forest = ForestTrainer::new(config.forest.clone().into()).train(&train, n_classes)?;
            let metadata = BundleMetadata {
                created_at: chrono::Utc::now().timestamp(),
                trainer_version: crate::VERSION.to_string(),
                train_rows: train.len(),
                test_rows: test.len(),
                split_seed: config.split.seed,
                forest_seed: config.forest.seed,
            };
            let bundle = ModelBundle::new(transform, scaling, forest, metadata)?;
            ForestTrainer::persist(&ArtifactStore::new(&config.output.model_path), &bundle)?;
            Ok(bundle)
        })?;

        let report = stage("evaluate", || {
            let report = evaluate(&bundle.forest, &test.features, &test.labels, &class_names)?;
            info!("classification report\n{report}");
            Ok(report)
        })?;

        info!(
            model = %config.output.model_path.display(),
            accuracy = report.accuracy,
            "pipeline completed"
        );
        Ok(PipelineOutcome {
            bundle,
            report,
            model_path: config.output.model_path.clone(),
        })
    }
}

/// Load the bundle at `model_path` and label every row of `input`
pub fn predict_file(model_path: &Path, input: &Path) -> Result<Vec<Prediction>> {
    let bundle = ArtifactStore::new(model_path).read()?;
    let table = Table::from_csv(input)?;
    info!(rows = table.len(), hash = %bundle.content_hash, "predicting");

    (0..table.len())
        .map(|idx| {
            let record = table.record(idx);
            let label = bundle.predict_label(&record, idx + 1)?.to_string();
            let id = record.raw(&bundle.transform.identifier).map(|v| v.trim().to_string());
            Ok(Prediction { id, label })
        })
        .collect()
}
