//! Pipeline configuration
//!
//! Loaded from a TOML document; every field has a default so a minimal file
//! only needs to name what differs. A handful of fields can be overridden
//! from the environment (`LOAN_PIPELINE_*`).

use crate::errors::{PipelineError, Result};
use loan_model::record::{
    ASSETS_COLUMN, ASSET_COLUMNS, CATEGORICAL_COLUMNS, IDENTIFIER_COLUMN, REQUIRED_COLUMNS,
    TARGET_COLUMN,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "LOAN_PIPELINE_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub data: DataConfig,
    pub split: SplitConfig,
    pub scaling: ScalingConfig,
    pub forest: ForestConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Input dataset and column roles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Local CSV path
    pub input: PathBuf,
    pub identifier: String,
    pub target: String,
    /// Columns encoded with a category mapping (target included)
    pub categorical: Vec<String>,
    /// Columns summed into `derived_column`
    pub asset_columns: Vec<String>,
    pub derived_column: String,
    /// Columns checked before any transform runs
    pub required_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of rows held out for evaluation, in (0, 1)
    pub test_fraction: f64,
    pub seed: u64,
}

/// What to do with a feature that is constant over the train subset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ZeroVariancePolicy {
    /// Abort the run
    #[default]
    Fail,
    /// Center the feature and leave it undivided
    Passthrough,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScalingConfig {
    pub zero_variance: ZeroVariancePolicy,
}

/// Number of features sampled at each split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum MaxFeatures {
    #[default]
    Sqrt,
    Log2,
    All,
    Fixed(usize),
}

impl MaxFeatures {
    /// Resolve against the actual feature count; always in `1..=n_features`
    pub fn resolve(self, n_features: usize) -> usize {
        let n = n_features as f64;
        let k = match self {
            Self::Sqrt => n.sqrt().floor() as usize,
            Self::Log2 => n.log2().floor() as usize,
            Self::All => n_features,
            Self::Fixed(k) => k,
        };
        k.clamp(1, n_features.max(1))
    }
}

impl FromStr for MaxFeatures {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqrt" => Ok(Self::Sqrt),
            "log2" => Ok(Self::Log2),
            "all" => Ok(Self::All),
            other => other
                .parse::<usize>()
                .map(Self::Fixed)
                .map_err(|_| format!("invalid max_features `{s}` (sqrt, log2, all or a count)")),
        }
    }
}

impl TryFrom<String> for MaxFeatures {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MaxFeatures> for String {
    fn from(value: MaxFeatures) -> Self {
        value.to_string()
    }
}

impl fmt::Display for MaxFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqrt => write!(f, "sqrt"),
            Self::Log2 => write!(f, "log2"),
            Self::All => write!(f, "all"),
            Self::Fixed(k) => write!(f, "{k}"),
        }
    }
}

/// Random-forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub seed: u64,
    /// Unlimited when absent
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Fixed artifact path for the model bundle
    pub model_path: PathBuf,
    /// Processed (encoded, unscaled) train subset; not written when absent
    #[serde(default)]
    pub train_csv: Option<PathBuf>,
    /// Processed (encoded, unscaled) test subset; not written when absent
    #[serde(default)]
    pub test_csv: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `loan_trainer=debug`
    pub level: String,
    pub format: LogFormat,
    /// Plain-text copy of every event, appended across runs. An empty path
    /// disables it.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Log file to open, if any
    pub fn file_path(&self) -> Option<&Path> {
        self.file.as_deref().filter(|p| !p.as_os_str().is_empty())
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/raw/raw_data.csv"),
            identifier: IDENTIFIER_COLUMN.to_string(),
            target: TARGET_COLUMN.to_string(),
            categorical: CATEGORICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
            asset_columns: ASSET_COLUMNS.iter().map(|c| c.to_string()).collect(),
            derived_column: ASSETS_COLUMN.to_string(),
            required_columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 2,
        }
    }
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            seed: 42,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/loan_approval_model.json"),
            train_csv: Some(PathBuf::from("data/processed/train.csv")),
            test_csv: Some(PathBuf::from("data/processed/test.csv")),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            file: Some(PathBuf::from("logs/train_pipeline.log")),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PipelineError::NotFound(path.to_path_buf()),
            _ => PipelineError::Config(format!("failed to read {}: {e}", path.display())),
        })?;

        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| PipelineError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Apply `LOAN_PIPELINE_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(input) = var("INPUT") {
            self.data.input = PathBuf::from(input);
        }
        if let Some(model_path) = var("MODEL_PATH") {
            self.output.model_path = PathBuf::from(model_path);
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(file) = var("LOG_FILE") {
            self.logging.file = Some(PathBuf::from(file));
        }
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(PipelineError::Config(msg));

        let fraction = self.split.test_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return invalid(format!("split.test_fraction must be in (0, 1), got {fraction}"));
        }
        if self.forest.n_trees == 0 {
            return invalid("forest.n_trees must be positive".into());
        }
        if self.forest.min_samples_leaf == 0 {
            return invalid("forest.min_samples_leaf must be at least 1".into());
        }
        if self.forest.min_samples_split < 2 {
            return invalid("forest.min_samples_split must be at least 2".into());
        }
        if self.forest.max_depth == Some(0) {
            return invalid("forest.max_depth must be positive when set".into());
        }
        if self.forest.max_features == MaxFeatures::Fixed(0) {
            return invalid("forest.max_features must be positive".into());
        }
        if self.data.identifier == self.data.target {
            return invalid("data.identifier and data.target must differ".into());
        }
        if !self.data.categorical.contains(&self.data.target) {
            return invalid(format!(
                "data.categorical must include the target `{}`",
                self.data.target
            ));
        }
        if self.data.asset_columns.is_empty() {
            return invalid("data.asset_columns must not be empty".into());
        }
        Ok(())
    }
}
