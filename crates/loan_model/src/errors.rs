//! Error types for the model core

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while encoding records, evaluating models or moving
/// bundles in and out of the Artifact Store.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Artifact path does not exist
    #[error("artifact not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Artifact could not be written or read
    #[error("failed to persist artifact at {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Artifact exists but does not deserialize or verify
    #[error("corrupt artifact at {}: {reason}", path.display())]
    Corruption { path: PathBuf, reason: String },

    /// Category value has no code in the persisted mapping
    #[error("column `{column}` has no code for value `{value}`")]
    Encoding { column: String, value: String },

    /// Record lacks a column the transform needs
    #[error("missing column `{0}`")]
    MissingColumn(String),

    /// Required cell is empty or a null marker
    #[error("column `{column}` row {row}: missing value")]
    MissingValue { column: String, row: usize },

    /// Numeric cell does not hold a finite number
    #[error("column `{column}` row {row}: cannot parse `{value}` as a number")]
    Parse {
        column: String,
        row: usize,
        value: String,
    },

    /// Feature vector length does not match the model
    #[error("expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    /// Model structure is inconsistent
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for model core operations
pub type Result<T> = std::result::Result<T, ModelError>;
