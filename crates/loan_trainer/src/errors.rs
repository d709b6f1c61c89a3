use loan_model::ModelError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the training pipeline.
///
/// One variant per failure kind so callers can branch on the cause.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("schema error: missing column(s) {}", .0.join(", "))]
    Schema(Vec<String>),

    #[error("data quality error: column `{column}` row {row}: missing value")]
    DataQuality { column: String, row: usize },

    #[error("encoding error: column `{column}` has no code for `{value}`")]
    Encoding { column: String, value: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("feature `{0}` has zero variance in the train subset")]
    ZeroVariance(String),

    #[error("persistence error at {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt artifact at {}: {reason}", path.display())]
    Corruption { path: PathBuf, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<ModelError> for PipelineError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::NotFound(path) => Self::NotFound(path),
            ModelError::Persistence { path, source } => Self::Persistence { path, source },
            ModelError::Corruption { path, reason } => Self::Corruption { path, reason },
            ModelError::Encoding { column, value } => Self::Encoding { column, value },
            ModelError::MissingColumn(column) => Self::Schema(vec![column]),
            ModelError::MissingValue { column, row } => Self::DataQuality { column, row },
            err @ ModelError::Parse { .. } => Self::Parse(err.to_string()),
            err @ (ModelError::FeatureCount { .. }
            | ModelError::InvalidModel(_)
            | ModelError::Serialization(_)) => Self::InvalidInput(err.to_string()),
        }
    }
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_errors_keep_their_kind() {
        let err: PipelineError = ModelError::MissingValue {
            column: "bank_asset_value".into(),
            row: 4,
        }
        .into();
        assert!(matches!(err, PipelineError::DataQuality { row: 4, .. }));

        let err: PipelineError = ModelError::MissingColumn("loan_id".into()).into();
        assert_eq!(err.to_string(), "schema error: missing column(s) loan_id");
    }
}
