//! Error types for model loading and batch prediction.

use std::path::PathBuf;

use crate::config::defaults::EMPTY_INPUT_MESSAGE;

/// Failure to load or evaluate a persisted model bundle.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to read model bundle {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decompress model bundle: {0}")]
    Decompress(#[source] std::io::Error),
    #[error("failed to parse model bundle: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid model: {0}")]
    InvalidModel(String),
    #[error("feature width mismatch: model expects {expected} features, got {actual}")]
    FeatureWidth { expected: usize, actual: usize },
    #[error("class index {0} has no entry in rev_label_map")]
    UnknownLabel(usize),
    #[error("rev_label_map entry '{key}' has non-numeric label '{value}'")]
    InvalidLabel { key: String, value: String },
}

/// Failure of a whole prediction batch. No partial results are ever returned.
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("{}", EMPTY_INPUT_MESSAGE)]
    EmptyInput,
    #[error("assessment {index} is missing required field '{field}'")]
    MissingField { index: usize, field: String },
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl PredictionError {
    /// Empty input is answered with an error payload but is not a server fault.
    pub fn is_server_error(&self) -> bool {
        !matches!(self, PredictionError::EmptyInput)
    }
}
