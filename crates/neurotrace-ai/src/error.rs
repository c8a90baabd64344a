use neurotrace_core::ClassificationError;
use thiserror::Error;

/// Failures of the ensemble decision policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnsembleError {
    #[error("no classification input supplied: need an image result, a tabular result, or both")]
    InvalidInput,

    #[error("class count mismatch: image result has {image} classes, tabular result has {tabular}")]
    SchemaMismatch { image: usize, tabular: usize },
}

impl EnsembleError {
    /// Stable identifier for error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput => "InvalidInput",
            Self::SchemaMismatch { .. } => "SchemaMismatch",
        }
    }
}

/// Failures of a single model-inference collaborator.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("model unavailable: {0}")]
    Unavailable(String),

    #[error("invalid model output: {0}")]
    InvalidOutput(#[from] ClassificationError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}
