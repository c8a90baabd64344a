//! Ensemble decision policy and model-inference collaborators.

pub mod ensemble;
mod error;
pub mod features;
pub mod predictor;
pub mod source;

pub use ensemble::{
    DEFAULT_HIGH_CONFIDENCE_THRESHOLD, EnsembleOutput, EnsemblePolicy, IndividualResults, combine,
};
pub use error::{EnsembleError, InferenceError};
pub use predictor::{EnsemblePredictor, Gathered, InferenceFailure, ModelKind, PredictError};
pub use source::{ImageClassifier, TabularClassifier};

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use onnx::OnnxTabularClassifier;
