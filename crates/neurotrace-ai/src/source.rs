//! Model-inference collaborators.
//!
//! Each classifier turns one kind of input into a [`ClassificationResult`].
//! Implementations are injected into [`EnsemblePredictor`](crate::EnsemblePredictor)
//! at construction; model lifecycle stays with the implementation.

use async_trait::async_trait;
use neurotrace_core::{ClassificationResult, FeatureRecord};

use crate::InferenceError;

/// Classifies handwriting images from their encoded bytes.
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    async fn classify_image(&self, image: &[u8]) -> Result<ClassificationResult, InferenceError>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "image"
    }
}

/// Classifies structured clinical feature records.
#[async_trait]
pub trait TabularClassifier: Send + Sync {
    async fn classify_features(
        &self,
        features: &FeatureRecord,
    ) -> Result<ClassificationResult, InferenceError>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "tabular"
    }
}
