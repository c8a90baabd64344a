//! End-to-end ensemble prediction over injected model collaborators.
//!
//! Runs the image and tabular classifiers concurrently, treats a failed or
//! unconfigured model as absent (never as a default guess), and hands the
//! surviving results to the [`EnsemblePolicy`].

use std::fmt;
use std::sync::Arc;

use neurotrace_core::{ClassificationResult, ErrorResponse, FeatureRecord};
use thiserror::Error;
use tracing::{info, warn};

use crate::ensemble::{EnsembleOutput, EnsemblePolicy, IndividualResults};
use crate::source::{ImageClassifier, TabularClassifier};
use crate::EnsembleError;

/// Which model an inference failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Image,
    Tabular,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Tabular => "tabular",
        }
    }
}

/// An input that was supplied but produced no result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceFailure {
    pub model: ModelKind,
    pub message: String,
}

impl fmt::Display for InferenceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} model: {}", self.model.as_str(), self.message)
    }
}

/// Ensemble failure together with everything gathered before it happened.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct PredictError {
    #[source]
    pub error: EnsembleError,
    pub individual: IndividualResults,
    pub failures: Vec<InferenceFailure>,
}

impl PredictError {
    pub fn to_response(&self) -> ErrorResponse {
        let mut message = self.error.to_string();
        for failure in &self.failures {
            message.push_str("; ");
            message.push_str(&failure.to_string());
        }
        ErrorResponse::new(self.error.kind(), message).with_individual(
            self.individual.image.as_ref(),
            self.individual.tabular.as_ref(),
        )
    }
}

/// Model results gathered for one request.
#[derive(Debug, Default)]
pub struct Gathered {
    pub results: IndividualResults,
    pub failures: Vec<InferenceFailure>,
}

/// Orchestrates inference and combination for one request at a time.
///
/// Holds no per-request state; share it behind an `Arc` across tasks.
pub struct EnsemblePredictor {
    image: Option<Arc<dyn ImageClassifier>>,
    tabular: Option<Arc<dyn TabularClassifier>>,
    policy: EnsemblePolicy,
}

impl EnsemblePredictor {
    pub fn new(policy: EnsemblePolicy) -> Self {
        Self {
            image: None,
            tabular: None,
            policy,
        }
    }

    pub fn with_image_classifier(mut self, classifier: Arc<dyn ImageClassifier>) -> Self {
        self.image = Some(classifier);
        self
    }

    pub fn with_tabular_classifier(mut self, classifier: Arc<dyn TabularClassifier>) -> Self {
        self.tabular = Some(classifier);
        self
    }

    pub fn policy(&self) -> &EnsemblePolicy {
        &self.policy
    }

    pub fn has_image_classifier(&self) -> bool {
        self.image.is_some()
    }

    pub fn has_tabular_classifier(&self) -> bool {
        self.tabular.is_some()
    }

    /// Run whichever models have input, concurrently.
    pub async fn gather(&self, image: Option<&[u8]>, features: Option<&FeatureRecord>) -> Gathered {
        let (image_outcome, tabular_outcome) =
            tokio::join!(self.run_image(image), self.run_tabular(features));

        let mut gathered = Gathered::default();
        match image_outcome {
            Some(Ok(result)) => gathered.results.image = Some(result),
            Some(Err(failure)) => gathered.failures.push(failure),
            None => {}
        }
        match tabular_outcome {
            Some(Ok(result)) => gathered.results.tabular = Some(result),
            Some(Err(failure)) => gathered.failures.push(failure),
            None => {}
        }
        gathered
    }

    /// Gather model results and combine them.
    pub async fn predict(
        &self,
        image: Option<&[u8]>,
        features: Option<&FeatureRecord>,
    ) -> Result<EnsembleOutput, PredictError> {
        let Gathered { results, failures } = self.gather(image, features).await;

        match self
            .policy
            .combine(results.image.as_ref(), results.tabular.as_ref())
        {
            Ok(output) => {
                info!(
                    method = %output.method,
                    prediction = output.final_result.predicted_class(),
                    confidence = output.final_result.confidence(),
                    failed_models = failures.len(),
                    "ensemble prediction complete"
                );
                Ok(output)
            }
            Err(error) => {
                warn!(%error, failed_models = failures.len(), "ensemble prediction failed");
                Err(PredictError {
                    error,
                    individual: results,
                    failures,
                })
            }
        }
    }

    async fn run_image(
        &self,
        image: Option<&[u8]>,
    ) -> Option<Result<ClassificationResult, InferenceFailure>> {
        let bytes = image?;
        let outcome = match &self.image {
            None => Err("no image classifier configured".to_string()),
            Some(classifier) => {
                info!(classifier = classifier.name(), bytes = bytes.len(), "classifying image");
                classifier
                    .classify_image(bytes)
                    .await
                    .map_err(|e| e.to_string())
            }
        };
        Some(Self::record(ModelKind::Image, outcome))
    }

    async fn run_tabular(
        &self,
        features: Option<&FeatureRecord>,
    ) -> Option<Result<ClassificationResult, InferenceFailure>> {
        let features = features?;
        let outcome = match &self.tabular {
            None => Err("no tabular classifier configured".to_string()),
            Some(classifier) => {
                info!(
                    classifier = classifier.name(),
                    features = features.len(),
                    "classifying clinical features"
                );
                classifier
                    .classify_features(features)
                    .await
                    .map_err(|e| e.to_string())
            }
        };
        Some(Self::record(ModelKind::Tabular, outcome))
    }

    fn record(
        model: ModelKind,
        outcome: Result<ClassificationResult, String>,
    ) -> Result<ClassificationResult, InferenceFailure> {
        match outcome {
            Ok(result) => {
                info!(
                    model = model.as_str(),
                    prediction = result.predicted_class(),
                    confidence = result.confidence(),
                    "model result"
                );
                Ok(result)
            }
            Err(message) => {
                warn!(model = model.as_str(), error = %message, "inference failed, treating input as absent");
                Err(InferenceFailure { model, message })
            }
        }
    }
}
