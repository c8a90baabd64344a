//! JSON response views for ensemble predictions.
//!
//! Confidences and probabilities are rounded to 4 decimal places for
//! display. A model that did not run is rendered with a null prediction,
//! zero confidence, and a uniform probability vector so consumers can tell
//! it apart from a real result.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ClassificationResult, EnsembleMethod};

pub const MODEL_TYPE: &str = "Ensemble";

const DISPLAY_PLACES: i32 = 4;
const TIMING_PLACES: i32 = 3;

/// One model's result as displayed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionView {
    pub prediction: Option<usize>,
    pub confidence: f64,
    pub probs: Vec<f64>,
}

impl PredictionView {
    pub fn from_result(result: &ClassificationResult) -> Self {
        Self {
            prediction: Some(result.predicted_class()),
            confidence: round_to(result.confidence(), DISPLAY_PLACES),
            probs: round_all(result.probabilities()),
        }
    }

    /// Neutral placeholder for a model that did not run.
    pub fn not_run(class_count: usize) -> Self {
        let n = class_count.max(1);
        Self {
            prediction: None,
            confidence: 0.0,
            probs: vec![round_to(1.0 / n as f64, DISPLAY_PLACES); n],
        }
    }

    fn from_optional(result: Option<&ClassificationResult>, class_count: usize) -> Self {
        result
            .map(Self::from_result)
            .unwrap_or_else(|| Self::not_run(class_count))
    }

    pub fn did_run(&self) -> bool {
        self.prediction.is_some()
    }
}

/// The individual model results echoed back with every response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualView {
    pub image: PredictionView,
    pub tabular: PredictionView,
}

impl IndividualView {
    pub fn new(
        image: Option<&ClassificationResult>,
        tabular: Option<&ClassificationResult>,
        class_count: usize,
    ) -> Self {
        Self {
            image: PredictionView::from_optional(image, class_count),
            tabular: PredictionView::from_optional(tabular, class_count),
        }
    }
}

/// Successful ensemble prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleResponse {
    pub prediction: usize,
    pub confidence: f64,
    pub probs: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
    pub model_type: String,
    pub ensemble_method: EnsembleMethod,
    pub individual_results: IndividualView,
    pub status: String,
}

impl EnsembleResponse {
    pub fn new(
        final_result: &ClassificationResult,
        method: EnsembleMethod,
        image: Option<&ClassificationResult>,
        tabular: Option<&ClassificationResult>,
    ) -> Self {
        Self {
            prediction: final_result.predicted_class(),
            confidence: round_to(final_result.confidence(), DISPLAY_PLACES),
            probs: round_all(final_result.probabilities()),
            processing_time: None,
            model_type: MODEL_TYPE.to_string(),
            ensemble_method: method,
            individual_results: IndividualView::new(image, tabular, final_result.class_count()),
            status: "success".to_string(),
        }
    }

    /// Attach the wall-clock time spent producing this response.
    pub fn with_processing_time(mut self, elapsed: Duration) -> Self {
        self.processing_time = Some(round_to(elapsed.as_secs_f64(), TIMING_PLACES));
        self
    }
}

/// Failed ensemble prediction. Never carries a prediction of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub individual_results: Option<IndividualView>,
    pub status: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            individual_results: None,
            status: "error".to_string(),
        }
    }

    /// Echo whichever model results were available when the failure happened.
    pub fn with_individual(
        mut self,
        image: Option<&ClassificationResult>,
        tabular: Option<&ClassificationResult>,
    ) -> Self {
        let class_count = image.or(tabular).map(ClassificationResult::class_count);
        if let Some(n) = class_count {
            self.individual_results = Some(IndividualView::new(image, tabular, n));
        }
        self
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

fn round_all(values: &[f64]) -> Vec<f64> {
    values.iter().map(|&v| round_to(v, DISPLAY_PLACES)).collect()
}
