//! Single-model classification results.
//!
//! A [`ClassificationResult`] is always derived from its probability vector:
//! the predicted class is the argmax and the confidence is the maximum entry.
//! Values arriving over the wire are re-derived the same way, so no result in
//! the system can carry a class or confidence that disagrees with its
//! probabilities.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Confidence values closer than this are treated as equal when checking
/// caller-supplied fields against the derived ones.
const WIRE_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassificationError {
    #[error("probability vector is empty")]
    Empty,

    #[error("probability {value} at class {class} is outside [0, 1]")]
    OutOfRange { class: usize, value: f64 },

    #[error("service reported a failed prediction: {error}: {message}")]
    Reported { error: String, message: String },
}

/// Output of one classifier: per-class probabilities plus the derived
/// predicted class and confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ClassificationWire", try_from = "ClassificationWire")]
pub struct ClassificationResult {
    predicted_class: usize,
    confidence: f64,
    probabilities: Vec<f64>,
}

impl ClassificationResult {
    /// Build a result from a per-class probability vector.
    ///
    /// Ties in the maximum resolve to the lowest class index.
    pub fn from_probabilities(probabilities: Vec<f64>) -> Result<Self, ClassificationError> {
        if probabilities.is_empty() {
            return Err(ClassificationError::Empty);
        }
        if let Some((class, &value)) = probabilities
            .iter()
            .enumerate()
            .find(|&(_, p)| !p.is_finite() || !(0.0..=1.0).contains(p))
        {
            return Err(ClassificationError::OutOfRange { class, value });
        }

        let (predicted_class, confidence) = argmax(&probabilities);
        Ok(Self {
            predicted_class,
            confidence,
            probabilities,
        })
    }

    /// Build a result from raw model output.
    ///
    /// A single value is a sigmoid probability `p` of the positive class and
    /// expands to `[1 - p, p]`. Anything longer is taken as a softmax vector.
    pub fn from_model_output(raw: &[f64]) -> Result<Self, ClassificationError> {
        match raw {
            [p] => Self::from_probabilities(vec![1.0 - p, *p]),
            _ => Self::from_probabilities(raw.to_vec()),
        }
    }

    pub fn predicted_class(&self) -> usize {
        self.predicted_class
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// Number of classes in the probability vector.
    pub fn class_count(&self) -> usize {
        self.probabilities.len()
    }

    /// Elementwise mean of two results over the same classes, with class and
    /// confidence re-derived from the mean.
    ///
    /// Returns `None` when the class counts differ.
    pub fn mean_with(&self, other: &Self) -> Option<Self> {
        if self.class_count() != other.class_count() {
            return None;
        }
        let probabilities: Vec<f64> = self
            .probabilities
            .iter()
            .zip(&other.probabilities)
            .map(|(a, b)| (a + b) / 2.0)
            .collect();
        let (predicted_class, confidence) = argmax(&probabilities);
        Some(Self {
            predicted_class,
            confidence,
            probabilities,
        })
    }
}

/// Index and value of the largest entry. First index wins on ties.
fn argmax(values: &[f64]) -> (usize, f64) {
    let mut best = (0, values[0]);
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > best.1 {
            best = (i, v);
        }
    }
    best
}

/// JSON form of a classification as exchanged with model services:
/// `{ "prediction": 1, "confidence": 0.92, "probs": [0.08, 0.92] }`.
///
/// `prediction` and `confidence` are optional on input and ignored in favour
/// of values derived from `probs`. A body carrying `error`, or
/// `"status": "error"`, is a failure report and never becomes a result, even
/// when it also carries placeholder probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationWire {
    #[serde(default)]
    pub prediction: Option<usize>,
    #[serde(default)]
    pub confidence: Option<f64>,
    pub probs: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl TryFrom<ClassificationWire> for ClassificationResult {
    type Error = ClassificationError;

    fn try_from(wire: ClassificationWire) -> Result<Self, Self::Error> {
        if wire.error.is_some() || wire.status.as_deref() == Some("error") {
            return Err(ClassificationError::Reported {
                error: wire.error.unwrap_or_else(|| "error".to_string()),
                message: wire.message.unwrap_or_default(),
            });
        }

        let result = Self::from_probabilities(wire.probs)?;

        if let Some(claimed) = wire.prediction
            && claimed != result.predicted_class
        {
            warn!(
                claimed,
                derived = result.predicted_class,
                "supplied prediction disagrees with probabilities, using derived class"
            );
        }
        if let Some(claimed) = wire.confidence
            && (claimed - result.confidence).abs() > WIRE_TOLERANCE
        {
            warn!(
                claimed,
                derived = result.confidence,
                "supplied confidence disagrees with probabilities, using derived confidence"
            );
        }

        Ok(result)
    }
}

impl From<ClassificationResult> for ClassificationWire {
    fn from(result: ClassificationResult) -> Self {
        Self {
            prediction: Some(result.predicted_class),
            confidence: Some(result.confidence),
            probs: result.probabilities,
            error: None,
            message: None,
            status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_class_and_confidence() {
        let r = ClassificationResult::from_probabilities(vec![0.08, 0.92]).unwrap();
        assert_eq!(r.predicted_class(), 1);
        assert_eq!(r.confidence(), 0.92);
        assert_eq!(r.class_count(), 2);
    }

    #[test]
    fn argmax_tie_picks_lowest_index() {
        let r = ClassificationResult::from_probabilities(vec![0.5, 0.5]).unwrap();
        assert_eq!(r.predicted_class(), 0);
        assert_eq!(r.confidence(), 0.5);
    }

    #[test]
    fn three_class_vector() {
        let r = ClassificationResult::from_probabilities(vec![0.2, 0.3, 0.5]).unwrap();
        assert_eq!(r.predicted_class(), 2);
        assert_eq!(r.confidence(), 0.5);
    }

    #[test]
    fn empty_vector_rejected() {
        assert_eq!(
            ClassificationResult::from_probabilities(vec![]),
            Err(ClassificationError::Empty)
        );
    }

    #[test]
    fn out_of_range_rejected() {
        let err = ClassificationResult::from_probabilities(vec![0.4, 1.2]).unwrap_err();
        assert_eq!(
            err,
            ClassificationError::OutOfRange {
                class: 1,
                value: 1.2
            }
        );
        assert!(ClassificationResult::from_probabilities(vec![f64::NAN, 0.5]).is_err());
        assert!(ClassificationResult::from_probabilities(vec![-0.1, 0.5]).is_err());
    }

    #[test]
    fn sigmoid_output_expands_to_two_classes() {
        let r = ClassificationResult::from_model_output(&[0.75]).unwrap();
        assert_eq!(r.probabilities(), &[0.25, 0.75]);
        assert_eq!(r.predicted_class(), 1);
    }

    #[test]
    fn softmax_output_taken_as_is() {
        let r = ClassificationResult::from_model_output(&[0.6, 0.4]).unwrap();
        assert_eq!(r.probabilities(), &[0.6, 0.4]);
        assert_eq!(r.predicted_class(), 0);
    }

    #[test]
    fn mean_rederives_class() {
        let a = ClassificationResult::from_probabilities(vec![0.9, 0.1]).unwrap();
        let b = ClassificationResult::from_probabilities(vec![0.2, 0.8]).unwrap();
        let m = a.mean_with(&b).unwrap();
        assert!((m.probabilities()[0] - 0.55).abs() < 1e-12);
        assert_eq!(m.predicted_class(), 0);
        assert_eq!(m.confidence(), m.probabilities()[0]);
    }

    #[test]
    fn mean_rejects_different_class_counts() {
        let a = ClassificationResult::from_probabilities(vec![0.5, 0.5]).unwrap();
        let b = ClassificationResult::from_probabilities(vec![0.2, 0.3, 0.5]).unwrap();
        assert!(a.mean_with(&b).is_none());
    }

    #[test]
    fn wire_ignores_inconsistent_claims() {
        // A service claiming "class 0 at 0.5" while its probs say otherwise.
        let json = r#"{"prediction": 0, "confidence": 0.5, "probs": [0.1, 0.9]}"#;
        let r: ClassificationResult = serde_json::from_str(json).unwrap();
        assert_eq!(r.predicted_class(), 1);
        assert_eq!(r.confidence(), 0.9);
    }

    #[test]
    fn wire_accepts_probs_only() {
        let r: ClassificationResult = serde_json::from_str(r#"{"probs": [0.7, 0.3]}"#).unwrap();
        assert_eq!(r.predicted_class(), 0);
    }

    #[test]
    fn wire_ignores_extra_fields() {
        let json = r#"{
            "prediction": 1,
            "confidence": 0.85,
            "probs": [0.15, 0.85],
            "processing_time": 0.042,
            "status": "success"
        }"#;
        let r: ClassificationResult = serde_json::from_str(json).unwrap();
        assert_eq!(r.predicted_class(), 1);
    }

    #[test]
    fn wire_rejects_invalid_probs() {
        assert!(serde_json::from_str::<ClassificationResult>(r#"{"probs": []}"#).is_err());
        assert!(serde_json::from_str::<ClassificationResult>(r#"{"probs": [2.0, 0.1]}"#).is_err());
    }

    #[test]
    fn wire_rejects_failure_report() {
        // Failure bodies still carry a placeholder class-0 guess.
        let json = r#"{
            "error": "Prediction failed",
            "message": "model not loaded",
            "prediction": 0,
            "confidence": 0.5,
            "probs": [0.5, 0.5],
            "status": "error"
        }"#;
        let err = serde_json::from_str::<ClassificationResult>(json).unwrap_err();
        assert!(err.to_string().contains("Prediction failed"), "{err}");
        assert!(err.to_string().contains("model not loaded"), "{err}");

        let wire: ClassificationWire = serde_json::from_str(json).unwrap();
        assert_eq!(
            ClassificationResult::try_from(wire),
            Err(ClassificationError::Reported {
                error: "Prediction failed".into(),
                message: "model not loaded".into(),
            })
        );
    }

    #[test]
    fn wire_rejects_error_status_without_error_field() {
        let json = r#"{"probs": [0.5, 0.5], "status": "error"}"#;
        assert!(serde_json::from_str::<ClassificationResult>(json).is_err());
    }

    #[test]
    fn serializes_to_wire_shape() {
        let r = ClassificationResult::from_probabilities(vec![0.3, 0.7]).unwrap();
        let value = serde_json::to_value(&r).unwrap();
        assert_eq!(value["prediction"], 1);
        assert_eq!(value["confidence"], 0.7);
        assert_eq!(value["probs"][0], 0.3);
        assert!(value.get("error").is_none());
        assert!(value.get("status").is_none());
    }
}
