//! Ensemble decision policy.
//!
//! Combines an optional image-model result with an optional tabular-model
//! result into one classification. Branches, first match wins:
//!
//! 1. Both present and both strictly above the threshold: average the
//!    probability vectors (`ensemble_average`).
//! 2. Both present, tabular strictly more confident: tabular result as-is
//!    (`tabular_dominant`).
//! 3. Both present otherwise: image result as-is (`image_dominant`). Equal
//!    confidences land here.
//! 4. Only tabular: `tabular_only`.
//! 5. Only image: `image_only`.
//!
//! The policy is pure. Missing input and mismatched class counts are errors;
//! there is no fallback prediction.

use neurotrace_core::{ClassificationResult, EnsembleMethod, EnsembleResponse};
use tracing::debug;

use crate::EnsembleError;

/// Confidence a model must strictly exceed to count as high-confidence.
pub const DEFAULT_HIGH_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// The individual model results an ensemble decision was made from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndividualResults {
    pub image: Option<ClassificationResult>,
    pub tabular: Option<ClassificationResult>,
}

/// Result of [`EnsemblePolicy::combine`].
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleOutput {
    pub final_result: ClassificationResult,
    pub method: EnsembleMethod,
    pub individual: IndividualResults,
}

impl EnsembleOutput {
    /// Display view with rounded values and placeholders for models that did
    /// not run.
    pub fn to_response(&self) -> EnsembleResponse {
        EnsembleResponse::new(
            &self.final_result,
            self.method,
            self.individual.image.as_ref(),
            self.individual.tabular.as_ref(),
        )
    }
}

/// Threshold-based combination of image and tabular classifications.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnsemblePolicy {
    pub high_confidence_threshold: f64,
}

impl Default for EnsemblePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_HIGH_CONFIDENCE_THRESHOLD)
    }
}

impl EnsemblePolicy {
    pub fn new(high_confidence_threshold: f64) -> Self {
        Self {
            high_confidence_threshold,
        }
    }

    /// Combine the available model results into one classification.
    ///
    /// Fails with [`EnsembleError::InvalidInput`] when neither result is
    /// present and [`EnsembleError::SchemaMismatch`] when both are present but
    /// disagree on the number of classes.
    pub fn combine(
        &self,
        image: Option<&ClassificationResult>,
        tabular: Option<&ClassificationResult>,
    ) -> Result<EnsembleOutput, EnsembleError> {
        let threshold = self.high_confidence_threshold;

        let (final_result, method) = match (image, tabular) {
            (None, None) => return Err(EnsembleError::InvalidInput),
            (None, Some(tab)) => (tab.clone(), EnsembleMethod::TabularOnly),
            (Some(img), None) => (img.clone(), EnsembleMethod::ImageOnly),
            (Some(img), Some(tab)) => {
                // Class counts are checked before any branch is chosen.
                let averaged = img.mean_with(tab).ok_or_else(|| EnsembleError::SchemaMismatch {
                    image: img.class_count(),
                    tabular: tab.class_count(),
                })?;

                if img.confidence() > threshold && tab.confidence() > threshold {
                    (averaged, EnsembleMethod::EnsembleAverage)
                } else if tab.confidence() > img.confidence() {
                    (tab.clone(), EnsembleMethod::TabularDominant)
                } else {
                    (img.clone(), EnsembleMethod::ImageDominant)
                }
            }
        };

        debug!(
            method = %method,
            prediction = final_result.predicted_class(),
            confidence = final_result.confidence(),
            image_confidence = image.map(ClassificationResult::confidence),
            tabular_confidence = tabular.map(ClassificationResult::confidence),
            threshold,
            "ensemble decision"
        );

        Ok(EnsembleOutput {
            final_result,
            method,
            individual: IndividualResults {
                image: image.cloned(),
                tabular: tabular.cloned(),
            },
        })
    }
}

/// [`EnsemblePolicy::combine`] with the default 0.8 threshold.
pub fn combine(
    image: Option<&ClassificationResult>,
    tabular: Option<&ClassificationResult>,
) -> Result<EnsembleOutput, EnsembleError> {
    EnsemblePolicy::default().combine(image, tabular)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(probs: &[f64]) -> ClassificationResult {
        ClassificationResult::from_probabilities(probs.to_vec()).unwrap()
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "expected {expected:?}, got {actual:?}");
        }
    }

    #[test]
    fn both_confident_averages() {
        let image = result(&[0.08, 0.92]);
        let tabular = result(&[0.15, 0.85]);

        let out = combine(Some(&image), Some(&tabular)).unwrap();
        assert_eq!(out.method, EnsembleMethod::EnsembleAverage);
        assert_close(out.final_result.probabilities(), &[0.115, 0.885]);
        assert_eq!(out.final_result.predicted_class(), 1);
        assert!((out.final_result.confidence() - 0.885).abs() < 1e-12);
    }

    #[test]
    fn tabular_more_confident_dominates() {
        let image = result(&[0.55, 0.45]);
        let tabular = result(&[0.09, 0.91]);

        let out = combine(Some(&image), Some(&tabular)).unwrap();
        assert_eq!(out.method, EnsembleMethod::TabularDominant);
        assert_eq!(out.final_result, tabular);
    }

    #[test]
    fn image_more_confident_dominates() {
        let image = result(&[0.30, 0.70]);
        let tabular = result(&[0.60, 0.40]);

        let out = combine(Some(&image), Some(&tabular)).unwrap();
        assert_eq!(out.method, EnsembleMethod::ImageDominant);
        assert_eq!(out.final_result, image);
    }

    #[test]
    fn tabular_only() {
        let tabular = result(&[0.99, 0.01]);

        let out = combine(None, Some(&tabular)).unwrap();
        assert_eq!(out.method, EnsembleMethod::TabularOnly);
        assert_eq!(out.final_result, tabular);
        assert!(out.individual.image.is_none());
    }

    #[test]
    fn image_only() {
        let image = result(&[0.35, 0.65]);

        let out = combine(Some(&image), None).unwrap();
        assert_eq!(out.method, EnsembleMethod::ImageOnly);
        assert_eq!(out.final_result, image);
        assert!(out.individual.tabular.is_none());
    }

    #[test]
    fn no_input_is_invalid() {
        assert_eq!(combine(None, None), Err(EnsembleError::InvalidInput));
    }

    #[test]
    fn class_count_mismatch_fails() {
        let image = result(&[0.5, 0.5]);
        let tabular = result(&[0.2, 0.3, 0.5]);

        assert_eq!(
            combine(Some(&image), Some(&tabular)),
            Err(EnsembleError::SchemaMismatch {
                image: 2,
                tabular: 3
            })
        );
    }

    #[test]
    fn class_count_mismatch_fails_even_when_confident() {
        let image = result(&[0.05, 0.95]);
        let tabular = result(&[0.02, 0.08, 0.9]);

        assert!(matches!(
            combine(Some(&image), Some(&tabular)),
            Err(EnsembleError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn equal_confidence_goes_to_image() {
        let image = result(&[0.35, 0.65]);
        let tabular = result(&[0.65, 0.35]);

        let out = combine(Some(&image), Some(&tabular)).unwrap();
        assert_eq!(out.method, EnsembleMethod::ImageDominant);
        assert_eq!(out.final_result, image);
    }

    #[test]
    fn threshold_is_strict() {
        let image = result(&[0.2, 0.8]);
        let tabular = result(&[0.8, 0.2]);

        // Both exactly at 0.8: not high-confidence, and equal, so image wins.
        let out = combine(Some(&image), Some(&tabular)).unwrap();
        assert_eq!(out.method, EnsembleMethod::ImageDominant);

        // One just above, one exactly at the threshold: still no average.
        let tabular = result(&[0.19, 0.81]);
        let out = combine(Some(&image), Some(&tabular)).unwrap();
        assert_eq!(out.method, EnsembleMethod::TabularDominant);
    }

    #[test]
    fn custom_threshold() {
        let image = result(&[0.3, 0.7]);
        let tabular = result(&[0.25, 0.75]);

        let out = combine(Some(&image), Some(&tabular)).unwrap();
        assert_eq!(out.method, EnsembleMethod::TabularDominant);

        let out = EnsemblePolicy::new(0.6)
            .combine(Some(&image), Some(&tabular))
            .unwrap();
        assert_eq!(out.method, EnsembleMethod::EnsembleAverage);
        assert_close(out.final_result.probabilities(), &[0.275, 0.725]);
    }

    #[test]
    fn average_can_flip_class() {
        // Confident models that disagree: the average picks the stronger side.
        let image = result(&[0.85, 0.15]);
        let tabular = result(&[0.05, 0.95]);

        let out = combine(Some(&image), Some(&tabular)).unwrap();
        assert_eq!(out.method, EnsembleMethod::EnsembleAverage);
        assert_eq!(out.final_result.predicted_class(), 1);
        assert!((out.final_result.confidence() - 0.55).abs() < 1e-12);
    }

    #[test]
    fn echoes_individual_results() {
        let image = result(&[0.08, 0.92]);
        let tabular = result(&[0.15, 0.85]);

        let out = combine(Some(&image), Some(&tabular)).unwrap();
        assert_eq!(out.individual.image.as_ref(), Some(&image));
        assert_eq!(out.individual.tabular.as_ref(), Some(&tabular));
    }

    #[test]
    fn deterministic() {
        let image = result(&[0.08, 0.92]);
        let tabular = result(&[0.15, 0.85]);

        let first = combine(Some(&image), Some(&tabular)).unwrap();
        for _ in 0..100 {
            let again = combine(Some(&image), Some(&tabular)).unwrap();
            assert_eq!(again, first);
            for (a, b) in again
                .final_result
                .probabilities()
                .iter()
                .zip(first.final_result.probabilities())
            {
                assert_eq!(a.to_bits(), b.to_bits());
            }
        }
    }

    #[test]
    fn output_invariant_holds_across_confidences() {
        let steps = [0.0, 0.1, 0.35, 0.5, 0.65, 0.8, 0.81, 0.95, 1.0];
        for &p in &steps {
            for &q in &steps {
                let image = result(&[1.0 - p, p]);
                let tabular = result(&[q, 1.0 - q]);
                let out = combine(Some(&image), Some(&tabular)).unwrap();

                let probs = out.final_result.probabilities();
                let max = probs.iter().cloned().fold(f64::MIN, f64::max);
                let argmax = probs.iter().position(|&v| v == max).unwrap();
                assert_eq!(out.final_result.confidence(), max);
                assert_eq!(out.final_result.predicted_class(), argmax);
                assert!((0.0..=1.0).contains(&out.final_result.confidence()));
            }
        }
    }

    #[test]
    fn response_view_matches_decision() {
        let image = result(&[0.08, 0.92]);
        let tabular = result(&[0.15, 0.85]);

        let resp = combine(Some(&image), Some(&tabular))
            .unwrap()
            .to_response();
        assert_eq!(resp.prediction, 1);
        assert_eq!(resp.confidence, 0.885);
        assert_eq!(resp.probs, vec![0.115, 0.885]);
        assert_eq!(resp.ensemble_method, EnsembleMethod::EnsembleAverage);
        assert_eq!(resp.individual_results.image.confidence, 0.92);
        assert_eq!(resp.individual_results.tabular.confidence, 0.85);
    }
}
