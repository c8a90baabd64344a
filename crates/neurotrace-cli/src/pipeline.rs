//! Prediction runs: load inputs, wire up model services, combine.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use neurotrace_ai::{EnsemblePolicy, EnsemblePredictor};
use neurotrace_client::InferenceClient;
use neurotrace_core::{ClassificationResult, EnsembleResponse, ErrorResponse, FeatureRecord};
use tracing::info;

/// Result of one run, ready to print.
#[derive(Debug)]
pub enum Outcome {
    Success(EnsembleResponse),
    Failure(ErrorResponse),
}

/// Where the image and tabular models live.
#[derive(Debug, Clone, Default)]
pub struct ModelSources {
    pub image_url: Option<String>,
    pub tabular_url: Option<String>,
    pub tabular_model: Option<PathBuf>,
    pub timeout: Duration,
}

/// Read a stored single-model result (`{"prediction", "confidence", "probs"}`).
pub fn read_result(path: &Path) -> anyhow::Result<ClassificationResult> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("parsing classification result from {}", path.display()))
}

/// Read a clinical feature record: a JSON object keyed by feature name.
pub fn read_features(path: &Path) -> anyhow::Result<FeatureRecord> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("parsing features from {}", path.display()))?;
    match value {
        serde_json::Value::Object(record) => Ok(record),
        _ => anyhow::bail!(
            "{} must contain a JSON object of features",
            path.display()
        ),
    }
}

/// Combine stored results without running any model.
pub fn run_combine(
    policy: &EnsemblePolicy,
    image: Option<&Path>,
    tabular: Option<&Path>,
) -> anyhow::Result<Outcome> {
    let start = Instant::now();
    let image = image.map(read_result).transpose()?;
    let tabular = tabular.map(read_result).transpose()?;

    Ok(match policy.combine(image.as_ref(), tabular.as_ref()) {
        Ok(output) => Outcome::Success(output.to_response().with_processing_time(start.elapsed())),
        Err(e) => Outcome::Failure(
            ErrorResponse::new(e.kind(), e.to_string())
                .with_individual(image.as_ref(), tabular.as_ref()),
        ),
    })
}

/// Build a predictor from the configured model sources.
///
/// A local ONNX tabular model takes precedence over a tabular service URL.
pub fn build_predictor(
    policy: EnsemblePolicy,
    sources: &ModelSources,
) -> anyhow::Result<EnsemblePredictor> {
    let mut predictor = EnsemblePredictor::new(policy);

    if let Some(url) = &sources.image_url {
        let client = InferenceClient::with_timeout(url.clone(), sources.timeout)
            .context("building image service client")?;
        info!(url = %client.base_url(), "image model: remote service");
        predictor = predictor.with_image_classifier(Arc::new(client));
    }

    if let Some(dir) = &sources.tabular_model {
        predictor = with_local_tabular(predictor, dir)?;
    } else if let Some(url) = &sources.tabular_url {
        let client = InferenceClient::with_timeout(url.clone(), sources.timeout)
            .context("building tabular service client")?;
        info!(url = %client.base_url(), "tabular model: remote service");
        predictor = predictor.with_tabular_classifier(Arc::new(client));
    }

    info!(
        threshold = predictor.policy().high_confidence_threshold,
        image = predictor.has_image_classifier(),
        tabular = predictor.has_tabular_classifier(),
        "ensemble predictor ready"
    );
    Ok(predictor)
}

#[cfg(feature = "onnx")]
fn with_local_tabular(
    predictor: EnsemblePredictor,
    dir: &Path,
) -> anyhow::Result<EnsemblePredictor> {
    let classifier = neurotrace_ai::OnnxTabularClassifier::load(dir)
        .with_context(|| format!("loading tabular model from {}", dir.display()))?;
    Ok(predictor.with_tabular_classifier(Arc::new(classifier)))
}

#[cfg(not(feature = "onnx"))]
fn with_local_tabular(
    _predictor: EnsemblePredictor,
    dir: &Path,
) -> anyhow::Result<EnsemblePredictor> {
    anyhow::bail!(
        "cannot load {}: built without the `onnx` feature",
        dir.display()
    )
}

/// Run the configured models on the given inputs and combine the results.
pub async fn run_predict(
    predictor: &EnsemblePredictor,
    image: Option<&Path>,
    features: Option<&Path>,
) -> anyhow::Result<Outcome> {
    let start = Instant::now();

    let image_bytes = match image {
        Some(path) => Some(
            tokio::fs::read(path)
                .await
                .with_context(|| format!("reading image {}", path.display()))?,
        ),
        None => None,
    };
    let features = features.map(read_features).transpose()?;

    Ok(
        match predictor
            .predict(image_bytes.as_deref(), features.as_ref())
            .await
        {
            Ok(output) => {
                Outcome::Success(output.to_response().with_processing_time(start.elapsed()))
            }
            Err(e) => Outcome::Failure(e.to_response()),
        },
    )
}
