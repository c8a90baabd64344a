//! ONNX Runtime tabular classifier.
//!
//! The model directory must contain `model.onnx` and `features.json`, a JSON
//! array naming the model's input features in order. The model takes a
//! `[1, n_features]` float tensor and returns either one sigmoid probability
//! or one probability per class.
//!
//! Inference is synchronous and runs on tokio's blocking pool, so a slow
//! model does not stall the image request running alongside it.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use neurotrace_core::{ClassificationResult, FeatureRecord};
use ort::session::Session;
use ort::value::Tensor;
use tracing::{info, warn};

use crate::features::feature_vector;
use crate::{InferenceError, TabularClassifier};

/// Clinical-feature classifier running a local ONNX model.
pub struct OnnxTabularClassifier {
    session: Arc<Mutex<Session>>,
    input_name: Arc<str>,
    feature_order: Vec<String>,
}

impl OnnxTabularClassifier {
    /// Load a model from a directory containing `model.onnx` and `features.json`.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let features_path = model_dir.join("features.json");

        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
        anyhow::ensure!(
            features_path.exists(),
            "features.json not found in {model_dir:?}"
        );

        let feature_order: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(&features_path)?)
                .map_err(|e| anyhow::anyhow!("parse features.json: {e}"))?;
        anyhow::ensure!(!feature_order.is_empty(), "features.json lists no features");

        let session = Session::builder()?.commit_from_file(&model_path)?;
        let input_name = session
            .inputs()
            .first()
            .map(|input| Arc::<str>::from(input.name()))
            .ok_or_else(|| anyhow::anyhow!("model has no inputs"))?;

        let classifier = Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            feature_order,
        };

        // Warm up with a zero vector; a failure here is not fatal.
        let warmup = vec![0.0; classifier.feature_order.len()];
        if let Err(e) = run_session(&classifier.session, &classifier.input_name, warmup) {
            warn!(error = %e, "tabular model warmup failed");
        }

        info!(
            features = classifier.feature_order.len(),
            model = %model_path.display(),
            "loaded tabular model"
        );
        Ok(classifier)
    }

    /// Feature names in model input order.
    pub fn feature_order(&self) -> &[String] {
        &self.feature_order
    }

}

fn run_session(
    session: &Mutex<Session>,
    input_name: &str,
    input: Vec<f32>,
) -> Result<ClassificationResult, InferenceError> {
    let shape = [1i64, input.len() as i64];
    let tensor = Tensor::from_array((shape, input.into_boxed_slice())).map_err(backend)?;

    let mut session = session
        .lock()
        .map_err(|_| InferenceError::Unavailable("tabular session lock poisoned".into()))?;
    let outputs = session
        .run(ort::inputs![input_name => tensor])
        .map_err(backend)?;

    let (_, data) = outputs[0].try_extract_tensor::<f32>().map_err(backend)?;
    let raw: Vec<f64> = data.iter().map(|&v| f64::from(v)).collect();
    Ok(ClassificationResult::from_model_output(&raw)?)
}

#[async_trait]
impl TabularClassifier for OnnxTabularClassifier {
    async fn classify_features(
        &self,
        features: &FeatureRecord,
    ) -> Result<ClassificationResult, InferenceError> {
        let input = feature_vector(&self.feature_order, features)?;
        let session = Arc::clone(&self.session);
        let input_name = Arc::clone(&self.input_name);

        tokio::task::spawn_blocking(move || run_session(&session, &input_name, input))
            .await
            .map_err(|e| InferenceError::Backend(Box::new(e)))?
    }

    fn name(&self) -> &str {
        "onnx-tabular"
    }
}

fn backend(e: ort::Error) -> InferenceError {
    InferenceError::Backend(Box::new(e))
}
