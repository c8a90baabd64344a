//! HTTP client for remote model-inference services.
//!
//! Speaks the prediction API of the model service: images go to
//! `POST /predict/file` as multipart field `file`, clinical feature records
//! to `POST /predict/json` as a JSON object. Both answer with
//! `{ "prediction", "confidence", "probs" }`.

use std::time::Duration;

use async_trait::async_trait;
use neurotrace_ai::{ImageClassifier, InferenceError, TabularClassifier};
use neurotrace_core::{ClassificationResult, FeatureRecord};
use reqwest::multipart::{Form, Part};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ClientError> for InferenceError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Http(ref e) if e.is_connect() || e.is_timeout() => {
                InferenceError::Unavailable(err.to_string())
            }
            ClientError::Server { status: 503, .. } => InferenceError::Unavailable(err.to_string()),
            other => InferenceError::Backend(Box::new(other)),
        }
    }
}

/// Client for one model service.
pub struct InferenceClient {
    client: reqwest::Client,
    base_url: String,
}

impl InferenceClient {
    /// Create a client for the given service base URL.
    ///
    /// `base_url` should be like `http://localhost:9000` (no trailing slash).
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a client whose requests give up after `timeout`.
    pub fn with_timeout(base_url: String, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Classify an encoded image.
    pub async fn predict_file(&self, image: &[u8]) -> Result<ClassificationResult, ClientError> {
        let url = format!("{}/predict/file", self.base_url);

        info!(url = %url, bytes = image.len(), "requesting image classification");
        let part = Part::bytes(image.to_vec()).file_name("handwriting");
        let form = Form::new().part("file", part);
        let resp = self.client.post(&url).multipart(form).send().await?;
        Self::read_result(resp).await
    }

    /// Classify a clinical feature record.
    pub async fn predict_json(
        &self,
        features: &FeatureRecord,
    ) -> Result<ClassificationResult, ClientError> {
        let url = format!("{}/predict/json", self.base_url);

        info!(url = %url, features = features.len(), "requesting tabular classification");
        let resp = self.client.post(&url).json(features).send().await?;
        Self::read_result(resp).await
    }

    async fn read_result(resp: reqwest::Response) -> Result<ClassificationResult, ClientError> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ClientError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let result: ClassificationResult = serde_json::from_str(&body)?;
        info!(
            prediction = result.predicted_class(),
            confidence = result.confidence(),
            "received classification"
        );
        Ok(result)
    }
}

#[async_trait]
impl ImageClassifier for InferenceClient {
    async fn classify_image(&self, image: &[u8]) -> Result<ClassificationResult, InferenceError> {
        Ok(self.predict_file(image).await?)
    }

    fn name(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TabularClassifier for InferenceClient {
    async fn classify_features(
        &self,
        features: &FeatureRecord,
    ) -> Result<ClassificationResult, InferenceError> {
        Ok(self.predict_json(features).await?)
    }

    fn name(&self) -> &str {
        &self.base_url
    }
}
