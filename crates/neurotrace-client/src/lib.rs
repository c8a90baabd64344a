//! Client layer: remote model-inference services over HTTP.

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{ClientError, InferenceClient};
