//! Ordering of clinical feature records into model input vectors.

use neurotrace_core::FeatureRecord;
use serde_json::Value;

use crate::InferenceError;

/// Lay out `record` in `order`, one `f32` per feature.
///
/// Numbers, booleans (as 0/1) and numeric strings are accepted. A missing or
/// non-numeric feature is an error; nothing is zero-filled.
pub fn feature_vector(order: &[String], record: &FeatureRecord) -> Result<Vec<f32>, InferenceError> {
    order
        .iter()
        .map(|name| {
            let value = record
                .get(name)
                .ok_or_else(|| InferenceError::InvalidInput(format!("missing feature '{name}'")))?;
            numeric(value)
                .map(|v| v as f32)
                .ok_or_else(|| {
                    InferenceError::InvalidInput(format!("feature '{name}' is not numeric: {value}"))
                })
        })
        .collect()
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
