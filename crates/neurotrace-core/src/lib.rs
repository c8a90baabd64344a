pub mod classification;
pub mod labels;
pub mod method;
pub mod response;

pub use classification::{ClassificationError, ClassificationResult, ClassificationWire};
pub use labels::ClassLabels;
pub use method::EnsembleMethod;
pub use response::{EnsembleResponse, ErrorResponse, IndividualView, PredictionView};

/// A structured clinical feature record, keyed by feature name.
///
/// The feature schema belongs to the tabular model; records pass through
/// this crate untouched.
pub type FeatureRecord = serde_json::Map<String, serde_json::Value>;
