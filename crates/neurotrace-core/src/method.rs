use std::fmt;

use serde::{Deserialize, Serialize};

/// How an ensemble result was derived from the individual model results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsembleMethod {
    /// Both models above the confidence threshold; probabilities averaged.
    EnsembleAverage,
    /// Tabular model strictly more confident; its result passed through.
    TabularDominant,
    /// Image model at least as confident; its result passed through.
    ImageDominant,
    /// Only the tabular model produced a result.
    TabularOnly,
    /// Only the image model produced a result.
    ImageOnly,
}

impl EnsembleMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnsembleAverage => "ensemble_average",
            Self::TabularDominant => "tabular_dominant",
            Self::ImageDominant => "image_dominant",
            Self::TabularOnly => "tabular_only",
            Self::ImageOnly => "image_only",
        }
    }
}

impl fmt::Display for EnsembleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_tag_matches_as_str() {
        for method in [
            EnsembleMethod::EnsembleAverage,
            EnsembleMethod::TabularDominant,
            EnsembleMethod::ImageDominant,
            EnsembleMethod::TabularOnly,
            EnsembleMethod::ImageOnly,
        ] {
            let json = serde_json::to_string(&method).unwrap();
            assert_eq!(json, format!("\"{}\"", method.as_str()));
        }
    }
}
