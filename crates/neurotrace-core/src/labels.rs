//! Human-readable names for class indices.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Labels used by the handwriting and clinical models: 0 = Non-Dementia,
/// 1 = Dementia.
pub const DEFAULT_LABELS: &[&str] = &["Non-Dementia", "Dementia"];

/// Ordered class names, indexed by class id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassLabels(Vec<String>);

impl Default for ClassLabels {
    fn default() -> Self {
        Self::new(DEFAULT_LABELS.iter().map(|s| s.to_string()).collect())
    }
}

impl ClassLabels {
    pub fn new(labels: Vec<String>) -> Self {
        Self(labels)
    }

    /// Label for `class`, or `class <n>` when the index has no name.
    pub fn name(&self, class: usize) -> String {
        self.0
            .get(class)
            .cloned()
            .unwrap_or_else(|| format!("class {class}"))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(class, label)` pairs in class order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.0.iter().map(String::as_str).enumerate()
    }
}

/// Parses a comma-separated list, e.g. `Non-Dementia,Dementia`.
impl FromStr for ClassLabels {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let labels: Vec<String> = s
            .split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        if labels.is_empty() {
            return Err("label list is empty".to_string());
        }
        Ok(Self::new(labels))
    }
}

impl fmt::Display for ClassLabels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self.iter().map(|(i, l)| format!("{i}={l}")).collect();
        f.write_str(&pairs.join(", "))
    }
}
