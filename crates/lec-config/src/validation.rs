//! Record validation thresholds.

use serde::{Deserialize, Serialize};

/// Annotation texts that carry no information.
pub const DEFAULT_PLACEHOLDERS: [&str; 7] = [
    "important contribution",
    "todo",
    "tbd",
    "n/a",
    "none",
    "placeholder",
    "to be added",
];

const fn default_min_annotation_chars() -> usize {
    40
}

fn default_placeholders() -> Vec<String> {
    DEFAULT_PLACEHOLDERS.iter().map(|s| (*s).to_string()).collect()
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidationConfig {
    /// Minimum length of the `note` annotation, in characters.
    #[serde(default = "default_min_annotation_chars")]
    pub min_annotation_chars: usize,

    #[serde(default = "default_placeholders")]
    pub placeholder_annotations: Vec<String>,

    /// When false the `annotation` rule is not checked.
    #[serde(default = "default_true")]
    pub require_annotation: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_annotation_chars: default_min_annotation_chars(),
            placeholder_annotations: default_placeholders(),
            require_annotation: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = ValidationConfig::default();
        assert_eq!(config.min_annotation_chars, 40);
        assert!(config.require_annotation);
        assert_eq!(config.placeholder_annotations.len(), 7);
        assert!(config.placeholder_annotations.iter().any(|p| p == "tbd"));
    }
}
