//! General application configuration.

use serde::{Deserialize, Serialize};

fn default_output_dir() -> String {
    "reviews".to_string()
}

fn default_citation_style() -> String {
    "apa".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Directory (relative to the project) that holds one run root per topic.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Reference list style. Only `apa` is rendered today.
    #[serde(default = "default_citation_style")]
    pub citation_style: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            citation_style: default_citation_style(),
        }
    }
}
