//! # lec-config
//!
//! Layered configuration loading for Lectern using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`LECTERN_*` prefix, `__` as separator)
//! 2. Project-level `.lectern/config.toml`
//! 3. User-level `~/.config/lectern/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `LECTERN_PIPELINE__WORKER_TIMEOUT_SECS` -> `pipeline.worker_timeout_secs`,
//! `LECTERN_GENERAL__OUTPUT_DIR` -> `general.output_dir`, etc.
//! The `__` (double underscore) separates nested config sections.
//!
//! # Usage
//!
//! ```no_run
//! use lec_config::LecternConfig;
//!
//! let config = LecternConfig::load_with_dotenv().expect("config");
//! println!("workers time out after {:?}", config.pipeline.worker_timeout());
//! ```

mod error;
mod general;
mod pipeline;
mod validation;
mod workers;

pub use error::ConfigError;
pub use general::GeneralConfig;
pub use pipeline::PipelineConfig;
pub use validation::{DEFAULT_PLACEHOLDERS, ValidationConfig};
pub use workers::{WorkerCommand, WorkersConfig};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project-relative location of the project config file.
pub const PROJECT_CONFIG_PATH: &str = ".lectern/config.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LecternConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

impl LecternConfig {
    /// Load configuration from all sources, reading the project config from
    /// the current directory.
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` loading.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."))
    }

    /// Load configuration with the project config taken from `project_root`.
    pub fn load_from(project_root: &Path) -> Result<Self, ConfigError> {
        let config: Self = Self::figment_for(project_root).extract()?;
        config.check()?;
        Ok(config)
    }

    /// Load configuration with `.env` file support.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain rooted at the current directory.
    pub fn figment() -> Figment {
        Self::figment_for(Path::new("."))
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment directly or add providers on top.
    pub fn figment_for(project_root: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        // Layer 2: Project-local config
        let local_path = project_root.join(PROJECT_CONFIG_PATH);
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment.merge(Env::prefixed("LECTERN_").split("__"))
    }

    /// Reject values that would make the pipeline unusable.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.pipeline.worker_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.worker_timeout_secs".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.general.output_dir.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "general.output_dir".into(),
                reason: "must not be empty".into(),
            });
        }
        if !self.general.citation_style.eq_ignore_ascii_case("apa") {
            return Err(ConfigError::InvalidValue {
                field: "general.citation_style".into(),
                reason: format!("unsupported style '{}'", self.general.citation_style),
            });
        }
        Ok(())
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lectern").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_loads() {
        let config = LecternConfig::default();
        assert_eq!(config.pipeline.worker_timeout_secs, 1800);
        assert_eq!(config.validation.min_annotation_chars, 40);
        assert_eq!(config.general.output_dir, "reviews");
        assert!(!config.workers.planner.is_configured());
        assert!(config.check().is_ok());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = LecternConfig::default();
        config.pipeline.worker_timeout_secs = 0;
        assert!(matches!(
            config.check(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "pipeline.worker_timeout_secs"
        ));
    }

    #[test]
    fn unknown_citation_style_is_rejected() {
        let mut config = LecternConfig::default();
        config.general.citation_style = "mla".into();
        assert!(config.check().is_err());
    }
}
