//! Configuration error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer could not be read or did not match the config shape.
    #[error("failed to load lectern config: {0}")]
    Figment(#[from] figment::Error),

    /// A value loaded fine but would make the pipeline unusable.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
