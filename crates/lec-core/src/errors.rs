//! Cross-cutting error types for Lectern.
//!
//! Domain-specific errors (e.g., `BibError`, `PipelineError`) are defined in
//! their respective crates. A unified error is deferred to `lec-cli` where
//! all crate errors converge into `anyhow`.

use thiserror::Error;

/// Errors raised by the core model.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A string did not name a known phase, field, or role.
    #[error("Unknown {kind}: {value}")]
    UnknownName { kind: &'static str, value: String },
}
