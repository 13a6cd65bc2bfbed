//! Pipeline and worker error types.

use std::path::PathBuf;

use lec_core::enums::{Phase, WorkerRole};
use lec_core::ledger::UnitFailure;
use thiserror::Error;

use crate::tracker::ArtifactAudit;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot start {phase}: {predecessor} is not complete")]
    PredecessorIncomplete { phase: Phase, predecessor: Phase },

    #[error("{phase} failed: {}", describe_failures(.failures))]
    PhaseFailed {
        phase: Phase,
        failures: Vec<UnitFailure>,
    },

    #[error("{phase} cannot be marked complete: {}", describe_failures(&.audit.to_failures()))]
    IncompleteArtifacts { phase: Phase, audit: ArtifactAudit },

    #[error("{phase} has no units: {artifact} declares none")]
    NoUnits { phase: Phase, artifact: String },

    #[error("failed to read progress ledger {path}: {source}")]
    Ledger {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Bib(#[from] lec_bib::BibError),

    #[error(transparent)]
    Hook(#[from] lec_hooks::HookError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn describe_failures(failures: &[UnitFailure]) -> String {
    let parts: Vec<String> = failures
        .iter()
        .map(|f| match f.unit {
            Some(unit) => format!("unit {unit} ({}): {}", f.kind, f.detail),
            None => format!("{} ({}): {}", f.artifact, f.kind, f.detail),
        })
        .collect();
    parts.join("; ")
}

/// A single worker invocation that did not finish cleanly.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("no command configured for the {role} role")]
    NotConfigured { role: WorkerRole },

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("worker I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker exited with {status}: {stderr_tail}")]
    Exited { status: String, stderr_tail: String },

    #[error("worker failed: {0}")]
    Other(String),
}
