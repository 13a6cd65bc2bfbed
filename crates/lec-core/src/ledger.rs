//! Progress ledger entry envelope.
//!
//! Every phase transition is recorded as a `LedgerEntry` line in
//! `intermediate_files/progress-ledger.jsonl`. Entries are only ever appended;
//! re-running a completed phase appends a new `completed` entry, so the file
//! reads as an audit trail rather than current state.
//!
//! The `v` field supports schema versioning: lines without a `v` field
//! deserialize with `v == 1` via `#[serde(default)]`.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{FailureKind, Phase, PhaseStatus};

/// Current ledger line version.
pub const LEDGER_VERSION: u32 = 1;

const fn default_ledger_version() -> u32 {
    LEDGER_VERSION
}

/// A unit (or phase artifact) that did not pass the phase gate.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct UnitFailure {
    /// Domain or section index for fanned-out phases.
    pub unit: Option<u32>,
    /// Artifact path relative to the run root.
    pub artifact: String,
    pub kind: FailureKind,
    pub detail: String,
}

/// A single line of the progress ledger.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Schema version. Defaults to 1 for lines without this field.
    #[serde(default = "default_ledger_version")]
    pub v: u32,

    pub ts: DateTime<Utc>,

    pub phase: Phase,

    pub status: PhaseStatus,

    /// Artifacts validated at this checkpoint, relative to the run root.
    #[serde(default)]
    pub artifacts: Vec<String>,

    #[serde(default)]
    pub failures: Vec<UnitFailure>,

    #[serde(default)]
    pub note: Option<String>,
}

impl LedgerEntry {
    #[must_use]
    pub fn new(phase: Phase, status: PhaseStatus) -> Self {
        Self {
            v: LEDGER_VERSION,
            ts: Utc::now(),
            phase,
            status,
            artifacts: Vec::new(),
            failures: Vec::new(),
            note: None,
        }
    }

    #[must_use]
    pub fn with_artifacts(mut self, artifacts: Vec<String>) -> Self {
        self.artifacts = artifacts;
        self
    }

    #[must_use]
    pub fn with_failures(mut self, failures: Vec<UnitFailure>) -> Self {
        self.failures = failures;
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn is_completion_of(&self, phase: Phase) -> bool {
        self.phase == phase && self.status == PhaseStatus::Completed
    }
}
