//! CLI response types returned as JSON by `lectern` commands.
//!
//! These structs define the shape of JSON output for commands like
//! `lectern run`, `lectern status`, `lectern dedupe`, and `lectern assemble`.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{Phase, PhaseStatus};
use crate::merge::{EnrichmentConflict, RejectedEvidence};

/// Ledger-derived state of one phase.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PhaseState {
    pub phase: Phase,
    pub complete: bool,
    pub last_status: Option<PhaseStatus>,
    pub last_ts: Option<DateTime<Utc>>,
    /// Number of ledger entries recorded for this phase.
    pub attempts: u32,
}

/// Response from `lectern status`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StatusResponse {
    pub run_root: String,
    pub next_pending: Option<Phase>,
    pub phases: Vec<PhaseState>,
}

/// What one phase execution did.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: Phase,
    /// Worker invocations launched in this run.
    pub units_invoked: u32,
    /// Units whose valid artifact was kept from a previous run.
    pub units_reused: u32,
    pub artifacts: Vec<String>,
    pub duration_ms: u64,
}

/// Response from `lectern run`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RunResponse {
    pub run_root: String,
    pub phases_run: Vec<PhaseReport>,
    pub complete: bool,
    pub next_pending: Option<Phase>,
}

/// Response from `lectern dedupe`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct DedupeResponse {
    pub output: String,
    pub records_in: u32,
    pub entries_out: u32,
    pub duplicates_folded: u32,
    pub warnings: u32,
    pub ambiguities: u32,
    pub renamed_keys: u32,
    pub skipped: u32,
}

/// Response from `lectern clean`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CleanResponse {
    pub file: String,
    pub changed: bool,
    pub records_changed: u32,
    pub fields_filled: u32,
    pub conflicts: Vec<EnrichmentConflict>,
    #[serde(default)]
    pub rejected: Vec<RejectedEvidence>,
    /// The cleaned text failed validation and the file was left as it was.
    #[serde(default)]
    pub refused: bool,
}

/// Response from `lectern assemble`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AssembleResponse {
    pub output: String,
    pub sections: Vec<String>,
    pub references_cited: u32,
    pub references_total: u32,
    pub warnings: Vec<String>,
}
