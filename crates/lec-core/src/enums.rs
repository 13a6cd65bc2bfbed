//! Phase, status, rule, and role enums for Lectern.
//!
//! Enums serialize with `snake_case` except [`Phase`], which uses the
//! `kebab-case` names that appear in the progress ledger and on the CLI
//! (`synthesis-plan`).

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// One stage of the fixed review pipeline.
///
/// ```text
/// plan → research → synthesis-plan → write → assemble
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Plan,
    Research,
    SynthesisPlan,
    Write,
    Assemble,
}

impl Phase {
    /// Every phase in execution order.
    pub const ALL: [Self; 5] = [
        Self::Plan,
        Self::Research,
        Self::SynthesisPlan,
        Self::Write,
        Self::Assemble,
    ];

    /// The phase that must be complete before this one may start.
    #[must_use]
    pub const fn predecessor(self) -> Option<Self> {
        match self {
            Self::Plan => None,
            Self::Research => Some(Self::Plan),
            Self::SynthesisPlan => Some(Self::Research),
            Self::Write => Some(Self::SynthesisPlan),
            Self::Assemble => Some(Self::Write),
        }
    }

    /// The phase that follows this one, `None` for the terminal phase.
    #[must_use]
    pub const fn successor(self) -> Option<Self> {
        match self {
            Self::Plan => Some(Self::Research),
            Self::Research => Some(Self::SynthesisPlan),
            Self::SynthesisPlan => Some(Self::Write),
            Self::Write => Some(Self::Assemble),
            Self::Assemble => None,
        }
    }

    /// Whether transitioning from `self` directly to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.successor() == Some(next)
    }

    /// The worker role that produces this phase's artifacts.
    ///
    /// `Assemble` is performed in-process and has no worker.
    #[must_use]
    pub const fn worker_role(self) -> Option<WorkerRole> {
        match self {
            Self::Plan => Some(WorkerRole::Planner),
            Self::Research => Some(WorkerRole::Researcher),
            Self::SynthesisPlan => Some(WorkerRole::SynthesisPlanner),
            Self::Write => Some(WorkerRole::Writer),
            Self::Assemble => None,
        }
    }

    /// Whether the phase fans out one worker per unit (domain or section).
    #[must_use]
    pub const fn fans_out(self) -> bool {
        matches!(self, Self::Research | Self::Write)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Research => "research",
            Self::SynthesisPlan => "synthesis-plan",
            Self::Write => "write",
            Self::Assemble => "assemble",
        }
    }

    /// Human-readable label used in the progress mirror.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Plan => "Structure literature review domains",
            Self::Research => "Research domains in parallel",
            Self::SynthesisPlan => "Outline synthesis review across domains",
            Self::Write => "Write review sections in parallel",
            Self::Assemble => "Assemble final review files and bibliography",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|phase| phase.as_str() == normalized)
            .ok_or_else(|| CoreError::UnknownName {
                kind: "phase",
                value: s.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// PhaseStatus
// ---------------------------------------------------------------------------

/// Status recorded by one progress ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Started,
    Completed,
    Failed,
}

impl PhaseStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// WorkerRole
// ---------------------------------------------------------------------------

/// The kind of agent a worker invocation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerRole {
    Planner,
    Researcher,
    SynthesisPlanner,
    Writer,
}

impl WorkerRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::Researcher => "researcher",
            Self::SynthesisPlanner => "synthesis_planner",
            Self::Writer => "writer",
        }
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// Structural rule checked by the record validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    RequiredField,
    DoiSyntax,
    Encoding,
    Annotation,
    DuplicateKey,
    DuplicateField,
    Syntax,
}

impl Rule {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequiredField => "required_field",
            Self::DoiSyntax => "doi_syntax",
            Self::Encoding => "encoding",
            Self::Annotation => "annotation",
            Self::DuplicateKey => "duplicate_key",
            Self::DuplicateField => "duplicate_field",
            Self::Syntax => "syntax",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FailureKind
// ---------------------------------------------------------------------------

/// Why a fanned-out unit (or a phase artifact) did not pass the phase gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The worker process exited unsuccessfully or could not be launched.
    WorkerFailed,
    /// The worker exceeded the configured timeout.
    TimedOut,
    /// The declared output path does not exist.
    MissingArtifact,
    /// The artifact exists but fails structural validation.
    InvalidArtifact,
}

impl FailureKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WorkerFailed => "worker_failed",
            Self::TimedOut => "timed_out",
            Self::MissingArtifact => "missing_artifact",
            Self::InvalidArtifact => "invalid_artifact",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
