//! Phase progress tracking over the append-only ledger.
//!
//! `is_complete` and `next_pending_phase` answer from memory only. The one
//! place that touches artifacts is [`PhaseTracker::mark_complete`], which
//! re-validates everything it is asked to record before appending.

use std::path::{Path, PathBuf};

use lec_bib::ValidationRules;
use lec_core::enums::{FailureKind, Phase, PhaseStatus};
use lec_core::ledger::{LedgerEntry, UnitFailure};
use lec_core::responses::{PhaseState, StatusResponse};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::contract::{ArtifactStatus, check_artifact};
use crate::error::PipelineError;
use crate::layout::RunLayout;
use crate::ledger::ProgressLedger;
use crate::mirror::render_progress;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidArtifact {
    pub artifact: String,
    pub reason: String,
}

/// What a completion attempt found wrong.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactAudit {
    pub missing: Vec<String>,
    pub invalid: Vec<InvalidArtifact>,
}

impl ArtifactAudit {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.invalid.is_empty()
    }

    /// The audit as ledger failures, without unit indices.
    #[must_use]
    pub fn to_failures(&self) -> Vec<UnitFailure> {
        let missing = self.missing.iter().map(|artifact| UnitFailure {
            unit: None,
            artifact: artifact.clone(),
            kind: FailureKind::MissingArtifact,
            detail: "artifact does not exist".into(),
        });
        let invalid = self.invalid.iter().map(|i| UnitFailure {
            unit: None,
            artifact: i.artifact.clone(),
            kind: FailureKind::InvalidArtifact,
            detail: i.reason.clone(),
        });
        missing.chain(invalid).collect()
    }
}

pub struct PhaseTracker {
    layout: RunLayout,
    ledger: ProgressLedger,
    rules: ValidationRules,
    topic: Option<String>,
}

impl PhaseTracker {
    /// Open the tracker for a run, loading its ledger.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Ledger` if an existing ledger cannot be read.
    pub fn open(layout: RunLayout, rules: ValidationRules) -> Result<Self, PipelineError> {
        let ledger = ProgressLedger::open(layout.ledger())?;
        debug!(entries = ledger.entries().len(), path = %ledger.path().display(), "opened progress ledger");
        Ok(Self {
            layout,
            ledger,
            rules,
            topic: None,
        })
    }

    /// Topic shown in the progress mirror.
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    #[must_use]
    pub const fn layout(&self) -> &RunLayout {
        &self.layout
    }

    #[must_use]
    pub const fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }

    #[must_use]
    pub const fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    #[must_use]
    pub fn is_complete(&self, phase: Phase) -> bool {
        self.ledger.has_completion(phase)
    }

    /// First phase in pipeline order without a `completed` entry.
    #[must_use]
    pub fn next_pending_phase(&self) -> Option<Phase> {
        Phase::ALL.into_iter().find(|phase| !self.is_complete(*phase))
    }

    /// # Errors
    ///
    /// Returns `PipelineError::Io` if the ledger cannot be appended.
    pub fn mark_started(&mut self, phase: Phase) -> Result<(), PipelineError> {
        self.append(LedgerEntry::new(phase, PhaseStatus::Started))
    }

    /// # Errors
    ///
    /// Returns `PipelineError::Io` if the ledger cannot be appended.
    pub fn mark_failed(
        &mut self,
        phase: Phase,
        failures: Vec<UnitFailure>,
    ) -> Result<(), PipelineError> {
        warn!(%phase, failures = failures.len(), "phase failed");
        self.append(LedgerEntry::new(phase, PhaseStatus::Failed).with_failures(failures))
    }

    /// Record a phase that stopped before its units could be judged.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Io` if the ledger cannot be appended.
    pub fn mark_aborted(&mut self, phase: Phase, reason: &str) -> Result<(), PipelineError> {
        warn!(%phase, reason, "phase aborted");
        self.append(LedgerEntry::new(phase, PhaseStatus::Failed).with_note(reason))
    }

    /// Re-validate `artifacts` and append a `completed` entry only if every
    /// one exists and passes its structural check.
    ///
    /// # Errors
    ///
    /// - `IncompleteArtifacts` carrying the missing and invalid set; nothing
    ///   is written.
    /// - `Io` if the ledger cannot be appended.
    pub fn mark_complete(
        &mut self,
        phase: Phase,
        artifacts: &[PathBuf],
    ) -> Result<(), PipelineError> {
        let audit = self.audit(artifacts);
        if !audit.is_clean() {
            debug!(%phase, missing = audit.missing.len(), invalid = audit.invalid.len(), "completion rejected");
            return Err(PipelineError::IncompleteArtifacts { phase, audit });
        }
        let recorded = artifacts.iter().map(|p| self.layout.relative(p)).collect();
        self.append(LedgerEntry::new(phase, PhaseStatus::Completed).with_artifacts(recorded))?;
        info!(%phase, artifacts = artifacts.len(), "phase complete");
        Ok(())
    }

    /// Structural status of each artifact, without touching the ledger.
    #[must_use]
    pub fn audit(&self, artifacts: &[PathBuf]) -> ArtifactAudit {
        let mut audit = ArtifactAudit::default();
        for path in artifacts {
            match self.check(path) {
                ArtifactStatus::Valid => {}
                ArtifactStatus::Missing => audit.missing.push(self.layout.relative(path)),
                ArtifactStatus::Invalid(reason) => audit.invalid.push(InvalidArtifact {
                    artifact: self.layout.relative(path),
                    reason,
                }),
            }
        }
        audit
    }

    /// Structural check for one artifact of this run.
    #[must_use]
    pub fn check(&self, path: &Path) -> ArtifactStatus {
        let json_dir = self.layout.json_dir();
        let has_evidence = std::fs::read_dir(&json_dir).is_ok_and(|mut d| d.next().is_some());
        let evidence = has_evidence.then_some(json_dir.as_path());
        check_artifact(path, evidence, &self.rules)
    }

    /// Ledger-derived status of every phase.
    #[must_use]
    pub fn status(&self) -> StatusResponse {
        let phases = Phase::ALL
            .into_iter()
            .map(|phase| {
                let last = self.ledger.last_for(phase);
                PhaseState {
                    phase,
                    complete: self.is_complete(phase),
                    last_status: last.map(|e| e.status),
                    last_ts: last.map(|e| e.ts),
                    attempts: u32::try_from(self.ledger.attempts(phase)).unwrap_or(u32::MAX),
                }
            })
            .collect();
        StatusResponse {
            run_root: self.layout.root().display().to_string(),
            next_pending: self.next_pending_phase(),
            phases,
        }
    }

    fn append(&mut self, entry: LedgerEntry) -> Result<(), PipelineError> {
        self.ledger.append(entry)?;
        self.write_mirror()
    }

    fn write_mirror(&self) -> Result<(), PipelineError> {
        let topic = self.topic.clone().unwrap_or_else(|| {
            self.layout
                .root()
                .file_name()
                .map_or_else(|| "review".to_string(), |n| n.to_string_lossy().into_owned())
        });
        let path = self.layout.progress_mirror();
        std::fs::write(&path, render_progress(&topic, &self.ledger))
            .map_err(|e| PipelineError::io(path, e))
    }
}
