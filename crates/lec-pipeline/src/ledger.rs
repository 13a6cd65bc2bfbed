//! Append-only progress ledger.
//!
//! The JSONL file under `intermediate_files/` is the source of truth for which
//! phases are complete. Lines are appended with
//! `serde_jsonlines::append_json_lines` and never rewritten; the in-memory copy
//! mirrors the file so queries never touch disk.

use std::path::{Path, PathBuf};

use lec_core::enums::{Phase, PhaseStatus};
use lec_core::ledger::LedgerEntry;

use crate::error::PipelineError;

pub struct ProgressLedger {
    path: PathBuf,
    entries: Vec<LedgerEntry>,
}

impl ProgressLedger {
    /// Load the ledger at `path`. A missing file is an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Ledger` if the file exists but a line cannot be
    /// read or deserialized.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                entries: Vec::new(),
            });
        }
        let entries = serde_jsonlines::json_lines(&path)
            .and_then(|lines| lines.collect::<Result<Vec<LedgerEntry>, _>>())
            .map_err(|source| PipelineError::Ledger {
                path: path.clone(),
                source,
            })?;
        Ok(Self { path, entries })
    }

    /// Append one entry to the file, then to memory.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Io` if the line cannot be written.
    pub fn append(&mut self, entry: LedgerEntry) -> Result<(), PipelineError> {
        serde_jsonlines::append_json_lines(&self.path, [&entry])
            .map_err(|e| PipelineError::io(&self.path, e))?;
        self.entries.push(entry);
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry for `phase`.
    #[must_use]
    pub fn last_for(&self, phase: Phase) -> Option<&LedgerEntry> {
        self.entries.iter().rev().find(|e| e.phase == phase)
    }

    /// Number of entries recorded for `phase`.
    #[must_use]
    pub fn attempts(&self, phase: Phase) -> usize {
        self.entries.iter().filter(|e| e.phase == phase).count()
    }

    /// Whether any `completed` entry exists for `phase`.
    #[must_use]
    pub fn has_completion(&self, phase: Phase) -> bool {
        self.entries.iter().any(|e| e.is_completion_of(phase))
    }

    /// Whether the latest entry for `phase` is a failure.
    #[must_use]
    pub fn last_failed(&self, phase: Phase) -> bool {
        self.last_for(phase)
            .is_some_and(|e| e.status == PhaseStatus::Failed)
    }
}
