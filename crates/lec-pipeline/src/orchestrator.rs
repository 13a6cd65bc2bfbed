//! The phase state machine.
//!
//! Phases run strictly in order. Fanned-out phases spawn one worker per unit
//! into a `JoinSet`, bounded by a semaphore and a per-worker timeout, and wait
//! for every unit before judging the phase. A failing unit fails the phase but
//! never cancels its siblings, and every artifact stays on disk for the next
//! attempt.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use lec_bib::{EvidenceIndex, ValidationRules, clean_file, dedupe_files, render_bibliography};
use lec_config::{LecternConfig, PipelineConfig};
use lec_core::enums::{FailureKind, Phase};
use lec_core::ledger::UnitFailure;
use lec_core::responses::{AssembleResponse, PhaseReport, RunResponse};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::assembler::{SectionText, assemble, render_evidence_table};
use crate::contract::{
    ArtifactStatus, UnitSpec, domain_bibs, expected_artifacts, phase_units, read_outline_sections,
};
use crate::error::PipelineError;
use crate::layout::RunLayout;
use crate::tracker::PhaseTracker;
use crate::worker::{Worker, WorkerTask};

/// The review a run produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub topic: String,
    pub description: String,
}

/// Callbacks around each phase of [`Orchestrator::run_observed`].
pub trait PhaseObserver {
    fn started(&mut self, _phase: Phase) {}
    fn finished(&mut self, _report: &PhaseReport) {}
    fn failed(&mut self, _phase: Phase, _error: &PipelineError) {}
}

impl PhaseObserver for () {}

enum UnitOutcome {
    Finished,
    Failed(String),
    TimedOut(Duration),
}

#[derive(Default)]
struct PhaseWork {
    invoked: u32,
    reused: u32,
}

pub struct Orchestrator<W: Worker> {
    tracker: PhaseTracker,
    worker: Arc<W>,
    pipeline: PipelineConfig,
    request: RunRequest,
    assembly: Option<AssembleResponse>,
}

impl<W: Worker> Orchestrator<W> {
    /// Open (or resume) the run rooted at `layout`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Io` if the run directories cannot be created or
    /// `PipelineError::Ledger` if an existing ledger is unreadable.
    pub fn open(
        layout: RunLayout,
        request: RunRequest,
        config: &LecternConfig,
        worker: W,
    ) -> Result<Self, PipelineError> {
        layout.ensure_dirs()?;
        let rules = ValidationRules::from(&config.validation);
        let tracker = PhaseTracker::open(layout, rules)?.with_topic(request.topic.clone());
        Ok(Self {
            tracker,
            worker: Arc::new(worker),
            pipeline: config.pipeline.clone(),
            request,
            assembly: None,
        })
    }

    #[must_use]
    pub const fn tracker(&self) -> &PhaseTracker {
        &self.tracker
    }

    #[must_use]
    pub const fn layout(&self) -> &RunLayout {
        self.tracker.layout()
    }

    #[must_use]
    pub fn next_pending_phase(&self) -> Option<Phase> {
        self.tracker.next_pending_phase()
    }

    /// Summary of the last assemble step run by this orchestrator.
    #[must_use]
    pub const fn assembly(&self) -> Option<&AssembleResponse> {
        self.assembly.as_ref()
    }

    /// Run every pending phase in order, stopping after `until` when given.
    ///
    /// # Errors
    ///
    /// Returns the first phase error; earlier phases stay recorded as complete.
    pub async fn run(&mut self, until: Option<Phase>) -> Result<RunResponse, PipelineError> {
        self.run_observed(until, &mut ()).await
    }

    /// [`Self::run`], reporting each phase to `observer` as it starts and
    /// ends.
    ///
    /// # Errors
    ///
    /// Returns the first phase error after passing it to
    /// [`PhaseObserver::failed`].
    pub async fn run_observed(
        &mut self,
        until: Option<Phase>,
        observer: &mut impl PhaseObserver,
    ) -> Result<RunResponse, PipelineError> {
        let mut phases_run = Vec::new();
        while let Some(phase) = self.next_pending_phase() {
            if until.is_some_and(|last| phase > last) {
                break;
            }
            observer.started(phase);
            match self.run_phase(phase).await {
                Ok(report) => {
                    observer.finished(&report);
                    phases_run.push(report);
                }
                Err(error) => {
                    observer.failed(phase, &error);
                    return Err(error);
                }
            }
        }
        let next_pending = self.next_pending_phase();
        Ok(RunResponse {
            run_root: self.layout().root().display().to_string(),
            phases_run,
            complete: next_pending.is_none(),
            next_pending,
        })
    }

    /// Run one phase whose predecessor is complete.
    ///
    /// # Errors
    ///
    /// - `PredecessorIncomplete` when the previous phase has no completion.
    /// - `PhaseFailed` naming the failing units or artifacts; a `failed` entry
    ///   is appended to the ledger.
    /// - I/O and bibliography errors from the assemble step.
    pub async fn run_phase(&mut self, phase: Phase) -> Result<PhaseReport, PipelineError> {
        if let Some(predecessor) = phase.predecessor()
            && !self.tracker.is_complete(predecessor)
        {
            return Err(PipelineError::PredecessorIncomplete { phase, predecessor });
        }

        let started = Instant::now();
        info!(%phase, "starting phase");
        self.tracker.mark_started(phase)?;

        let work = if phase == Phase::Assemble {
            self.assemble_outputs().map(|()| PhaseWork::default())
        } else {
            self.run_units(phase).await
        };
        let work = match work {
            Ok(work) => work,
            Err(PipelineError::PhaseFailed { phase, failures }) => {
                self.tracker.mark_failed(phase, failures.clone())?;
                return Err(PipelineError::PhaseFailed { phase, failures });
            }
            Err(e) => {
                self.tracker.mark_aborted(phase, &e.to_string())?;
                return Err(e);
            }
        };

        let artifacts = expected_artifacts(phase, self.layout())?;
        match self.tracker.mark_complete(phase, &artifacts) {
            Ok(()) => {}
            Err(PipelineError::IncompleteArtifacts { audit, .. }) => {
                let failures = audit.to_failures();
                self.tracker.mark_failed(phase, failures.clone())?;
                return Err(PipelineError::PhaseFailed { phase, failures });
            }
            Err(e) => return Err(e),
        }

        Ok(PhaseReport {
            phase,
            units_invoked: work.invoked,
            units_reused: work.reused,
            artifacts: artifacts.iter().map(|p| self.layout().relative(p)).collect(),
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }

    async fn run_units(&self, phase: Phase) -> Result<PhaseWork, PipelineError> {
        let Some(role) = phase.worker_role() else {
            return Ok(PhaseWork::default());
        };
        let units = phase_units(phase, self.layout())?;
        let mut work = PhaseWork::default();

        let mut pending = Vec::new();
        for unit in &units {
            if self.pipeline.reuse_valid_artifacts && self.tracker.check(&unit.output).is_valid() {
                debug!(%phase, unit = ?unit.unit, "reusing valid artifact");
                work.reused += 1;
            } else {
                pending.push(unit.clone());
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.pipeline.concurrency()));
        let limit = self.pipeline.worker_timeout();
        let mut set = JoinSet::new();
        let mut by_task = HashMap::new();

        for unit in pending {
            let task = WorkerTask {
                role,
                unit: unit.unit,
                unit_name: unit.name.clone(),
                topic: self.request.topic.clone(),
                description: self.request.description.clone(),
                run_root: self.layout().root().to_path_buf(),
                inputs: unit.inputs.clone(),
                output: unit.output.clone(),
            };
            let worker = Arc::clone(&self.worker);
            let sem = Arc::clone(&semaphore);
            let handle = set.spawn(async move {
                let Ok(_permit) = sem.acquire_owned().await else {
                    return UnitOutcome::Failed("worker pool closed".into());
                };
                match tokio::time::timeout(limit, worker.run(task)).await {
                    Ok(Ok(())) => UnitOutcome::Finished,
                    Ok(Err(e)) => UnitOutcome::Failed(e.to_string()),
                    Err(_) => UnitOutcome::TimedOut(limit),
                }
            });
            by_task.insert(handle.id(), unit);
            work.invoked += 1;
        }
        debug!(%phase, invoked = work.invoked, reused = work.reused, "workers spawned");

        let mut failures = Vec::new();
        let mut worker_failed = Vec::new();
        while let Some(joined) = set.join_next_with_id().await {
            let (id, outcome) = match joined {
                Ok((id, outcome)) => (id, outcome),
                Err(e) => (e.id(), UnitOutcome::Failed(format!("worker task panicked: {e}"))),
            };
            let Some(unit) = by_task.remove(&id) else {
                continue;
            };
            let failure = match outcome {
                UnitOutcome::Finished => {
                    debug!(%phase, unit = ?unit.unit, "worker finished");
                    continue;
                }
                UnitOutcome::Failed(detail) => (FailureKind::WorkerFailed, detail),
                UnitOutcome::TimedOut(after) => (
                    FailureKind::TimedOut,
                    format!("no result after {}s", after.as_secs()),
                ),
            };
            warn!(%phase, unit = ?unit.unit, kind = %failure.0, detail = %failure.1, "worker failed");
            failures.push(UnitFailure {
                unit: unit.unit,
                artifact: self.layout().relative(&unit.output),
                kind: failure.0,
                detail: failure.1,
            });
            worker_failed.push(unit.output);
        }

        if phase == Phase::Research && self.pipeline.clean_with_evidence {
            self.clean_domain_files(&units)?;
        }

        for unit in &units {
            if worker_failed.contains(&unit.output) {
                continue;
            }
            let (kind, detail) = match self.tracker.check(&unit.output) {
                ArtifactStatus::Valid => continue,
                ArtifactStatus::Missing => {
                    (FailureKind::MissingArtifact, "artifact was not written".to_string())
                }
                ArtifactStatus::Invalid(reason) => (FailureKind::InvalidArtifact, reason),
            };
            failures.push(UnitFailure {
                unit: unit.unit,
                artifact: self.layout().relative(&unit.output),
                kind,
                detail,
            });
        }

        if failures.is_empty() {
            Ok(work)
        } else {
            failures.sort_by_key(|f| f.unit);
            Err(PipelineError::PhaseFailed { phase, failures })
        }
    }

    /// Fill missing fields of every domain file from the evidence snapshots.
    fn clean_domain_files(&self, units: &[UnitSpec]) -> Result<(), PipelineError> {
        let index = EvidenceIndex::load(&self.layout().json_dir())?;
        if index.is_empty() {
            return Ok(());
        }
        for unit in units.iter().filter(|u| u.output.is_file()) {
            match clean_file(&unit.output, &index) {
                Ok(report) => {
                    for conflict in &report.conflicts {
                        warn!(
                            key = %conflict.key,
                            field = %conflict.field,
                            kept = %conflict.kept,
                            evidence = %conflict.discarded,
                            "evidence disagrees with record"
                        );
                    }
                    if report.refused {
                        warn!(
                            file = %self.layout().relative(&unit.output),
                            "cleaned text failed validation; file left unchanged"
                        );
                    }
                    if report.changed {
                        info!(
                            file = %self.layout().relative(&unit.output),
                            fields_filled = report.fields_filled,
                            "filled fields from evidence"
                        );
                    }
                }
                Err(e) => warn!(file = %unit.output.display(), error = %e, "evidence cleaning skipped"),
            }
        }
        Ok(())
    }

    /// Deduplicate the domain files and write every final artifact.
    fn assemble_outputs(&mut self) -> Result<(), PipelineError> {
        let layout = self.tracker.layout();
        let merged = dedupe_files(&domain_bibs(layout)?)?;
        for ambiguity in &merged.ambiguities {
            warn!(key = %ambiguity.key, source = %ambiguity.source, reason = %ambiguity.reason, "identity ambiguity");
        }
        for skipped in &merged.skipped {
            warn!(key = %skipped.key, source = %skipped.source, reason = %skipped.reason, "record skipped from merge");
        }
        info!(
            records_in = merged.records_in,
            entries = merged.len(),
            folded = merged.duplicates_folded(),
            "bibliography merged"
        );

        write_file(&layout.literature_all(), &render_bibliography(merged.records()))?;
        write_file(&layout.merge_report(), &serde_json::to_string_pretty(&merged)?)?;

        let mut sections = Vec::new();
        for section in read_outline_sections(layout)? {
            let path = layout.section(section.index);
            let content =
                std::fs::read_to_string(&path).map_err(|e| PipelineError::io(&path, e))?;
            sections.push(SectionText {
                source: layout.relative(&path),
                heading: section.heading,
                content,
            });
        }

        let title = format!("Literature Review: {}", self.request.topic);
        let review = assemble(&sections, &merged, &title, Utc::now().date_naive());
        for warning in &review.warnings {
            warn!(%warning, "assembly");
        }

        write_file(&layout.final_review(), &review.document)?;
        write_file(&layout.review_body(), &review.body)?;
        write_file(&layout.references_bib(), &render_bibliography(&review.cited))?;
        write_file(&layout.evidence_table(), &render_evidence_table(merged.records()))?;
        info!(
            sections = review.sections.len(),
            cited = review.cited.len(),
            "review assembled"
        );
        self.assembly = Some(AssembleResponse {
            output: layout.relative(&layout.final_review()),
            references_cited: u32::try_from(review.cited.len()).unwrap_or(u32::MAX),
            references_total: u32::try_from(merged.len()).unwrap_or(u32::MAX),
            sections: review.sections,
            warnings: review.warnings,
        });
        Ok(())
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), PipelineError> {
    std::fs::write(path, contents).map_err(|e| PipelineError::io(PathBuf::from(path), e))
}
