//! Fan-in semantics: one failing unit fails the phase without touching its
//! siblings.

mod common;

use lec_bib::ValidationRules;
use lec_core::enums::{FailureKind, Phase, PhaseStatus, WorkerRole};
use lec_core::responses::PhaseReport;
use lec_pipeline::contract::check_artifact;
use lec_pipeline::{PhaseObserver, PipelineError};
use pretty_assertions::assert_eq;

use common::{ScriptedWorker, config, open};

#[tokio::test]
async fn invalid_unit_fails_only_that_unit() {
    let dir = tempfile::tempdir().unwrap();
    let worker = ScriptedWorker {
        invalid_units: [2].into(),
        ..ScriptedWorker::default()
    };
    let mut orchestrator = open(dir.path(), worker.clone(), &config());

    let err = orchestrator.run(None).await.unwrap_err();
    let PipelineError::PhaseFailed { phase, failures } = err else {
        panic!("expected a phase failure");
    };
    assert_eq!(phase, Phase::Research);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].unit, Some(2));
    assert_eq!(failures[0].kind, FailureKind::InvalidArtifact);
    assert_eq!(failures[0].artifact, "intermediate_files/literature-domain-2.bib");
    assert!(failures[0].detail.contains("broken2: required_field"), "{}", failures[0].detail);

    let layout = orchestrator.layout();
    let rules = ValidationRules::default();
    assert!(check_artifact(&layout.domain_bib(1), None, &rules).is_valid());
    assert!(check_artifact(&layout.domain_bib(3), None, &rules).is_valid());
    // The failing artifact stays on disk for inspection.
    assert!(layout.domain_bib(2).is_file());

    let tracker = orchestrator.tracker();
    assert!(!tracker.is_complete(Phase::Research));
    assert_eq!(tracker.next_pending_phase(), Some(Phase::Research));
    let last = tracker.ledger().last_for(Phase::Research).unwrap();
    assert_eq!(last.status, PhaseStatus::Failed);
    assert_eq!(last.failures, failures);
}

#[tokio::test]
async fn retry_reinvokes_only_the_failed_unit() {
    let dir = tempfile::tempdir().unwrap();
    let config = config();

    let broken = ScriptedWorker {
        invalid_units: [2].into(),
        ..ScriptedWorker::default()
    };
    let mut orchestrator = open(dir.path(), broken, &config);
    assert!(orchestrator.run(Some(Phase::Research)).await.is_err());

    let fixed = ScriptedWorker::default();
    let mut orchestrator = open(dir.path(), fixed.clone(), &config);
    let response = orchestrator.run(Some(Phase::Research)).await.unwrap();

    assert_eq!(fixed.calls_for(WorkerRole::Researcher), vec![Some(2)]);
    let research = &response.phases_run[0];
    assert_eq!(research.phase, Phase::Research);
    assert_eq!(research.units_invoked, 1);
    assert_eq!(research.units_reused, 2);
    assert_eq!(response.next_pending, Some(Phase::SynthesisPlan));
}

#[tokio::test]
async fn worker_errors_and_timeouts_are_named_per_unit() {
    let dir = tempfile::tempdir().unwrap();
    let worker = ScriptedWorker {
        erroring_units: [1].into(),
        hanging_units: [3].into(),
        ..ScriptedWorker::default()
    };
    let mut orchestrator = open(dir.path(), worker, &config());

    let err = orchestrator.run(Some(Phase::Research)).await.unwrap_err();
    let PipelineError::PhaseFailed { failures, .. } = err else {
        panic!("expected a phase failure");
    };
    let summary: Vec<(Option<u32>, FailureKind)> =
        failures.iter().map(|f| (f.unit, f.kind)).collect();
    assert_eq!(
        summary,
        vec![
            (Some(1), FailureKind::WorkerFailed),
            (Some(3), FailureKind::TimedOut),
        ]
    );
    assert!(failures[0].detail.contains("search backend unavailable"));
    assert!(orchestrator.layout().domain_bib(2).is_file());
}

#[tokio::test]
async fn evidence_fills_missing_fields_before_the_gate() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = open(dir.path(), ScriptedWorker::default(), &config());
    let json_dir = orchestrator.layout().json_dir();
    std::fs::write(
        json_dir.join("openalex.json"),
        serde_json::json!({
            "results": [{
                "title": "Trust in Distributed Teams",
                "year": 2020,
                "doi": "https://doi.org/10.999/shared",
                "journal": "Organization Science",
                "volume": "9"
            }]
        })
        .to_string(),
    )
    .unwrap();

    orchestrator.run(Some(Phase::Research)).await.unwrap();

    let domain = std::fs::read_to_string(orchestrator.layout().domain_bib(1)).unwrap();
    assert!(domain.contains("journal = {Organization Science}"), "{domain}");
    assert!(domain.contains("volume = {9}"), "{domain}");
}

#[derive(Default)]
struct Recorder {
    events: Vec<String>,
}

impl PhaseObserver for Recorder {
    fn started(&mut self, phase: Phase) {
        self.events.push(format!("start {phase}"));
    }

    fn finished(&mut self, report: &PhaseReport) {
        self.events.push(format!("done {}", report.phase));
    }

    fn failed(&mut self, phase: Phase, _error: &PipelineError) {
        self.events.push(format!("fail {phase}"));
    }
}

#[tokio::test]
async fn observer_sees_each_phase_until_the_failure() {
    let dir = tempfile::tempdir().unwrap();
    let worker = ScriptedWorker {
        invalid_units: [3].into(),
        ..ScriptedWorker::default()
    };
    let mut orchestrator = open(dir.path(), worker, &config());
    let mut recorder = Recorder::default();

    let err = orchestrator.run_observed(None, &mut recorder).await.unwrap_err();
    assert!(matches!(err, PipelineError::PhaseFailed { phase: Phase::Research, .. }));
    assert_eq!(
        recorder.events,
        vec!["start plan", "done plan", "start research", "fail research"]
    );
}
