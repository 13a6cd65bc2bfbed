//! Scripted in-process worker shared by the orchestrator tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lec_config::LecternConfig;
use lec_core::enums::WorkerRole;
use lec_pipeline::{Orchestrator, RunLayout, RunRequest, Worker, WorkerError, WorkerTask};

pub const PLAN: &str = "# Literature Review Plan\n\n\
    ### Domain 1: Foundations of trust\nClassic work.\n\n\
    ### Domain 2: Remote coordination\nDistributed teams.\n\n\
    ### Domain 3: Measurement\nScales and instruments.\n";

pub const OUTLINE: &str = "# Synthesis Outline\n\n\
    ## Introduction\nFrame the question.\n\n\
    ## Evidence across domains\nCompare findings.\n\n\
    ## Notes for Synthesis Writer\nKeep it short.\n";

/// A domain file with one paper shared by every domain and one of its own.
#[must_use]
pub fn domain_bib(unit: u32) -> String {
    format!(
        "@article{{smith2020,\n  title = {{Trust in Distributed Teams}},\n  author = {{Smith, John}},\n  \
         year = {{2020}},\n  doi = {{10.999/shared}},\n  \
         note = {{Shared foundational study of how trust forms in distributed teams.}},\n}}\n\n\
         @article{{domain{unit}paper,\n  title = {{Domain {unit} evidence}},\n  author = {{Author{unit}, Alex}},\n  \
         year = {{201{unit}}},\n  journal = {{Journal {unit}}},\n  doi = {{10.100/{unit}}},\n  \
         note = {{Domain-specific evidence on coordination mechanisms for unit {unit}.}},\n}}\n"
    )
}

#[must_use]
pub fn section(unit: u32) -> String {
    match unit {
        1 => "## Introduction\n\nTrust matters [@smith2020].\n".to_string(),
        n => format!("### Findings\n\nSee @domain{n}paper and [@domain1paper].\n\n## References\n- stale\n"),
    }
}

#[derive(Clone, Default)]
pub struct ScriptedWorker {
    pub calls: Arc<Mutex<Vec<(WorkerRole, Option<u32>)>>>,
    /// Research units that write a record without an author.
    pub invalid_units: HashSet<u32>,
    /// Research units whose worker reports an error without writing.
    pub erroring_units: HashSet<u32>,
    /// Research units that never finish.
    pub hanging_units: HashSet<u32>,
}

impl ScriptedWorker {
    #[must_use]
    pub fn calls(&self) -> Vec<(WorkerRole, Option<u32>)> {
        let mut calls = self.calls.lock().unwrap().clone();
        calls.sort();
        calls
    }

    #[must_use]
    pub fn calls_for(&self, role: WorkerRole) -> Vec<Option<u32>> {
        self.calls()
            .into_iter()
            .filter(|(r, _)| *r == role)
            .map(|(_, unit)| unit)
            .collect()
    }
}

impl Worker for ScriptedWorker {
    async fn run(&self, task: WorkerTask) -> Result<(), WorkerError> {
        self.calls.lock().unwrap().push((task.role, task.unit));
        let unit = task.unit.unwrap_or(0);

        let body = match task.role {
            WorkerRole::Planner => PLAN.to_string(),
            WorkerRole::Researcher => {
                if self.hanging_units.contains(&unit) {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
                if self.erroring_units.contains(&unit) {
                    return Err(WorkerError::Other("search backend unavailable".into()));
                }
                if self.invalid_units.contains(&unit) {
                    format!("@article{{broken{unit},\n  title = {{Only a title}},\n}}\n")
                } else {
                    domain_bib(unit)
                }
            }
            WorkerRole::SynthesisPlanner => OUTLINE.to_string(),
            WorkerRole::Writer => section(unit),
        };
        std::fs::write(&task.output, body)?;
        Ok(())
    }
}

#[must_use]
pub fn config() -> LecternConfig {
    let mut config = LecternConfig::default();
    config.pipeline.worker_timeout_secs = 1;
    config
}

pub fn open(
    dir: &std::path::Path,
    worker: ScriptedWorker,
    config: &LecternConfig,
) -> Orchestrator<ScriptedWorker> {
    Orchestrator::open(
        RunLayout::new(dir),
        RunRequest {
            topic: "Trust in distributed teams".into(),
            description: "How remote teams build trust.".into(),
        },
        config,
        worker,
    )
    .unwrap()
}
