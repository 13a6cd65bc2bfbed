use std::path::Path;

use anyhow::Context;
use lec_config::LecternConfig;
use lec_core::enums::Phase;
use lec_core::responses::PhaseReport;
use lec_pipeline::{CommandWorker, Orchestrator, PhaseObserver, PipelineError, RunRequest};

use crate::bootstrap::run_layout;
use crate::cli::GlobalFlags;
use crate::cli::root_commands::RunArgs;
use crate::context::warn_unconfigured;
use crate::output::output;
use crate::progress::Progress;

/// Handle `lectern run`.
pub async fn handle(
    args: &RunArgs,
    project_root: &Path,
    config: &LecternConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    warn_unconfigured(config);

    let layout = run_layout(
        project_root,
        config,
        Some(&args.topic),
        args.run_dir.as_deref(),
    )
    .context("no run directory could be derived from the topic")?;
    let request = RunRequest {
        topic: args.topic.clone(),
        description: args
            .description
            .clone()
            .unwrap_or_else(|| args.topic.clone()),
    };
    let worker = CommandWorker::new(config.workers.clone());
    let mut orchestrator = Orchestrator::open(layout, request, config, worker)
        .context("failed to open run directory")?;

    let mut spinners = PhaseSpinners::default();
    let response = match orchestrator
        .run_observed(args.until.map(Phase::from), &mut spinners)
        .await
    {
        Ok(response) => response,
        Err(error) => {
            let phase = spinners
                .failed
                .map_or_else(|| "the run".to_string(), |phase| format!("phase {phase}"));
            return Err(error).with_context(|| {
                format!(
                    "{phase} did not complete; fix the reported artifacts and re-run \
                     `lectern run` to resume"
                )
            });
        }
    };
    output(&response, flags.format)
}

/// One spinner per phase on stderr.
#[derive(Default)]
struct PhaseSpinners {
    current: Option<Progress>,
    failed: Option<Phase>,
}

impl PhaseObserver for PhaseSpinners {
    fn started(&mut self, phase: Phase) {
        self.current = Some(Progress::for_phase(phase));
    }

    fn finished(&mut self, report: &PhaseReport) {
        if let Some(spinner) = self.current.take() {
            spinner.finish_ok(&format!(
                "{}: done ({} invoked, {} reused)",
                report.phase, report.units_invoked, report.units_reused
            ));
        }
    }

    fn failed(&mut self, phase: Phase, _error: &PipelineError) {
        if let Some(spinner) = self.current.take() {
            spinner.finish_err(&format!("{phase}: failed"));
        }
        self.failed = Some(phase);
    }
}
