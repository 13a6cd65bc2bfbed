use std::path::Path;

use anyhow::{Context, bail};
use lec_config::LecternConfig;
use lec_core::enums::Phase;
use lec_pipeline::{CommandWorker, Orchestrator, RunRequest};

use crate::bootstrap::run_layout;
use crate::cli::GlobalFlags;
use crate::cli::root_commands::AssembleArgs;
use crate::output::output;
use crate::progress::Progress;

/// Handle `lectern assemble`: re-run the assemble phase of an existing run.
///
/// The write phase must already be complete. Re-assembling a finished run
/// appends a fresh `completed` entry.
pub async fn handle(
    args: &AssembleArgs,
    project_root: &Path,
    config: &LecternConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let layout = run_layout(
        project_root,
        config,
        Some(&args.topic),
        args.run_dir.as_deref(),
    )
    .context("no run directory could be derived from the topic")?;
    if !layout.root().is_dir() {
        bail!("no run found at {}", layout.root().display());
    }

    let request = RunRequest {
        topic: args.topic.clone(),
        description: args.topic.clone(),
    };
    let worker = CommandWorker::new(config.workers.clone());
    let mut orchestrator = Orchestrator::open(layout, request, config, worker)
        .context("failed to open run directory")?;

    let spinner = Progress::for_phase(Phase::Assemble);
    if let Err(error) = orchestrator.run_phase(Phase::Assemble).await {
        spinner.finish_err("assemble: failed");
        return Err(error).context("assemble did not complete");
    }
    spinner.finish_clear();

    let response = orchestrator
        .assembly()
        .context("assemble finished without a summary")?;
    output(response, flags.format)
}
