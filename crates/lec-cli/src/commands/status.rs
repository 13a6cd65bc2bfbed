use std::path::Path;

use anyhow::{Context, bail};
use lec_bib::ValidationRules;
use lec_config::LecternConfig;
use lec_pipeline::PhaseTracker;

use crate::bootstrap::run_layout;
use crate::cli::GlobalFlags;
use crate::cli::root_commands::StatusArgs;
use crate::output::output;

/// Handle `lectern status`. Reads the ledger only; artifacts are not checked.
pub fn handle(
    args: &StatusArgs,
    project_root: &Path,
    config: &LecternConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let layout = run_layout(
        project_root,
        config,
        args.topic.as_deref(),
        args.run_dir.as_deref(),
    )
    .context("status needs a topic or --run-dir")?;
    if !layout.root().is_dir() {
        bail!("no run found at {}", layout.root().display());
    }

    let tracker = PhaseTracker::open(layout, ValidationRules::from(&config.validation))
        .context("failed to read progress ledger")?;
    output(&tracker.status(), flags.format)
}
