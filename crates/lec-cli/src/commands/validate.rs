use std::path::Path;

use anyhow::{Context, bail};
use lec_bib::ValidationRules;
use lec_config::LecternConfig;
use lec_hooks::check_bib_file;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ValidateArgs;
use crate::commands::shared::evidence_dir_for;
use crate::output::output;

/// Handle `lectern validate`.
pub fn handle(args: &ValidateArgs, config: &LecternConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let file = Path::new(&args.file);
    let evidence = evidence_dir_for(file, args.evidence_dir.as_deref());
    let rules = ValidationRules::from(&config.validation);

    let report = check_bib_file(file, evidence.as_deref(), &rules)
        .with_context(|| format!("failed to check {}", file.display()))?;

    output(&report, flags.format)?;
    if !report.valid {
        bail!(
            "{} has {} violation(s)",
            file.display(),
            report.violations.len()
        );
    }
    Ok(())
}
