use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use lec_bib::ValidationRules;
use lec_config::LecternConfig;
use lec_hooks::{check_bib_file, guard_stdin, validate_ledger_file};
use lec_pipeline::RunLayout;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::HookCommands;
use crate::commands::shared::evidence_dir_for;
use crate::output::output;

/// Handle `lectern hook`.
pub fn handle(
    action: &HookCommands,
    config: &LecternConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let rules = ValidationRules::from(&config.validation);
    match action {
        HookCommands::ValidateBib { file, evidence_dir } => {
            validate_bib(Path::new(file), evidence_dir.as_deref(), &rules, flags)
        }
        HookCommands::GuardWrite => guard_write(&rules),
        HookCommands::ValidateLedger { file } => {
            let path = match file {
                Some(file) => PathBuf::from(file),
                None => RunLayout::new(
                    std::env::current_dir().context("failed to read current directory")?,
                )
                .ledger(),
            };
            validate_ledger(&path, flags)
        }
    }
}

fn validate_bib(
    file: &Path,
    evidence_dir: Option<&str>,
    rules: &ValidationRules,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let evidence = evidence_dir_for(file, evidence_dir);
    let report = check_bib_file(file, evidence.as_deref(), rules)
        .with_context(|| format!("hook validate-bib: failed to check {}", file.display()))?;

    output(&report, flags.format)?;
    if !report.valid {
        for line in report.violation_lines() {
            eprintln!("{line}");
        }
        bail!("hook validate-bib: {} is invalid", file.display());
    }
    Ok(())
}

/// Always exits successfully; a denial is carried in the JSON answer.
fn guard_write(rules: &ValidationRules) -> anyhow::Result<()> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("hook guard-write: failed to read stdin")?;

    let decision = guard_stdin(&input, rules);
    if !decision.is_allowed() {
        tracing::info!("denied bibliography write");
    }
    println!("{}", decision.to_hook_output());
    Ok(())
}

fn validate_ledger(path: &Path, flags: &GlobalFlags) -> anyhow::Result<()> {
    let report = validate_ledger_file(path)
        .with_context(|| format!("hook validate-ledger: failed to read {}", path.display()))?;
    let valid = report.is_valid();

    output(&report, flags.format)?;
    if !valid {
        bail!("hook validate-ledger: {} has invalid lines", path.display());
    }
    Ok(())
}
