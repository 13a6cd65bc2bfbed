use std::path::Path;

use anyhow::{Context, bail};
use lec_bib::{EvidenceIndex, clean_file};
use lec_core::responses::CleanResponse;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::CleanArgs;
use crate::commands::shared::evidence_dir_for;
use crate::output::output;

/// Handle `lectern clean`.
pub fn handle(args: &CleanArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let file = Path::new(&args.file);
    let Some(evidence) = evidence_dir_for(file, args.evidence_dir.as_deref()) else {
        bail!(
            "no evidence directory: pass --evidence-dir or create {}",
            file.with_file_name("json").display()
        );
    };

    let index = EvidenceIndex::load(&evidence)
        .with_context(|| format!("failed to load evidence from {}", evidence.display()))?;
    if index.is_empty() {
        tracing::warn!(dir = %evidence.display(), "evidence directory has no snapshots");
    }

    let report = clean_file(file, &index)
        .with_context(|| format!("failed to clean {}", file.display()))?;
    for conflict in &report.conflicts {
        tracing::warn!(
            key = %conflict.key,
            field = %conflict.field,
            kept = %conflict.kept,
            evidence = %conflict.discarded,
            "evidence disagrees with record"
        );
    }

    if report.refused {
        tracing::warn!(file = %file.display(), "cleaned text failed validation; file left unchanged");
    }

    let response = CleanResponse {
        file: file.display().to_string(),
        changed: report.changed,
        records_changed: u32::try_from(report.records_changed).unwrap_or(u32::MAX),
        fields_filled: u32::try_from(report.fields_filled).unwrap_or(u32::MAX),
        conflicts: report.conflicts,
        rejected: report.rejected,
        refused: report.refused,
    };
    output(&response, flags.format)
}
