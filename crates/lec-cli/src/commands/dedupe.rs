use std::path::Path;

use anyhow::Context;
use lec_bib::{dedupe_files, render_bibliography};
use lec_core::responses::DedupeResponse;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::DedupeArgs;
use crate::output::output;

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Handle `lectern dedupe`.
pub fn handle(args: &DedupeArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let merged = dedupe_files(&args.files).context("failed to read input bibliographies")?;
    for ambiguity in &merged.ambiguities {
        tracing::warn!(key = %ambiguity.key, source = %ambiguity.source, reason = %ambiguity.reason, "identity ambiguity");
    }
    for skipped in &merged.skipped {
        tracing::warn!(key = %skipped.key, source = %skipped.source, reason = %skipped.reason, "record skipped from merge");
    }

    let out = Path::new(&args.output);
    std::fs::write(out, render_bibliography(merged.records()))
        .with_context(|| format!("failed to write {}", out.display()))?;

    if let Some(report) = &args.report {
        let json = serde_json::to_string_pretty(&merged)?;
        std::fs::write(report, json).with_context(|| format!("failed to write {report}"))?;
    }

    let response = DedupeResponse {
        output: out.display().to_string(),
        records_in: count(merged.records_in),
        entries_out: count(merged.len()),
        duplicates_folded: count(merged.duplicates_folded()),
        warnings: count(merged.warning_count()),
        ambiguities: count(merged.ambiguities.len()),
        renamed_keys: count(merged.renamed_keys.len()),
        skipped: count(merged.skipped.len()),
    };
    output(&response, flags.format)
}
