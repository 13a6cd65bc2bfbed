//! Human-readable `task-progress.md`, regenerated from the ledger after every
//! append. Never read back.

use std::fmt::Write as _;

use chrono::{SecondsFormat, Utc};
use lec_core::enums::{Phase, PhaseStatus};
use lec_core::ledger::LedgerEntry;

use crate::ledger::ProgressLedger;

#[must_use]
pub fn render_progress(topic: &str, ledger: &ProgressLedger) -> String {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let current = Phase::ALL
        .into_iter()
        .find(|phase| !ledger.has_completion(*phase));

    let mut out = String::new();
    let _ = writeln!(out, "# Literature Review Progress Tracker\n");
    let _ = writeln!(out, "**Research Topic**: {topic}");
    let _ = writeln!(out, "**Last Updated**: {now}\n");
    let _ = writeln!(out, "## Progress Status\n");
    for phase in Phase::ALL {
        let marker = if ledger.has_completion(phase) { 'x' } else { ' ' };
        let _ = writeln!(out, "- [{marker}] {} (`{phase}`)", phase.label());
    }
    let _ = writeln!(out, "\n## Current Task\n");
    match current {
        Some(phase) if ledger.last_failed(phase) => {
            let _ = writeln!(out, "{} (failed, awaiting re-run)", phase.label());
        }
        Some(phase) => {
            let _ = writeln!(out, "{}", phase.label());
        }
        None => {
            let _ = writeln!(out, "Complete");
        }
    }
    let _ = writeln!(out, "\n## Latest Note\n");
    let note = ledger
        .entries()
        .last()
        .map_or_else(|| "Initializing review run.".to_string(), describe_entry);
    let _ = writeln!(out, "{note}");
    out
}

fn describe_entry(entry: &LedgerEntry) -> String {
    if let Some(note) = &entry.note {
        return note.clone();
    }
    match entry.status {
        PhaseStatus::Started => format!("{} started.", entry.phase),
        PhaseStatus::Completed => format!(
            "{} complete ({} artifact(s) validated).",
            entry.phase,
            entry.artifacts.len()
        ),
        PhaseStatus::Failed => {
            let units: Vec<String> = entry
                .failures
                .iter()
                .map(|f| {
                    f.unit
                        .map_or_else(|| f.artifact.clone(), |unit| format!("unit {unit}"))
                })
                .collect();
            format!("{} failed: {}.", entry.phase, units.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checklist_marks_completed_phases() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ProgressLedger::open(dir.path().join("ledger.jsonl")).unwrap();
        ledger
            .append(LedgerEntry::new(Phase::Plan, PhaseStatus::Completed))
            .unwrap();
        ledger
            .append(LedgerEntry::new(Phase::Research, PhaseStatus::Started))
            .unwrap();

        let text = render_progress("Team trust", &ledger);
        assert!(text.contains("**Research Topic**: Team trust"));
        assert!(text.contains("- [x] Structure literature review domains (`plan`)"));
        assert!(text.contains("- [ ] Research domains in parallel (`research`)"));
        assert!(text.contains("## Current Task\n\nResearch domains in parallel\n"));
        assert!(text.contains("research started."));
    }
}
