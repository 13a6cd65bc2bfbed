//! Phase-exit gate for one bibliography file.

use std::path::Path;

use lec_bib::cleaner::{EvidenceIndex, verify};
use lec_bib::{ValidationRules, parse_file, validate_parsed};
use lec_core::record::BibField;
use lec_core::validation::Violation;
use serde::Serialize;
use tracing::debug;

use crate::error::HookError;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UnverifiedEntry {
    pub key: String,
    pub field: BibField,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FillableEntry {
    pub key: String,
    pub field: BibField,
    pub value: String,
    pub source: String,
}

/// Structured verdict for one `.bib` file.
///
/// Only `violations` decide `valid`. Unverified and fillable fields are
/// advisory.
#[derive(Debug, Clone, Serialize)]
pub struct BibGateReport {
    pub file: String,
    pub valid: bool,
    pub records: usize,
    pub violations: Vec<Violation>,
    pub unverified: Vec<UnverifiedEntry>,
    pub fillable: Vec<FillableEntry>,
    /// Whether an evidence directory was consulted.
    pub evidence_checked: bool,
}

impl BibGateReport {
    /// One line per violation, `key: rule: message`.
    #[must_use]
    pub fn violation_lines(&self) -> Vec<String> {
        self.violations
            .iter()
            .map(|v| {
                if v.key.is_empty() {
                    format!("{}: {}", v.rule, v.message)
                } else {
                    format!("{}: {}: {}", v.key, v.rule, v.message)
                }
            })
            .collect()
    }
}

/// Validate `path`, cross-checking against the snapshots in `evidence_dir`
/// when given.
///
/// # Errors
///
/// Returns `HookError::Bib` when the file or the evidence directory cannot be
/// read.
pub fn check_bib_file(
    path: &Path,
    evidence_dir: Option<&Path>,
    rules: &ValidationRules,
) -> Result<BibGateReport, HookError> {
    let parsed = parse_file(path)?;
    let result = validate_parsed(&parsed, rules);

    let mut report = BibGateReport {
        file: path.display().to_string(),
        valid: result.valid,
        records: parsed.records.len(),
        violations: result.violations,
        unverified: Vec::new(),
        fillable: Vec::new(),
        evidence_checked: false,
    };

    if let Some(dir) = evidence_dir.filter(|d| d.is_dir()) {
        let index = EvidenceIndex::load(dir)?;
        report.evidence_checked = true;
        for record in &parsed.records {
            let check = verify(record, &index);
            report
                .unverified
                .extend(check.unverified.into_iter().map(|u| UnverifiedEntry {
                    key: u.key,
                    field: u.field,
                    value: u.value,
                }));
            report
                .fillable
                .extend(check.fillable.into_iter().map(|f| FillableEntry {
                    key: f.key,
                    field: f.field,
                    value: f.value,
                    source: f.source,
                }));
        }
    }

    debug!(
        file = %report.file,
        valid = report.valid,
        violations = report.violations.len(),
        unverified = report.unverified.len(),
        "bibliography gate"
    );
    Ok(report)
}
