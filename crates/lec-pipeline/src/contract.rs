//! The file contract between phases: which units a phase fans out to, what
//! each one must write, and the structural check every artifact must pass.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use lec_bib::ValidationRules;
use lec_core::enums::Phase;
use lec_hooks::check_bib_file;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::error::PipelineError;
use crate::layout::{OUTLINE_FILE, PLAN_FILE, RunLayout};

static DOMAIN_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^###\s+Domain\s+(\d+)\s*:\s*(.+?)\s*$").expect("valid domain heading regex")
});

/// Outline headings after this one are notes, not sections.
const OUTLINE_NOTES_HEADING: &str = "Notes for Synthesis Writer";

/// Violation lines quoted in an invalid-artifact message.
const MAX_QUOTED_VIOLATIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanDomain {
    pub index: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineSection {
    pub index: u32,
    pub heading: String,
}

/// Domains declared by `### Domain <N>: <name>` lines, in file order.
#[must_use]
pub fn parse_plan_domains(text: &str) -> Vec<PlanDomain> {
    let mut domains: Vec<PlanDomain> = Vec::new();
    for line in text.lines() {
        let Some(caps) = DOMAIN_HEADING.captures(line.trim_end()) else {
            continue;
        };
        let Ok(index) = caps[1].parse::<u32>() else {
            continue;
        };
        if domains.iter().any(|d| d.index == index) {
            warn!(index, "plan declares domain twice, keeping the first");
            continue;
        }
        domains.push(PlanDomain {
            index,
            name: caps[2].to_string(),
        });
    }
    domains
}

/// Every `## ` heading before the writer notes, numbered from 1.
#[must_use]
pub fn parse_outline_sections(text: &str) -> Vec<OutlineSection> {
    let mut sections = Vec::new();
    let mut in_fence = false;
    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        let Some(heading) = line.strip_prefix("## ") else {
            continue;
        };
        let heading = heading.trim();
        if heading.eq_ignore_ascii_case(OUTLINE_NOTES_HEADING) {
            break;
        }
        if heading.is_empty() {
            continue;
        }
        sections.push(OutlineSection {
            index: u32::try_from(sections.len() + 1).unwrap_or(u32::MAX),
            heading: heading.to_string(),
        });
    }
    sections
}

/// Read and parse the plan's domains.
///
/// # Errors
///
/// Returns `PipelineError::Io` if the plan cannot be read.
pub fn read_plan_domains(layout: &RunLayout) -> Result<Vec<PlanDomain>, PipelineError> {
    let path = layout.plan();
    let text = std::fs::read_to_string(&path).map_err(|e| PipelineError::io(path, e))?;
    Ok(parse_plan_domains(&text))
}

/// Read and parse the outline's sections.
///
/// # Errors
///
/// Returns `PipelineError::Io` if the outline cannot be read.
pub fn read_outline_sections(layout: &RunLayout) -> Result<Vec<OutlineSection>, PipelineError> {
    let path = layout.outline();
    let text = std::fs::read_to_string(&path).map_err(|e| PipelineError::io(path, e))?;
    Ok(parse_outline_sections(&text))
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// One worker invocation a phase needs: a distinct output path plus the
/// artifacts it may read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSpec {
    /// Domain or section index for fanned-out phases.
    pub unit: Option<u32>,
    /// Domain name or section heading.
    pub name: Option<String>,
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
}

/// The units `phase` runs in this layout.
///
/// Fanned-out phases read their predecessor's declaration; `assemble` has no
/// worker units.
///
/// # Errors
///
/// Returns `PipelineError::NoUnits` when the plan or outline declares nothing,
/// or `PipelineError::Io` when it cannot be read.
pub fn phase_units(phase: Phase, layout: &RunLayout) -> Result<Vec<UnitSpec>, PipelineError> {
    match phase {
        Phase::Plan => Ok(vec![UnitSpec {
            unit: None,
            name: None,
            inputs: Vec::new(),
            output: layout.plan(),
        }]),
        Phase::Research => {
            let domains = read_plan_domains(layout)?;
            if domains.is_empty() {
                return Err(PipelineError::NoUnits {
                    phase,
                    artifact: PLAN_FILE.to_string(),
                });
            }
            Ok(domains
                .into_iter()
                .map(|d| UnitSpec {
                    unit: Some(d.index),
                    name: Some(d.name),
                    inputs: vec![layout.plan()],
                    output: layout.domain_bib(d.index),
                })
                .collect())
        }
        Phase::SynthesisPlan => {
            let mut inputs = vec![layout.plan()];
            inputs.extend(domain_bibs(layout)?);
            Ok(vec![UnitSpec {
                unit: None,
                name: None,
                inputs,
                output: layout.outline(),
            }])
        }
        Phase::Write => {
            let sections = read_outline_sections(layout)?;
            if sections.is_empty() {
                return Err(PipelineError::NoUnits {
                    phase,
                    artifact: OUTLINE_FILE.to_string(),
                });
            }
            let mut inputs = vec![layout.outline(), layout.plan()];
            inputs.extend(domain_bibs(layout)?);
            Ok(sections
                .into_iter()
                .map(|s| UnitSpec {
                    unit: Some(s.index),
                    name: Some(s.heading),
                    inputs: inputs.clone(),
                    output: layout.section(s.index),
                })
                .collect())
        }
        Phase::Assemble => Ok(Vec::new()),
    }
}

/// Domain bibliographies in plan order.
///
/// # Errors
///
/// Returns `PipelineError::Io` if the plan cannot be read.
pub fn domain_bibs(layout: &RunLayout) -> Result<Vec<PathBuf>, PipelineError> {
    Ok(read_plan_domains(layout)?
        .into_iter()
        .map(|d| layout.domain_bib(d.index))
        .collect())
}

/// Every artifact that must exist and validate for `phase` to complete.
///
/// # Errors
///
/// Propagates errors from [`phase_units`].
pub fn expected_artifacts(phase: Phase, layout: &RunLayout) -> Result<Vec<PathBuf>, PipelineError> {
    if phase == Phase::Assemble {
        return Ok(vec![
            layout.final_review(),
            layout.literature_all(),
            layout.review_body(),
            layout.evidence_table(),
            layout.merge_report(),
        ]);
    }
    Ok(phase_units(phase, layout)?
        .into_iter()
        .map(|u| u.output)
        .collect())
}

// ---------------------------------------------------------------------------
// Structural checks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Plan,
    Outline,
    Bibliography,
    Markdown,
    Json,
}

impl ArtifactKind {
    /// Kind inferred from the file name, `None` for unrecognized extensions.
    #[must_use]
    pub fn of(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name == PLAN_FILE {
            return Some(Self::Plan);
        }
        if name == OUTLINE_FILE {
            return Some(Self::Outline);
        }
        match path.extension()?.to_str()? {
            "bib" => Some(Self::Bibliography),
            "md" => Some(Self::Markdown),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactStatus {
    Valid,
    Missing,
    Invalid(String),
}

impl ArtifactStatus {
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Structural check for one artifact.
///
/// Bibliographies go through the phase-exit gate, using the run's evidence
/// directory when `evidence_dir` is given. Unverified fields are logged but
/// never invalidate the file.
#[must_use]
pub fn check_artifact(
    path: &Path,
    evidence_dir: Option<&Path>,
    rules: &ValidationRules,
) -> ArtifactStatus {
    if !path.is_file() {
        return ArtifactStatus::Missing;
    }
    match ArtifactKind::of(path) {
        Some(ArtifactKind::Bibliography) => check_bibliography(path, evidence_dir, rules),
        Some(ArtifactKind::Json) => match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(_) => ArtifactStatus::Valid,
                Err(e) => ArtifactStatus::Invalid(format!("invalid JSON: {e}")),
            },
            Err(e) => ArtifactStatus::Invalid(format!("unreadable: {e}")),
        },
        Some(kind @ (ArtifactKind::Markdown | ArtifactKind::Plan | ArtifactKind::Outline)) => {
            check_markdown(path, kind)
        }
        None => ArtifactStatus::Valid,
    }
}

fn check_markdown(path: &Path, kind: ArtifactKind) -> ArtifactStatus {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => return ArtifactStatus::Invalid(format!("unreadable: {e}")),
    };
    if text.trim().is_empty() {
        return ArtifactStatus::Invalid("file is empty".into());
    }
    match kind {
        ArtifactKind::Plan if parse_plan_domains(&text).is_empty() => ArtifactStatus::Invalid(
            "plan declares no '### Domain <N>: <name>' headings".into(),
        ),
        ArtifactKind::Outline if parse_outline_sections(&text).is_empty() => {
            ArtifactStatus::Invalid("outline declares no '## ' section headings".into())
        }
        _ => ArtifactStatus::Valid,
    }
}

fn check_bibliography(
    path: &Path,
    evidence_dir: Option<&Path>,
    rules: &ValidationRules,
) -> ArtifactStatus {
    let report = match check_bib_file(path, evidence_dir, rules) {
        Ok(report) => report,
        Err(e) => return ArtifactStatus::Invalid(e.to_string()),
    };
    if !report.unverified.is_empty() {
        warn!(
            file = %path.display(),
            unverified = report.unverified.len(),
            "bibliography fields not confirmed by evidence"
        );
    }
    if report.valid {
        return ArtifactStatus::Valid;
    }
    let lines = report.violation_lines();
    let mut message = format!("{} violation(s): ", lines.len());
    message.push_str(
        &lines
            .iter()
            .take(MAX_QUOTED_VIOLATIONS)
            .cloned()
            .collect::<Vec<_>>()
            .join("; "),
    );
    if lines.len() > MAX_QUOTED_VIOLATIONS {
        message.push_str("; ...");
    }
    ArtifactStatus::Invalid(message)
}
