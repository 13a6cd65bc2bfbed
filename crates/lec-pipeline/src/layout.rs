//! Run directory layout.
//!
//! Every path a phase reads or writes is derived here from the run root, so
//! workers, the tracker, and the assembler agree on the file contract.

use std::path::{Path, PathBuf};

use crate::error::PipelineError;

pub const INTERMEDIATE_DIR: &str = "intermediate_files";
pub const PLAN_FILE: &str = "lit-review-plan.md";
pub const OUTLINE_FILE: &str = "synthesis-outline.md";
pub const LEDGER_FILE: &str = "progress-ledger.jsonl";
pub const PROGRESS_MIRROR_FILE: &str = "task-progress.md";
pub const MERGE_REPORT_FILE: &str = "merge-report.json";

const MAX_SLUG_CHARS: usize = 80;

/// Directory name for a topic: lowercase ASCII alphanumerics joined by `-`.
#[must_use]
pub fn slugify(topic: &str) -> String {
    let mut slug = String::with_capacity(topic.len());
    let mut pending_dash = false;
    for c in topic.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug.truncate(MAX_SLUG_CHARS);
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "review".to_string()
    } else {
        slug.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    root: PathBuf,
}

impl RunLayout {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<output_dir>/<slug(topic)>`.
    #[must_use]
    pub fn for_topic(output_dir: &Path, topic: &str) -> Self {
        Self::new(output_dir.join(slugify(topic)))
    }

    /// Create the run root, `intermediate_files/`, and `intermediate_files/json/`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Io` if a directory cannot be created.
    pub fn ensure_dirs(&self) -> Result<(), PipelineError> {
        let json = self.json_dir();
        std::fs::create_dir_all(&json).map_err(|e| PipelineError::io(json, e))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn intermediate_dir(&self) -> PathBuf {
        self.root.join(INTERMEDIATE_DIR)
    }

    /// Evidence snapshot directory.
    #[must_use]
    pub fn json_dir(&self) -> PathBuf {
        self.intermediate_dir().join("json")
    }

    #[must_use]
    pub fn plan(&self) -> PathBuf {
        self.intermediate_dir().join(PLAN_FILE)
    }

    #[must_use]
    pub fn domain_bib(&self, domain: u32) -> PathBuf {
        self.intermediate_dir()
            .join(format!("literature-domain-{domain}.bib"))
    }

    #[must_use]
    pub fn outline(&self) -> PathBuf {
        self.intermediate_dir().join(OUTLINE_FILE)
    }

    #[must_use]
    pub fn section(&self, section: u32) -> PathBuf {
        self.intermediate_dir()
            .join(format!("synthesis-section-{section}.md"))
    }

    #[must_use]
    pub fn ledger(&self) -> PathBuf {
        self.intermediate_dir().join(LEDGER_FILE)
    }

    #[must_use]
    pub fn progress_mirror(&self) -> PathBuf {
        self.intermediate_dir().join(PROGRESS_MIRROR_FILE)
    }

    #[must_use]
    pub fn merge_report(&self) -> PathBuf {
        self.intermediate_dir().join(MERGE_REPORT_FILE)
    }

    #[must_use]
    pub fn final_review(&self) -> PathBuf {
        self.root.join("literature-review-final.md")
    }

    #[must_use]
    pub fn literature_all(&self) -> PathBuf {
        self.root.join("literature-all.bib")
    }

    #[must_use]
    pub fn review_body(&self) -> PathBuf {
        self.root.join("review.md")
    }

    #[must_use]
    pub fn evidence_table(&self) -> PathBuf {
        self.root.join("evidence_table.md")
    }

    #[must_use]
    pub fn references_bib(&self) -> PathBuf {
        self.root.join("references.bib")
    }

    /// `path` relative to the run root, `/`-separated, for ledger entries.
    #[must_use]
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}
