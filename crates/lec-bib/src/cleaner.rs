//! Evidence-backed metadata cleaning.
//!
//! Research workers save the raw retrieval responses they cited as JSON next to
//! their bibliography (`intermediate_files/json/`). The cleaner uses those
//! snapshots as a read-only oracle: it fills fields a record lacks, reports
//! disagreements, and never overwrites what the record already says.

use std::collections::HashMap;
use std::path::Path;

use lec_core::enums::Rule;
use lec_core::evidence::EvidenceSnapshot;
use lec_core::identity::{normalize_doi, normalize_field, normalize_title};
use lec_core::merge::{EnrichmentConflict, RejectedEvidence};
use lec_core::record::{BibField, BibRecord};
use lec_core::validation::Violation;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::BibError;
use crate::parser::{parse_file, parse_str};
use crate::render::render_bibliography;
use crate::validator::{ValidationRules, unsafe_value_reason, validate_parsed};

/// Snapshots indexed by normalized DOI and normalized title.
#[derive(Debug, Default)]
pub struct EvidenceIndex {
    snapshots: Vec<EvidenceSnapshot>,
    by_doi: HashMap<String, Vec<usize>>,
    by_title: HashMap<String, Vec<usize>>,
    /// JSON files that could not be read or parsed.
    pub skipped_files: Vec<String>,
}

impl EvidenceIndex {
    #[must_use]
    pub fn new(snapshots: Vec<EvidenceSnapshot>) -> Self {
        let mut index = Self::default();
        for snapshot in snapshots {
            index.insert(snapshot);
        }
        index
    }

    /// Load every `*.json` file in `dir`, in file-name order.
    ///
    /// A missing directory yields an empty index. Unreadable or malformed
    /// files are skipped and listed in [`Self::skipped_files`].
    ///
    /// # Errors
    ///
    /// Returns `BibError::Read` when `dir` exists but cannot be listed.
    pub fn load(dir: &Path) -> Result<Self, BibError> {
        let mut index = Self::default();
        if !dir.is_dir() {
            return Ok(index);
        }

        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .map_err(|e| BibError::read(dir, e))?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        for path in paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let parsed = std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|text| serde_json::from_str::<Value>(&text).map_err(|e| e.to_string()));
            match parsed {
                Ok(value) => {
                    let before = index.len();
                    index.walk(&value, &name);
                    debug!(file = %name, snapshots = index.len() - before, "indexed evidence file");
                }
                Err(error) => {
                    warn!(file = %name, %error, "skipping unreadable evidence file");
                    index.skipped_files.push(name);
                }
            }
        }
        Ok(index)
    }

    /// Collect snapshots from nested arrays and wrapper objects
    /// (`{"results": [...]}`, `{"message": {"items": [...]}}`).
    fn walk(&mut self, value: &Value, source_file: &str) {
        match value {
            Value::Array(items) => {
                for item in items {
                    self.walk(item, source_file);
                }
            }
            Value::Object(obj) => {
                if let Some(snapshot) = EvidenceSnapshot::from_object(obj, source_file) {
                    self.insert(snapshot);
                } else {
                    for nested in obj.values() {
                        self.walk(nested, source_file);
                    }
                }
            }
            _ => {}
        }
    }

    fn insert(&mut self, snapshot: EvidenceSnapshot) {
        let idx = self.snapshots.len();
        if let Some(doi) = snapshot.normalized_doi() {
            self.by_doi.entry(doi).or_default().push(idx);
        }
        if let Some(title) = snapshot.normalized_title() {
            self.by_title.entry(title).or_default().push(idx);
        }
        self.snapshots.push(snapshot);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// The snapshot describing the same paper as `record`, if any.
    ///
    /// DOI first. Without a DOI, title plus year; without a year, title
    /// alone when exactly one snapshot carries it. A snapshot with a
    /// different DOI never matches.
    #[must_use]
    pub fn find(&self, record: &BibRecord) -> Option<&EvidenceSnapshot> {
        if let Some(doi) = record.doi().map(normalize_doi).filter(|d| !d.is_empty()) {
            let idx = *self.by_doi.get(&doi)?.first()?;
            return self.snapshots.get(idx);
        }

        let title = record.title().map(normalize_title).filter(|t| !t.is_empty())?;
        let candidates = self.by_title.get(&title)?;
        match record.year() {
            Some(year) => candidates
                .iter()
                .map(|idx| &self.snapshots[*idx])
                .find(|s| s.year.as_deref().map(str::trim) == Some(year)),
            None if candidates.len() == 1 => self.snapshots.get(candidates[0]),
            None => None,
        }
    }
}

/// Result of cleaning one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanOutcome {
    pub record: BibRecord,
    pub changed: bool,
    pub filled: Vec<BibField>,
    pub conflicts: Vec<EnrichmentConflict>,
    /// Evidence values that would not survive being written back.
    pub rejected: Vec<RejectedEvidence>,
}

/// Fill empty fields of `record` from its matching snapshot.
#[must_use]
pub fn clean(record: &BibRecord, index: &EvidenceIndex) -> CleanOutcome {
    let mut outcome = CleanOutcome {
        record: record.clone(),
        changed: false,
        filled: Vec::new(),
        conflicts: Vec::new(),
        rejected: Vec::new(),
    };
    let Some(snapshot) = index.find(record) else {
        return outcome;
    };

    for field in BibField::ALL {
        let Some(evidence) = snapshot.value(field).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        match record.get(field) {
            None => {
                if let Some(reason) = unsafe_value_reason(evidence.trim()) {
                    warn!(key = %record.key, %field, %reason, "evidence value not filled");
                    outcome.rejected.push(RejectedEvidence {
                        key: record.key.clone(),
                        field,
                        reason,
                        source: snapshot.source_file.clone(),
                    });
                    continue;
                }
                outcome.record.set(field, evidence.trim());
                outcome.filled.push(field);
            }
            Some(current) if normalize_field(field, current) != normalize_field(field, &evidence) => {
                warn!(key = %record.key, %field, kept = current, evidence = %evidence, "evidence disagrees with record");
                outcome.conflicts.push(EnrichmentConflict {
                    key: record.key.clone(),
                    field,
                    kept: current.to_string(),
                    discarded: evidence,
                    source: snapshot.source_file.clone(),
                });
            }
            Some(_) => {}
        }
    }

    outcome.changed = !outcome.filled.is_empty();
    outcome
}

/// Result of cleaning every record of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileCleanReport {
    pub changed: bool,
    pub records_changed: usize,
    pub fields_filled: usize,
    pub conflicts: Vec<EnrichmentConflict>,
    pub rejected: Vec<RejectedEvidence>,
    /// The cleaned text would have added violations, so the file was kept.
    pub refused: bool,
}

/// Clean every record of a bibliography file and rewrite it when anything was
/// filled.
///
/// A file with syntax violations is reported but never rewritten, since
/// rendering would drop the unparsed text. The rendered text is validated
/// again and discarded if it carries any violation the original did not.
///
/// # Errors
///
/// Returns `BibError::Read` or `BibError::Write` on I/O failure.
pub fn clean_file(path: &Path, index: &EvidenceIndex) -> Result<FileCleanReport, BibError> {
    let parsed = parse_file(path)?;
    let mut report = FileCleanReport::default();
    let mut records = Vec::with_capacity(parsed.records.len());

    for record in &parsed.records {
        let outcome = clean(record, index);
        if outcome.changed {
            report.records_changed += 1;
            report.fields_filled += outcome.filled.len();
        }
        report.conflicts.extend(outcome.conflicts);
        report.rejected.extend(outcome.rejected);
        records.push(outcome.record);
    }

    let has_syntax_errors = parsed.violations.iter().any(|v| v.rule == Rule::Syntax);
    if report.records_changed == 0 || has_syntax_errors {
        return Ok(report);
    }

    let rendered = render_bibliography(&records);
    let rules = ValidationRules::default();
    let before = validate_parsed(&parsed, &rules).violations;
    let introduced: Vec<Violation> = validate_parsed(&parse_str(&parsed.name, &rendered), &rules)
        .violations
        .into_iter()
        .filter(|v| {
            !before
                .iter()
                .any(|b| b.rule == v.rule && b.key == v.key && b.field == v.field)
        })
        .collect();
    if let Some(first) = introduced.first() {
        warn!(
            file = %path.display(),
            violations = introduced.len(),
            first = %first.message,
            "cleaned bibliography failed validation; file left unchanged"
        );
        report.refused = true;
        return Ok(report);
    }

    std::fs::write(path, rendered).map_err(|e| BibError::write(path, e))?;
    report.changed = true;
    debug!(file = %path.display(), records = report.records_changed, "rewrote cleaned bibliography");
    Ok(report)
}

/// A recognized field value the evidence index does not confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnverifiedField {
    pub key: String,
    pub field: BibField,
    pub value: String,
}

/// Fields a snapshot could fill, before cleaning runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillableField {
    pub key: String,
    pub field: BibField,
    pub value: String,
    pub source: String,
}

/// Evidence cross-check of one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verification {
    pub unverified: Vec<UnverifiedField>,
    pub fillable: Vec<FillableField>,
}

/// Compare a record's evidence-checked fields against its snapshot.
///
/// With no matching snapshot every populated checked field is unverified.
#[must_use]
pub fn verify(record: &BibRecord, index: &EvidenceIndex) -> Verification {
    let snapshot = index.find(record);
    let mut report = Verification::default();

    for field in BibField::EVIDENCE_CHECKED {
        let evidence = snapshot
            .and_then(|s| s.value(field))
            .filter(|v| !v.trim().is_empty());
        match (record.get(field), evidence) {
            (Some(value), Some(evidence))
                if normalize_field(field, value) == normalize_field(field, &evidence) => {}
            (Some(value), _) => report.unverified.push(UnverifiedField {
                key: record.key.clone(),
                field,
                value: value.to_string(),
            }),
            (None, Some(evidence)) => report.fillable.push(FillableField {
                key: record.key.clone(),
                field,
                value: evidence,
                source: snapshot.map(|s| s.source_file.clone()).unwrap_or_default(),
            }),
            (None, None) => {}
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn snapshot(title: &str, year: &str, doi: Option<&str>) -> EvidenceSnapshot {
        EvidenceSnapshot {
            source_file: "domain-1.json".into(),
            title: Some(title.into()),
            year: Some(year.into()),
            doi: doi.map(String::from),
            journal: Some("Journal Y".into()),
            volume: Some("12".into()),
            ..EvidenceSnapshot::default()
        }
    }

    #[test]
    fn fills_missing_fields_without_overwriting() {
        let index = EvidenceIndex::new(vec![snapshot("X", "2020", Some("10.1/abc"))]);
        let record = BibRecord::new("smith2020", "article")
            .with(BibField::Title, "X")
            .with(BibField::Volume, "12")
            .with(BibField::Doi, "https://doi.org/10.1/ABC");

        let outcome = clean(&record, &index);
        assert!(outcome.changed);
        assert_eq!(outcome.filled, vec![BibField::Journal, BibField::Year]);
        assert_eq!(outcome.record.get(BibField::Journal), Some("Journal Y"));
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn differing_year_keeps_record_value_and_warns() {
        let index = EvidenceIndex::new(vec![snapshot("X", "2020", Some("10.1/abc"))]);
        let record = BibRecord::new("smith2019", "article")
            .with(BibField::Title, "X")
            .with(BibField::Year, "2019")
            .with(BibField::Doi, "10.1/abc");

        let outcome = clean(&record, &index);
        assert_eq!(outcome.record.year(), Some("2019"));
        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.conflicts[0].field, BibField::Year);
        assert_eq!(outcome.conflicts[0].kept, "2019");
        assert_eq!(outcome.conflicts[0].discarded, "2020");
    }

    #[test]
    fn differing_doi_never_matches() {
        let index = EvidenceIndex::new(vec![snapshot("X", "2020", Some("10.9/other"))]);
        let record = BibRecord::new("a", "article")
            .with(BibField::Title, "X")
            .with(BibField::Year, "2020")
            .with(BibField::Doi, "10.1/abc");
        assert!(index.find(&record).is_none());
        assert!(!clean(&record, &index).changed);
    }

    #[test]
    fn title_only_match_requires_a_unique_snapshot() {
        let record = BibRecord::new("a", "article").with(BibField::Title, "Y: A study");

        let unique = EvidenceIndex::new(vec![snapshot("y a study", "2021", None)]);
        assert!(unique.find(&record).is_some());

        let ambiguous = EvidenceIndex::new(vec![
            snapshot("Y: a study", "2021", None),
            snapshot("Y - A Study", "2022", None),
        ]);
        assert!(ambiguous.find(&record).is_none());
    }

    #[test]
    fn title_and_year_match_when_record_has_no_doi() {
        let index = EvidenceIndex::new(vec![
            snapshot("X", "2019", None),
            snapshot("X", "2020", Some("10.1/abc")),
        ]);
        let record = BibRecord::new("a", "article")
            .with(BibField::Title, "X")
            .with(BibField::Year, "2020");
        assert_eq!(
            index.find(&record).and_then(|s| s.doi.as_deref()),
            Some("10.1/abc")
        );
    }

    #[test]
    fn load_walks_nested_json_and_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("openalex.json"),
            json!({
                "results": [
                    {"title": "X", "publication_year": 2020, "doi": "https://doi.org/10.1/abc",
                     "source": {"display_name": "Journal Y"}},
                    {"title": "Z", "publication_year": 2018}
                ]
            })
            .to_string(),
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let index = EvidenceIndex::load(dir.path()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.skipped_files, vec!["broken.json".to_string()]);
    }

    #[test]
    fn clean_file_rewrites_only_when_fields_were_filled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("literature-domain-1.bib");
        std::fs::write(&path, "@article{a, title = {X}, doi = {10.1/abc}}\n").unwrap();

        let index = EvidenceIndex::new(vec![snapshot("X", "2020", Some("10.1/abc"))]);
        let report = clean_file(&path, &index).unwrap();
        assert!(report.changed);
        assert_eq!(report.records_changed, 1);
        assert_eq!(report.fields_filled, 3);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("journal = {Journal Y}"));

        let again = clean_file(&path, &index).unwrap();
        assert!(!again.changed);
    }

    #[test]
    fn unbalanced_evidence_is_not_filled_and_file_stays_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("literature-domain-1.bib");
        let original = "@article{a, title = {X}, author = {Doe, Jane}, year = {2020}, \
                        doi = {10.1/abc}, note = {A careful longitudinal field study of trust in teams.}}\n\n\
                        @article{b, title = {Second paper}, author = {Roe, Ann}, year = {2021}, \
                        note = {A second careful study of coordination in teams.}}\n";
        std::fs::write(&path, original).unwrap();

        let mut evidence = snapshot("X", "2020", Some("10.1/abc"));
        evidence.abstract_text = Some("We model sets {a, b as partial orders.".into());
        let index = EvidenceIndex::new(vec![evidence]);

        let report = clean_file(&path, &index).unwrap();
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].field, BibField::Abstract);
        assert_eq!(report.rejected[0].reason, "has unbalanced braces");
        assert!(report.changed);
        assert!(!report.refused);

        let rules = ValidationRules::default();
        let after = crate::validator::validate_file(&path, &rules).unwrap();
        assert!(after.valid, "{:?}", after.violations);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("partial orders"));
        assert!(text.contains("@article{b,"));
    }

    #[test]
    fn invalid_fill_leaves_the_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("literature-domain-1.bib");
        let original = "@article{a, title = {X}, author = {Doe, Jane}, year = {2020}, \
                        note = {A careful longitudinal field study of trust in teams.}}\n";
        std::fs::write(&path, original).unwrap();

        let index = EvidenceIndex::new(vec![snapshot("X", "2020", Some("not a doi"))]);
        let report = clean_file(&path, &index).unwrap();
        assert!(report.refused);
        assert!(!report.changed);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn missing_directory_is_an_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let index = EvidenceIndex::load(&dir.path().join("json")).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn verify_reports_unverified_and_fillable_fields() {
        let index = EvidenceIndex::new(vec![snapshot("X", "2020", Some("10.1/abc"))]);
        let record = BibRecord::new("a", "article")
            .with(BibField::Title, "X")
            .with(BibField::Year, "2020")
            .with(BibField::Doi, "10.1/abc")
            .with(BibField::Pages, "10--20");

        let report = verify(&record, &index);
        assert_eq!(
            report.unverified.iter().map(|u| u.field).collect::<Vec<_>>(),
            vec![BibField::Pages]
        );
        assert_eq!(
            report.fillable.iter().map(|f| f.field).collect::<Vec<_>>(),
            vec![BibField::Journal, BibField::Volume]
        );
    }
}
