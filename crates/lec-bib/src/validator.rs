//! Structural record validation.
//!
//! Every rule is checked independently and reported; nothing here repairs a
//! record. File-level checks add the parser's own violations and the
//! file-local `duplicate_key` rule.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use lec_config::ValidationConfig;
use lec_core::enums::Rule;
use lec_core::identity::{normalize_doi, normalize_text};
use lec_core::record::{BibField, BibRecord};
use lec_core::validation::{ValidationResult, Violation};
use regex::Regex;

use crate::error::BibError;
use crate::parser::{ParsedBibFile, parse_file};

static DOI_SYNTAX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^10\.\d+(\.\d+)*/\S+$").expect("valid DOI regex"));

static LATEX_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\\["'`^~][A-Za-z]|\\c\{[A-Za-z]\}|\\ss\b"#).expect("valid escape regex")
});

/// Thresholds for the `annotation` rule.
#[derive(Debug, Clone)]
pub struct ValidationRules {
    pub min_annotation_chars: usize,
    /// Placeholder phrases, already whitespace-normalized and lowercased.
    pub placeholders: Vec<String>,
    pub require_annotation: bool,
}

impl From<&ValidationConfig> for ValidationRules {
    fn from(config: &ValidationConfig) -> Self {
        Self {
            min_annotation_chars: config.min_annotation_chars,
            placeholders: config
                .placeholder_annotations
                .iter()
                .map(|p| normalize_text(p))
                .collect(),
            require_annotation: config.require_annotation,
        }
    }
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self::from(&ValidationConfig::default())
    }
}

/// Check one record against the record-level rules.
#[must_use]
pub fn validate(record: &BibRecord, rules: &ValidationRules) -> ValidationResult {
    let mut violations = Vec::new();
    check_required(record, &mut violations);
    check_doi(record, &mut violations);
    check_encoding(record, &mut violations);
    if rules.require_annotation {
        check_annotation(record, rules, &mut violations);
    }
    ValidationResult::from_violations(violations)
}

/// Check every record of a parsed file plus the file-local rules.
#[must_use]
pub fn validate_parsed(parsed: &ParsedBibFile, rules: &ValidationRules) -> ValidationResult {
    let mut result = ValidationResult::from_violations(parsed.violations.clone());

    if parsed.records.is_empty() && result.violations.is_empty() {
        result.push(Violation::new(
            Rule::Syntax,
            "",
            None,
            format!("{} contains no bibliography entries", parsed.name),
        ));
    }

    let mut seen = HashSet::new();
    for record in &parsed.records {
        if !seen.insert(record.key.as_str()) {
            result.push(Violation::new(
                Rule::DuplicateKey,
                &record.key,
                None,
                format!("citation key '{}' is used more than once", record.key),
            ));
        }
        for violation in validate(record, rules).violations {
            result.push(violation);
        }
    }

    result
}

/// Parse and validate a bibliography file.
///
/// # Errors
///
/// Returns `BibError::Read` when the file cannot be read.
pub fn validate_file(path: &Path, rules: &ValidationRules) -> Result<ValidationResult, BibError> {
    let parsed = parse_file(path)?;
    Ok(validate_parsed(&parsed, rules))
}

/// Why `value` cannot be written inside a `{...}` field, if anything.
///
/// Covers the `encoding` rule plus brace balance, which decides where the
/// field ends when the file is parsed again.
#[must_use]
pub fn unsafe_value_reason(value: &str) -> Option<String> {
    if value.contains('\u{FFFD}') {
        return Some("contains bytes that are not valid UTF-8".into());
    }
    if value.chars().any(|c| c.is_control() && !c.is_whitespace()) {
        return Some("contains control characters".into());
    }
    if let Some(m) = LATEX_ESCAPE.find(value) {
        return Some(format!("uses LaTeX escape '{}'", m.as_str()));
    }
    let mut depth = 0usize;
    for ch in value.chars() {
        match ch {
            '{' => depth += 1,
            '}' if depth == 0 => return Some("has unbalanced braces".into()),
            '}' => depth -= 1,
            _ => {}
        }
    }
    (depth > 0).then(|| "has unbalanced braces".into())
}

/// A record missing both title and author can be neither deduplicated nor
/// cited.
#[must_use]
pub fn is_fatal(record: &BibRecord) -> bool {
    let mut violations = Vec::new();
    check_required(record, &mut violations);
    ValidationResult::from_violations(violations).is_fatal()
}

fn check_required(record: &BibRecord, out: &mut Vec<Violation>) {
    for field in [BibField::Title, BibField::Author] {
        if !record.is_populated(field) {
            out.push(Violation::for_field(
                Rule::RequiredField,
                &record.key,
                field,
                format!("missing required field '{field}'"),
            ));
        }
    }
}

/// Whether a DOI (with or without resolver prefix) is well formed.
#[must_use]
pub fn is_valid_doi(value: &str) -> bool {
    DOI_SYNTAX.is_match(&normalize_doi(value))
}

fn check_doi(record: &BibRecord, out: &mut Vec<Violation>) {
    if let Some(doi) = record.doi()
        && !is_valid_doi(doi)
    {
        out.push(Violation::for_field(
            Rule::DoiSyntax,
            &record.key,
            BibField::Doi,
            format!("malformed DOI '{doi}'"),
        ));
    }
}

fn check_encoding(record: &BibRecord, out: &mut Vec<Violation>) {
    let known = record.fields.iter().map(|(f, v)| (f.as_str(), v.as_str()));
    let extra = record.extra.iter().map(|(n, v)| (n.as_str(), v.as_str()));
    for (name, value) in known.chain(extra) {
        if value.contains('\u{FFFD}') {
            out.push(Violation::new(
                Rule::Encoding,
                &record.key,
                Some(name),
                format!("field '{name}' contains bytes that are not valid UTF-8"),
            ));
        } else if value.chars().any(|c| c.is_control() && !c.is_whitespace()) {
            out.push(Violation::new(
                Rule::Encoding,
                &record.key,
                Some(name),
                format!("field '{name}' contains control characters"),
            ));
        } else if let Some(m) = LATEX_ESCAPE.find(value) {
            out.push(Violation::new(
                Rule::Encoding,
                &record.key,
                Some(name),
                format!(
                    "field '{name}' uses LaTeX escape '{}'; write UTF-8 characters directly",
                    m.as_str()
                ),
            ));
        }
    }
}

fn check_annotation(record: &BibRecord, rules: &ValidationRules, out: &mut Vec<Violation>) {
    let Some(note) = record.get(BibField::Note) else {
        out.push(Violation::for_field(
            Rule::Annotation,
            &record.key,
            BibField::Note,
            "missing annotation",
        ));
        return;
    };

    let normalized = normalize_text(note);
    let message = if rules.placeholders.iter().any(|p| *p == normalized) {
        format!("annotation '{note}' is a placeholder")
    } else if note.chars().count() < rules.min_annotation_chars {
        format!(
            "annotation is {} characters; at least {} required",
            note.chars().count(),
            rules.min_annotation_chars
        )
    } else {
        return;
    };
    out.push(Violation::for_field(
        Rule::Annotation,
        &record.key,
        BibField::Note,
        message,
    ));
}
