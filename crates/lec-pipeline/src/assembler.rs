//! Final document assembly.
//!
//! Pure text transforms: section drafts and the merged bibliography go in,
//! the final review, its body, and the evidence table come out. The
//! orchestrator does all reading and writing.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use lec_core::identity::{normalize_doi, normalize_title};
use lec_core::merge::MergedBibliography;
use lec_core::record::{BibField, BibRecord};
use regex::Regex;

static AT_CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9_])@([A-Za-z0-9_][A-Za-z0-9_:.\-]*)").expect("valid citation regex")
});

static LATEX_CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\[A-Za-z]*cite[A-Za-z]*\*?(?:\[[^\]]*\])*\{([^}]*)\}")
        .expect("valid latex citation regex")
});

static SECTION_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:section\s+\d{1,2}\s*:?|\d{1,2}\.)\s*(.*)$")
        .expect("valid section prefix regex")
});

static SUBSECTION_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:subsection\s+)?\d{1,2}\.\d{1,2}\.?\s*:?\s*(.*)$")
        .expect("valid subsection prefix regex")
});

static EM_DASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\x{2014}\s*").expect("valid em dash regex"));

const INTRO_HEADINGS: [&str; 4] = ["introduction", "preamble", "overview", "background"];
const CONCLUSION_HEADINGS: [&str; 5] = [
    "conclusion",
    "summary",
    "closing remarks",
    "final remarks",
    "concluding remarks",
];
const REFERENCE_HEADINGS: [&str; 4] = [
    "references",
    "bibliography",
    "reference list",
    "works cited",
];

const EVIDENCE_TABLE_ROWS: usize = 30;
const EVIDENCE_SUMMARY_CHARS: usize = 220;
const MAX_HEADING_LEVEL: usize = 6;

/// One section draft, in outline order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionText {
    /// File name, used in warnings.
    pub source: String,
    /// Outline heading, used when the draft has no heading of its own.
    pub heading: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledReview {
    /// Frontmatter, title, sections, and references.
    pub document: String,
    /// Title and sections only.
    pub body: String,
    /// Cited records in reference-list order.
    pub cited: Vec<BibRecord>,
    pub sections: Vec<String>,
    pub warnings: Vec<String>,
}

#[must_use]
pub fn assemble(
    sections: &[SectionText],
    merged: &MergedBibliography,
    title: &str,
    date: NaiveDate,
) -> AssembledReview {
    let mut warnings = Vec::new();
    let mut parts = vec![format!("# {title}")];
    let mut included = Vec::new();

    for section in sections {
        let stripped = setext_to_atx(strip_frontmatter(&section.content));
        let without_refs = drop_reference_sections(&stripped);
        let rewritten = rewrite_headings(&without_refs, &section.heading);
        let text = rewritten.trim();
        if text.lines().all(|line| heading_level(line).is_some() || line.trim().is_empty()) {
            warnings.push(format!("section {} has no body text", section.source));
        }
        parts.push(text.to_string());
        included.push(section.source.clone());
    }
    let body = number_headings(&parts.join("\n\n")) + "\n";

    let mut resolved = HashSet::new();
    let mut cited: Vec<BibRecord> = Vec::new();
    for key in extract_citations(&body) {
        match merged.resolve(&key) {
            Some(entry) => {
                if resolved.insert(entry.key().to_string()) {
                    cited.push(entry.record.clone());
                }
            }
            None => warnings.push(format!("unresolved citation '{key}'")),
        }
    }
    cited.sort_by_cached_key(reference_sort_key);

    let mut document = frontmatter(title, date);
    document.push_str(&body);
    document.push('\n');
    document.push_str(&render_references(&cited));

    AssembledReview {
        document,
        body,
        cited,
        sections: included,
        warnings,
    }
}

fn frontmatter(title: &str, date: NaiveDate) -> String {
    let escaped = title.replace('\\', "\\\\").replace('"', "\\\"");
    format!("---\ntitle: \"{escaped}\"\ndate: {}\n---\n\n", date.format("%Y-%m-%d"))
}

/// Content after a leading `---` frontmatter block. Unterminated blocks are
/// left alone.
#[must_use]
pub fn strip_frontmatter(content: &str) -> &str {
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return content;
    };
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        offset += line.len();
        if matches!(line.trim_end(), "---" | "...") {
            return rest[offset..].trim_start_matches(['\n', '\r']);
        }
    }
    content
}

/// ATX heading level (1 to 6) of a line, `None` for non-headings.
fn heading_level(line: &str) -> Option<usize> {
    let level = line.bytes().take_while(|b| *b == b'#').count();
    if level == 0 || level > MAX_HEADING_LEVEL {
        return None;
    }
    match line[level..].chars().next() {
        None | Some(' ' | '\t') => Some(level),
        _ => None,
    }
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

fn heading_text(line: &str, level: usize) -> String {
    line[level..]
        .trim()
        .trim_end_matches('#')
        .trim()
        .trim_end_matches(':')
        .to_lowercase()
}

/// Rewrite Setext headings (`Title` underlined by `===` or `---`) as ATX
/// level 1 and 2 headings. Fenced code is untouched.
#[must_use]
pub fn setext_to_atx(content: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_fence = false;
    // Whether the last pushed line is paragraph text a Setext underline may
    // promote.
    let mut promotable = false;

    for line in content.lines() {
        if is_fence(line) {
            in_fence = !in_fence;
            out.push(line.to_string());
            promotable = false;
            continue;
        }
        if in_fence {
            out.push(line.to_string());
            continue;
        }
        let underline = line.trim();
        let level = if !underline.is_empty() && underline.chars().all(|c| c == '=') {
            Some(1)
        } else if !underline.is_empty() && underline.chars().all(|c| c == '-') {
            Some(2)
        } else {
            None
        };
        if let (Some(level), true) = (level, promotable)
            && let Some(text) = out.pop()
        {
            out.push(format!("{} {}", "#".repeat(level), text.trim()));
            promotable = false;
            continue;
        }
        promotable = level.is_none() && is_paragraph_text(line);
        out.push(line.to_string());
    }
    out.join("\n")
}

fn is_paragraph_text(line: &str) -> bool {
    let trimmed = line.trim_start();
    !trimmed.is_empty()
        && heading_level(line).is_none()
        && !["- ", "* ", "+ ", ">", "|"].iter().any(|m| trimmed.starts_with(m))
}

/// Remove `References` / `Bibliography` sections, up to the next heading of
/// the same or a shallower level.
#[must_use]
pub fn drop_reference_sections(content: &str) -> String {
    let mut out = Vec::new();
    let mut in_fence = false;
    let mut dropping: Option<usize> = None;

    for line in content.lines() {
        if !in_fence && let Some(level) = heading_level(line) {
            if dropping.is_some_and(|d| level <= d) {
                dropping = None;
            }
            if dropping.is_none()
                && REFERENCE_HEADINGS.contains(&heading_text(line, level).as_str())
            {
                dropping = Some(level);
            }
        }
        if is_fence(line) {
            in_fence = !in_fence;
        }
        if dropping.is_none() {
            out.push(line);
        }
    }
    out.join("\n")
}

/// Shift headings so the shallowest becomes `##`, keeping relative nesting and
/// clamping at `######`. Headings inside code fences are untouched. A draft
/// with no heading gets `## <fallback>`.
#[must_use]
pub fn rewrite_headings(content: &str, fallback: &str) -> String {
    let mut in_fence = false;
    let mut min_level: Option<usize> = None;
    for line in content.lines() {
        if is_fence(line) {
            in_fence = !in_fence;
        } else if !in_fence && let Some(level) = heading_level(line) {
            min_level = Some(min_level.map_or(level, |m| m.min(level)));
        }
    }

    let Some(min_level) = min_level else {
        return format!("## {fallback}\n\n{}", content.trim());
    };

    let mut out = Vec::new();
    in_fence = false;
    for line in content.lines() {
        if is_fence(line) {
            in_fence = !in_fence;
            out.push(line.to_string());
            continue;
        }
        match heading_level(line) {
            Some(level) if !in_fence => {
                let target = (level - min_level + 2).min(MAX_HEADING_LEVEL);
                out.push(format!("{} {}", "#".repeat(target), line[level..].trim()));
            }
            _ => out.push(line.to_string()),
        }
    }
    out.join("\n")
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Intro,
    Body,
    Conclusion,
    Excluded,
}

fn clean_heading_title(raw: &str, prefix: &Regex) -> String {
    let title = raw.trim();
    let title = prefix
        .captures(title)
        .and_then(|caps| caps.get(1))
        .map_or(title, |m| m.as_str().trim());
    EM_DASH.replace_all(title, ": ").into_owned()
}

/// Number the `##` sections of an assembled body as `## Section N: Title`
/// and their `###` subsections as `### N.M Title`.
///
/// Existing `Section N:` and `N.M` prefixes are replaced and em dashes
/// become `: `. A first section titled like an introduction and a last one
/// titled like a conclusion stay unnumbered, as do their subsections.
/// Reference headings and fenced code are left alone.
#[must_use]
pub fn number_headings(content: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let mut in_fence = false;
    let mut headings: Vec<(usize, usize)> = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if is_fence(line) {
            in_fence = !in_fence;
        } else if !in_fence && let Some(level @ (2 | 3)) = heading_level(line) {
            headings.push((idx, level));
        }
    }

    let sections: Vec<usize> = headings
        .iter()
        .filter(|(_, level)| *level == 2)
        .map(|(idx, _)| *idx)
        .collect();
    let Some(&last_section) = sections.last() else {
        return content.to_string();
    };

    let mut out: Vec<String> = lines.iter().map(|line| (*line).to_string()).collect();
    let mut kind = SectionKind::Excluded;
    let mut section_no = 0;
    let mut subsection_no = 0;
    for (idx, level) in headings {
        let raw = &lines[idx][level..];
        if level == 2 {
            let title = clean_heading_title(raw, &SECTION_PREFIX);
            let lower = title.to_lowercase();
            kind = if REFERENCE_HEADINGS.contains(&lower.as_str()) {
                SectionKind::Excluded
            } else if idx == sections[0] && INTRO_HEADINGS.contains(&lower.as_str()) {
                SectionKind::Intro
            } else if idx == last_section && CONCLUSION_HEADINGS.contains(&lower.as_str()) {
                SectionKind::Conclusion
            } else {
                SectionKind::Body
            };
            out[idx] = match kind {
                SectionKind::Excluded => continue,
                SectionKind::Body => {
                    section_no += 1;
                    subsection_no = 0;
                    if title.is_empty() {
                        format!("## Section {section_no}")
                    } else {
                        format!("## Section {section_no}: {title}")
                    }
                }
                SectionKind::Intro | SectionKind::Conclusion => format!("## {title}"),
            };
        } else {
            let title = clean_heading_title(raw, &SUBSECTION_PREFIX);
            out[idx] = match kind {
                SectionKind::Excluded => continue,
                SectionKind::Body => {
                    subsection_no += 1;
                    format!("### {section_no}.{subsection_no} {title}").trim_end().to_string()
                }
                SectionKind::Intro | SectionKind::Conclusion => format!("### {title}"),
            };
        }
    }
    out.join("\n")
}

/// Cited keys in first-appearance order: `[@key]`, `@key`, and
/// `\cite{a,b}` forms. An `@` preceded by a letter or digit (an email
/// address) is not a citation.
#[must_use]
pub fn extract_citations(text: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = Vec::new();
    for caps in AT_CITATION.captures_iter(text) {
        let Some(m) = caps.get(1) else { continue };
        let key = m.as_str().trim_end_matches(['.', ':', '-']);
        if !key.is_empty() {
            found.push((m.start(), key.to_string()));
        }
    }
    for caps in LATEX_CITATION.captures_iter(text) {
        let Some(m) = caps.get(1) else { continue };
        for key in m.as_str().split(',').map(str::trim).filter(|k| !k.is_empty()) {
            found.push((m.start(), key.to_string()));
        }
    }
    found.sort_by_key(|(pos, _)| *pos);

    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter_map(|(_, key)| seen.insert(key.clone()).then_some(key))
        .collect()
}

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

fn reference_sort_key(record: &BibRecord) -> (String, String, String) {
    (
        record
            .first_author_surname()
            .map(|s| strip_braces(s).to_lowercase())
            .unwrap_or_default(),
        record.year().unwrap_or_default().to_string(),
        normalize_title(record.title().unwrap_or_default()),
    )
}

fn strip_braces(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '{' | '}'))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_author(author: &str) -> String {
    let author = strip_braces(author);
    if author.eq_ignore_ascii_case("others") {
        return "et al.".to_string();
    }
    let (last, given): (String, Vec<&str>) = match author.split_once(',') {
        Some((last, rest)) => (last.trim().to_string(), rest.split_whitespace().collect()),
        None => {
            let mut parts: Vec<&str> = author.split_whitespace().collect();
            let Some(last) = parts.pop() else {
                return "Unknown".to_string();
            };
            (last.to_string(), parts)
        }
    };
    let initials: Vec<String> = given
        .iter()
        .filter_map(|part| part.chars().next().filter(|c| c.is_alphabetic()))
        .map(|c| format!("{c}."))
        .collect();
    if initials.is_empty() {
        last
    } else {
        format!("{last}, {}", initials.join(" "))
    }
}

fn format_authors(record: &BibRecord) -> String {
    let names: Vec<String> = record.authors().into_iter().map(format_author).collect();
    match names.as_slice() {
        [] => "Unknown".to_string(),
        [only] => only.clone(),
        [init @ .., last] => format!("{}, & {last}", init.join(", ")),
    }
}

/// One APA-style reference line.
#[must_use]
pub fn format_reference(record: &BibRecord) -> String {
    let authors = format_authors(record);
    let year = record.year().unwrap_or("n.d.");
    let title = strip_braces(record.title().unwrap_or_default());
    let title = title.trim_end_matches('.');

    let mut line = format!("{authors} ({year}). {title}.");

    let venue = record
        .venue()
        .or_else(|| record.get(BibField::Publisher))
        .map(strip_braces);
    if let Some(venue) = venue {
        let mut part = venue;
        if let Some(volume) = record.get(BibField::Volume) {
            part.push_str(&format!(", {}", strip_braces(volume)));
        }
        if let Some(number) = record.get(BibField::Number) {
            part.push_str(&format!("({})", strip_braces(number)));
        }
        if let Some(pages) = record.get(BibField::Pages) {
            part.push_str(&format!(", {}", strip_braces(pages).replace("--", "\u{2013}")));
        }
        line.push(' ');
        line.push_str(&part);
        line.push('.');
    }

    if let Some(doi) = record.doi() {
        line.push_str(&format!(" https://doi.org/{}", normalize_doi(doi)));
    } else if let Some(url) = record.get(BibField::Url) {
        line.push(' ');
        line.push_str(url);
    }
    line
}

/// The `## References` block for records already in reference order.
#[must_use]
pub fn render_references(records: &[BibRecord]) -> String {
    let mut out = String::from("## References\n\n");
    if records.is_empty() {
        out.push_str("_No references cited._\n");
        return out;
    }
    let lines: Vec<String> = records.iter().map(format_reference).collect();
    out.push_str(&lines.join("\n\n"));
    out.push('\n');
    out
}

// ---------------------------------------------------------------------------
// Evidence table
// ---------------------------------------------------------------------------

fn table_cell(value: &str) -> String {
    strip_braces(value).replace('|', "\\|")
}

/// `evidence_table.md`: the first merged records with a short summary each.
#[must_use]
pub fn render_evidence_table<'a>(records: impl IntoIterator<Item = &'a BibRecord>) -> String {
    let mut rows = vec![
        "| # | Year | Paper | Evidence Summary |".to_string(),
        "|---|---:|---|---|".to_string(),
    ];
    for (idx, record) in records.into_iter().take(EVIDENCE_TABLE_ROWS).enumerate() {
        let summary = record
            .get(BibField::Abstract)
            .or_else(|| record.get(BibField::Note))
            .unwrap_or("No abstract available.");
        let summary = strip_braces(summary);
        let summary = if summary.chars().count() > EVIDENCE_SUMMARY_CHARS {
            let cut: String = summary.chars().take(EVIDENCE_SUMMARY_CHARS).collect();
            format!("{cut}...")
        } else {
            summary
        };
        rows.push(format!(
            "| {} | {} | {} | {} |",
            idx + 1,
            record.year().unwrap_or("-"),
            table_cell(record.title().unwrap_or("Untitled")),
            summary.replace('|', "\\|"),
        ));
    }
    rows.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use lec_core::identity::DurableIdentity;
    use lec_core::merge::MergedEntry;
    use pretty_assertions::assert_eq;

    fn record(key: &str, author: &str, year: &str, title: &str) -> BibRecord {
        BibRecord::new(key, "article")
            .with(BibField::Author, author)
            .with(BibField::Year, year)
            .with(BibField::Title, title)
    }

    fn merged(records: Vec<BibRecord>) -> MergedBibliography {
        MergedBibliography {
            records_in: records.len(),
            entries: records
                .into_iter()
                .map(|record| MergedEntry {
                    identity: DurableIdentity::of(&record).unwrap(),
                    sources: vec!["literature-domain-1.bib".into()],
                    merged_keys: vec![record.key.clone()],
                    warnings: Vec::new(),
                    record,
                })
                .collect(),
            ..MergedBibliography::default()
        }
    }

    #[test]
    fn frontmatter_is_stripped_only_when_closed() {
        assert_eq!(strip_frontmatter("---\nsection: 1\n---\n\nBody"), "Body");
        assert_eq!(strip_frontmatter("---\nnever closed"), "---\nnever closed");
        assert_eq!(strip_frontmatter("No frontmatter"), "No frontmatter");
    }

    #[test]
    fn headings_shift_to_level_two_and_keep_nesting() {
        let draft = "### Trust\nText\n#### Detail\n```\n# not a heading\n```\n##### Deep";
        assert_eq!(
            rewrite_headings(draft, "Ignored"),
            "## Trust\nText\n### Detail\n```\n# not a heading\n```\n#### Deep"
        );
    }

    #[test]
    fn headings_clamp_at_six() {
        let draft = "# Top\n###### Very deep";
        assert_eq!(rewrite_headings(draft, "x"), "## Top\n###### Very deep");
    }

    #[test]
    fn headingless_section_gets_outline_heading() {
        assert_eq!(
            rewrite_headings("Plain text.\n", "Trust in teams"),
            "## Trust in teams\n\nPlain text."
        );
    }

    #[test]
    fn sections_and_subsections_are_numbered() {
        let body = "# Review\n\n## Introduction\n### Scope\n\n## 2. Trust \u{2014} antecedents\n\
                    ### 2.1: Ability\n### Benevolence\n```\n## not a heading\n```\n\n\
                    ## Section 7: Outcomes\n### Subsection 3.4 Performance\n\n\
                    ## Conclusion\nDone.";
        assert_eq!(
            number_headings(body),
            "# Review\n\n## Introduction\n### Scope\n\n## Section 1: Trust: antecedents\n\
             ### 1.1 Ability\n### 1.2 Benevolence\n```\n## not a heading\n```\n\n\
             ## Section 2: Outcomes\n### 2.1 Performance\n\n\
             ## Conclusion\nDone."
        );
    }

    #[test]
    fn intro_title_is_numbered_when_not_first() {
        let body = "## Findings\n\n## Background\n\n## Summary";
        assert_eq!(
            number_headings(body),
            "## Section 1: Findings\n\n## Section 2: Background\n\n## Summary"
        );
    }

    #[test]
    fn bare_section_labels_keep_their_number_only() {
        assert_eq!(
            number_headings("## Section 4\nText\n## Section 9\nMore"),
            "## Section 1\nText\n## Section 2\nMore"
        );
    }

    #[test]
    fn setext_headings_become_atx() {
        let draft = "Trust\n=====\nBody text.\nAntecedents\n-----------\n- item\n---\n```\ncode\n===\n```";
        assert_eq!(
            setext_to_atx(draft),
            "# Trust\nBody text.\n## Antecedents\n- item\n---\n```\ncode\n===\n```"
        );
    }

    #[test]
    fn setext_title_does_not_add_a_second_top_level_heading() {
        let sections = vec![SectionText {
            source: "synthesis-section-1.md".into(),
            heading: "Findings".into(),
            content: "Findings\n========\n\nTrust grows.\n\nDetail\n------\n\nMore.\n".into(),
        }];
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let review = assemble(&sections, &merged(Vec::new()), "Review", date);
        assert_eq!(review.document.matches("\n# ").count(), 1);
        assert!(review.body.contains("## Section 1: Findings\n\nTrust grows.\n\n### 1.1 Detail\n"));
    }

    #[test]
    fn reference_sections_are_dropped() {
        let draft = "## Findings\nA\n## References\n- Smith 2020\n### Extra\nB\n## Next\nC";
        assert_eq!(drop_reference_sections(draft), "## Findings\nA\n## Next\nC");
    }

    #[test]
    fn citations_in_all_forms() {
        let text = "As shown [@smith2020; @lee2021], and @jones2018. \
                    Contact me@example.com. See \\citep[p. 4]{park2019, smith2020}.";
        assert_eq!(
            extract_citations(text),
            vec!["smith2020", "lee2021", "jones2018", "park2019"]
        );
    }

    #[test]
    fn apa_reference_line() {
        let rec = record("k", "Smith, John Adam and Jane Doe and others", "2020", "Trust at work.")
            .with(BibField::Journal, "Journal of {Management}")
            .with(BibField::Volume, "12")
            .with(BibField::Number, "3")
            .with(BibField::Pages, "1--20")
            .with(BibField::Doi, "https://doi.org/10.1/ABC");
        assert_eq!(
            format_reference(&rec),
            "Smith, J. A., Doe, J., & et al. (2020). Trust at work. \
             Journal of Management, 12(3), 1\u{2013}20. https://doi.org/10.1/abc"
        );
    }

    #[test]
    fn reference_without_year_or_venue() {
        let rec = BibRecord::new("k", "misc")
            .with(BibField::Author, "Lee, Kim")
            .with(BibField::Title, "Working paper")
            .with(BibField::Url, "https://example.org/wp");
        assert_eq!(
            format_reference(&rec),
            "Lee, K. (n.d.). Working paper. https://example.org/wp"
        );
    }

    #[test]
    fn assemble_builds_document_with_sorted_cited_references() {
        let bib = merged(vec![
            record("zhu2019", "Zhu, A", "2019", "Later alphabetically"),
            record("adams2021", "Adams, B", "2021", "Earlier alphabetically"),
            record("unused2000", "Unused, C", "2000", "Never cited"),
        ]);
        let sections = vec![
            SectionText {
                source: "synthesis-section-1.md".into(),
                heading: "Introduction".into(),
                content: "---\nsection: 1\n---\n# Introduction\nSee [@zhu2019].\n".into(),
            },
            SectionText {
                source: "synthesis-section-2.md".into(),
                heading: "Evidence".into(),
                content: "Adams found it [@adams2021].\n\n## References\n- old list\n".into(),
            },
        ];
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();

        let review = assemble(&sections, &bib, "Literature Review: Trust", date);

        assert!(review.document.starts_with(
            "---\ntitle: \"Literature Review: Trust\"\ndate: 2026-01-02\n---\n\n# Literature Review: Trust\n\n## Introduction\n"
        ));
        assert!(review.body.contains("## Section 1: Evidence\n\nAdams found it [@adams2021]."));
        assert!(!review.body.contains("old list"));
        assert_eq!(review.document.matches("\n# ").count(), 1);

        let keys: Vec<&str> = review.cited.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["adams2021", "zhu2019"]);
        assert!(review.document.ends_with(
            "## References\n\nAdams, B. (2021). Earlier alphabetically.\n\nZhu, A. (2019). Later alphabetically.\n"
        ));
        assert!(!review.document.contains("Never cited"));
        assert!(review.warnings.is_empty());
    }

    #[test]
    fn citations_of_folded_keys_resolve_to_the_surviving_entry() {
        let sparse = lec_bib::parse_str(
            "literature-domain-1.bib",
            "@article{smith2020, title = {Trust at Work}, author = {Smith, J}, \
             year = {2020}, doi = {10.1/abc}}",
        );
        let rich = lec_bib::parse_str(
            "literature-domain-2.bib",
            "@article{s2020, title = {Trust at Work}, author = {Smith, J}, \
             year = {2020}, doi = {10.1/abc}, journal = {Team Science}}",
        );
        let bib = lec_bib::dedupe(&[sparse, rich]);
        assert_eq!(bib.entries[0].key(), "s2020");

        let sections = vec![SectionText {
            source: "synthesis-section-1.md".into(),
            heading: "Findings".into(),
            content: "Trust builds slowly [@smith2020; @s2020]. See also [@ghost2001].".into(),
        }];
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let review = assemble(&sections, &bib, "Review", date);

        let keys: Vec<&str> = review.cited.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["s2020"]);
        assert!(review.document.contains("Smith, J. (2020). Trust at Work. Team Science."));
        assert_eq!(review.warnings, vec!["unresolved citation 'ghost2001'".to_string()]);
    }

    #[test]
    fn evidence_table_truncates_and_escapes() {
        let long = "x".repeat(300);
        let rows = vec![
            record("a", "A, B", "2020", "Pipes | in title").with(BibField::Abstract, long),
            BibRecord::new("b", "misc")
                .with(BibField::Title, "No year")
                .with(BibField::Note, "Short note | with pipe."),
        ];
        let table = render_evidence_table(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "| # | Year | Paper | Evidence Summary |");
        assert!(lines[2].starts_with("| 1 | 2020 | Pipes \\| in title | xxx"));
        assert!(lines[2].ends_with(&format!("{}... |", "x".repeat(10))));
        assert_eq!(lines[3], "| 2 | - | No year | Short note \\| with pipe. |");
    }

    #[test]
    fn evidence_table_caps_rows() {
        let rows: Vec<BibRecord> = (0..40)
            .map(|i| record(&format!("k{i}"), "A, B", "2020", &format!("Paper {i}")))
            .collect();
        assert_eq!(render_evidence_table(&rows).lines().count(), 2 + 30);
    }
}
