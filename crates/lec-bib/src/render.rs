//! Render records back to BibTeX.

use std::fmt::Write as _;

use lec_core::record::{BibField, BibRecord};

/// Render one record with recognized fields in canonical order, then extra
/// fields alphabetically.
#[must_use]
pub fn render_record(record: &BibRecord) -> String {
    let mut out = format!("@{}{{{},\n", record.entry_type, record.key);
    for field in BibField::ALL {
        if let Some(value) = record.get(field) {
            let _ = writeln!(out, "  {} = {{{value}}},", field.as_str());
        }
    }
    for (name, value) in &record.extra {
        let value = value.trim();
        if !value.is_empty() {
            let _ = writeln!(out, "  {name} = {{{value}}},");
        }
    }
    out.push('}');
    out
}

/// Render records separated by blank lines, with a trailing newline.
#[must_use]
pub fn render_bibliography<'a>(records: impl IntoIterator<Item = &'a BibRecord>) -> String {
    let chunks: Vec<String> = records.into_iter().map(render_record).collect();
    if chunks.is_empty() {
        return String::new();
    }
    let mut out = chunks.join("\n\n");
    out.push('\n');
    out
}
