//! BibTeX-style bibliography parser.
//!
//! Entries are split by brace depth rather than by line, so multi-line and
//! nested-brace values survive. `@comment`, `@string`, and `@preamble` blocks
//! are skipped. Parsing never fails outright: malformed input becomes
//! `syntax` violations on the returned [`ParsedBibFile`] so the gate can
//! report them alongside record-level problems.

use std::borrow::Cow;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use lec_core::enums::Rule;
use lec_core::record::{BibField, BibRecord, Provenance};
use lec_core::validation::Violation;
use regex::Regex;

use crate::error::BibError;

static DOMAIN_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"domain-(\d+)\.bib$").expect("valid domain file regex"));

const SKIPPED_TYPES: [&str; 3] = ["comment", "string", "preamble"];

/// Records and parse-level violations of one bibliography file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedBibFile {
    /// File name, used as the provenance source.
    pub name: String,
    pub records: Vec<BibRecord>,
    /// `syntax` and `duplicate_field` violations found while parsing.
    pub violations: Vec<Violation>,
    /// The bytes were not valid UTF-8 and were decoded lossily.
    pub lossy: bool,
}

impl ParsedBibFile {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Read and parse a bibliography file.
///
/// # Errors
///
/// Returns `BibError::Read` when the file cannot be read.
pub fn parse_file(path: &Path) -> Result<ParsedBibFile, BibError> {
    let bytes = std::fs::read(path).map_err(|e| BibError::read(path, e))?;
    let name = path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    );
    Ok(parse_bytes(&name, &bytes))
}

/// Parse raw bytes, decoding invalid UTF-8 lossily.
#[must_use]
pub fn parse_bytes(name: &str, bytes: &[u8]) -> ParsedBibFile {
    let text = String::from_utf8_lossy(bytes);
    let lossy = matches!(text, Cow::Owned(_));
    let mut parsed = parse_str(name, &text);
    parsed.lossy = lossy;
    parsed
}

/// Research domain index encoded in a `literature-domain-N.bib` file name.
#[must_use]
pub fn domain_index(name: &str) -> Option<u32> {
    DOMAIN_FILE
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[must_use]
pub fn parse_str(name: &str, content: &str) -> ParsedBibFile {
    let provenance = Provenance {
        source: name.to_string(),
        domain: domain_index(name),
    };
    let mut parsed = ParsedBibFile {
        name: name.to_string(),
        ..ParsedBibFile::default()
    };

    let bytes = content.as_bytes();
    let mut pos = 0;
    while let Some(offset) = content[pos..].find('@') {
        let at = pos + offset;
        let type_start = at + 1;
        let type_end = type_start
            + bytes[type_start..]
                .iter()
                .take_while(|b| b.is_ascii_alphabetic())
                .count();
        if type_end == type_start {
            pos = type_start;
            continue;
        }
        let open = type_end
            + bytes[type_end..]
                .iter()
                .take_while(|b| b.is_ascii_whitespace())
                .count();
        if bytes.get(open) != Some(&b'{') {
            pos = type_start;
            continue;
        }

        let entry_type = content[type_start..type_end].to_ascii_lowercase();
        let Some(close) = matching_brace(bytes, open) else {
            let line = content[..at].matches('\n').count() + 1;
            parsed.violations.push(Violation::new(
                Rule::Syntax,
                "",
                None,
                format!("@{entry_type} entry on line {line} is never closed"),
            ));
            break;
        };
        pos = close + 1;

        if SKIPPED_TYPES.contains(&entry_type.as_str()) {
            continue;
        }
        parse_entry(&entry_type, &content[open + 1..close], &provenance, &mut parsed);
    }

    parsed
}

/// Index of the `}` closing the `{` at `open`.
fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, byte) in bytes.iter().enumerate().skip(open) {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_entry(entry_type: &str, body: &str, provenance: &Provenance, parsed: &mut ParsedBibFile) {
    let (key, fields) = body.split_once(',').unwrap_or((body, ""));
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        parsed.violations.push(Violation::new(
            Rule::Syntax,
            key,
            None,
            format!("@{entry_type} entry has no usable citation key"),
        ));
        return;
    }

    let mut record = BibRecord::new(key, entry_type);
    record.provenance = Some(provenance.clone());

    let mut seen = HashSet::new();
    let mut cursor = FieldCursor::new(fields);
    loop {
        match cursor.next_field() {
            Ok(Some((name, value))) => {
                let canonical = BibField::from_name(name)
                    .map_or_else(|| name.to_ascii_lowercase(), |f| f.as_str().to_string());
                if !seen.insert(canonical.clone()) {
                    parsed.violations.push(Violation::new(
                        Rule::DuplicateField,
                        key,
                        Some(&canonical),
                        format!("field '{canonical}' appears more than once; first value kept"),
                    ));
                    continue;
                }
                record.set_named(name, value);
            }
            Ok(None) => break,
            Err(message) => {
                parsed
                    .violations
                    .push(Violation::new(Rule::Syntax, key, None, message));
                break;
            }
        }
    }

    parsed.records.push(record);
}

/// Walks the `name = value, ...` list of one entry body.
struct FieldCursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> FieldCursor<'a> {
    const fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn skip(&mut self, pred: impl Fn(u8) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
    }

    fn next_field(&mut self) -> Result<Option<(&'a str, String)>, String> {
        self.skip(|b| b.is_ascii_whitespace() || b == b',');
        if self.pos >= self.src.len() {
            return Ok(None);
        }

        let start = self.pos;
        self.skip(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b':' | b'.'));
        if self.pos == start {
            let found = self.src[self.pos..].chars().next().unwrap_or(' ');
            return Err(format!("unexpected '{found}' where a field name was expected"));
        }
        let name = &self.src[start..self.pos];

        self.skip(|b| b.is_ascii_whitespace());
        if self.peek() != Some(b'=') {
            return Err(format!("field '{name}' is missing '='"));
        }
        self.pos += 1;

        let mut value = String::new();
        loop {
            self.skip(|b| b.is_ascii_whitespace());
            value.push_str(self.value_piece(name)?);
            self.skip(|b| b.is_ascii_whitespace());
            if self.peek() == Some(b'#') {
                self.pos += 1;
                continue;
            }
            break;
        }

        Ok(Some((name, collapse_whitespace(&value))))
    }

    /// One delimited or bare value; `#` concatenates pieces.
    fn value_piece(&mut self, name: &str) -> Result<&'a str, String> {
        let bytes = self.src.as_bytes();
        match self.peek() {
            Some(b'{') => {
                let close = matching_brace(bytes, self.pos)
                    .ok_or_else(|| format!("field '{name}' has an unbalanced brace"))?;
                let piece = &self.src[self.pos + 1..close];
                self.pos = close + 1;
                Ok(piece)
            }
            Some(b'"') => {
                let mut depth = 0usize;
                for idx in self.pos + 1..bytes.len() {
                    match bytes[idx] {
                        b'{' => depth += 1,
                        b'}' => depth = depth.saturating_sub(1),
                        b'"' if depth == 0 => {
                            let piece = &self.src[self.pos + 1..idx];
                            self.pos = idx + 1;
                            return Ok(piece);
                        }
                        _ => {}
                    }
                }
                Err(format!("field '{name}' has an unterminated quoted value"))
            }
            Some(_) => {
                let start = self.pos;
                self.skip(|b| !(b == b',' || b == b'#' || b.is_ascii_whitespace()));
                if self.pos == start {
                    return Err(format!("field '{name}' has no value"));
                }
                Ok(&self.src[start..self.pos])
            }
            None => Err(format!("field '{name}' has no value")),
        }
    }
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
