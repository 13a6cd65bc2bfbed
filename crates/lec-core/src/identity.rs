//! Durable identity: the DOI-or-title+year key that recognizes "the same
//! paper" across independently produced bibliography files.
//!
//! Record keys are chosen freely by each researcher and carry no identity.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::record::{BibField, BibRecord};

const DOI_PREFIXES: [&str; 7] = [
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi.org/",
    "dx.doi.org/",
    "doi:",
];

/// Lowercase and collapse internal whitespace.
#[must_use]
pub fn normalize_text(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Case-insensitive DOI with any resolver URL or `doi:` prefix stripped.
#[must_use]
pub fn normalize_doi(value: &str) -> String {
    let mut doi = normalize_text(value);
    for prefix in DOI_PREFIXES {
        if let Some(rest) = doi.strip_prefix(prefix) {
            doi = rest.trim().to_string();
            break;
        }
    }
    doi
}

/// Lowercase title with punctuation and braces dropped, whitespace collapsed.
#[must_use]
pub fn normalize_title(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    normalize_text(&cleaned)
}

/// Page ranges with any dash run (`-`, `--`, en/em dash) folded to `-`.
#[must_use]
pub fn normalize_pages(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_dash = false;
    for c in value.trim().chars() {
        if matches!(c, '-' | '\u{2013}' | '\u{2014}') {
            if !in_dash {
                while out.ends_with(' ') {
                    out.pop();
                }
                out.push('-');
            }
            in_dash = true;
        } else if in_dash && c.is_whitespace() {
            continue;
        } else {
            in_dash = false;
            out.push(c);
        }
    }
    out
}

/// Author list reduced to ordered lowercase surnames, so `Smith, John` and
/// `John Smith` compare equal.
#[must_use]
pub fn normalize_authors(value: &str) -> String {
    value
        .split(" and ")
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            let surname = match name.split_once(',') {
                Some((last, _)) => last,
                None => name.split_whitespace().last().unwrap_or(name),
            };
            normalize_title(surname)
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Field-aware normalization used when comparing two values of one field.
#[must_use]
pub fn normalize_field(field: BibField, value: &str) -> String {
    match field {
        BibField::Author => normalize_authors(value),
        BibField::Doi => normalize_doi(value),
        BibField::Pages => normalize_pages(value),
        BibField::Title => normalize_title(value),
        f if f.is_prose() => normalize_text(value),
        _ => value.trim().to_string(),
    }
}

/// The identity of a paper for deduplication and evidence matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DurableIdentity {
    Doi { doi: String },
    TitleYear { title: String, year: Option<String> },
}

impl DurableIdentity {
    /// Identity of a record: DOI when present, else title + year.
    ///
    /// Returns `None` for a record with neither a DOI nor a title.
    #[must_use]
    pub fn of(record: &BibRecord) -> Option<Self> {
        if let Some(doi) = record.doi().map(normalize_doi).filter(|d| !d.is_empty()) {
            return Some(Self::Doi { doi });
        }
        Self::title_year(record)
    }

    /// The title + year identity, ignoring any DOI.
    #[must_use]
    pub fn title_year(record: &BibRecord) -> Option<Self> {
        let title = record.title().map(normalize_title).filter(|t| !t.is_empty())?;
        Some(Self::TitleYear {
            title,
            year: record.year().map(|y| y.trim().to_string()),
        })
    }

    #[must_use]
    pub const fn is_doi(&self) -> bool {
        matches!(self, Self::Doi { .. })
    }
}

impl fmt::Display for DurableIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Doi { doi } => write!(f, "doi:{doi}"),
            Self::TitleYear { title, year } => {
                write!(f, "title:{title}|{}", year.as_deref().unwrap_or("n.d."))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn doi_prefixes_are_stripped() {
        assert_eq!(normalize_doi("https://doi.org/10.1000/ABC"), "10.1000/abc");
        assert_eq!(normalize_doi("  doi:10.1000/x "), "10.1000/x");
        assert_eq!(normalize_doi("http://dx.doi.org/10.5/q"), "10.5/q");
        assert_eq!(normalize_doi("10.1/abc"), "10.1/abc");
    }

    #[test]
    fn titles_ignore_case_punctuation_and_braces() {
        assert_eq!(
            normalize_title("{Dynamic}  Capabilities: A Review!"),
            "dynamic capabilities a review"
        );
    }

    #[test]
    fn author_order_matters_but_name_form_does_not() {
        assert_eq!(
            normalize_field(BibField::Author, "Smith, John and Jane Doe"),
            normalize_field(BibField::Author, "John Smith and Doe, J.")
        );
        assert_ne!(
            normalize_authors("Smith, John and Doe, Jane"),
            normalize_authors("Doe, Jane and Smith, John")
        );
    }

    #[test]
    fn pages_fold_dashes() {
        assert_eq!(normalize_pages("10 -- 20"), "10-20");
        assert_eq!(normalize_pages("10\u{2013}20"), "10-20");
        assert_eq!(normalize_pages("e123"), "e123");
    }

    #[test]
    fn doi_identity_takes_precedence() {
        let record = BibRecord::new("a", "article")
            .with(BibField::Title, "X")
            .with(BibField::Year, "2020")
            .with(BibField::Doi, "https://doi.org/10.1/ABC");
        assert_eq!(
            DurableIdentity::of(&record),
            Some(DurableIdentity::Doi {
                doi: "10.1/abc".into()
            })
        );
        assert_eq!(
            DurableIdentity::title_year(&record),
            Some(DurableIdentity::TitleYear {
                title: "x".into(),
                year: Some("2020".into())
            })
        );
    }

    #[test]
    fn record_without_title_or_doi_has_no_identity() {
        let record = BibRecord::new("a", "misc").with(BibField::Year, "2020");
        assert_eq!(DurableIdentity::of(&record), None);
    }

    #[test]
    fn identity_display() {
        let id = DurableIdentity::TitleYear {
            title: "x".into(),
            year: None,
        };
        assert_eq!(id.to_string(), "title:x|n.d.");
    }
}
