//! The bibliographic record model.
//!
//! A [`BibRecord`] holds a closed, enumerated set of recognized fields
//! ([`BibField`]) plus an explicit bucket for anything else the producer
//! wrote. The validator and cleaner reason over the closed set; extension
//! fields pass through untouched.

use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A recognized bibliographic field.
///
/// Variant order is the order fields are rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BibField {
    Author,
    Title,
    Journal,
    Booktitle,
    Publisher,
    Year,
    Volume,
    Number,
    Pages,
    Doi,
    Url,
    Abstract,
    Keywords,
    Note,
}

impl BibField {
    pub const ALL: [Self; 14] = [
        Self::Author,
        Self::Title,
        Self::Journal,
        Self::Booktitle,
        Self::Publisher,
        Self::Year,
        Self::Volume,
        Self::Number,
        Self::Pages,
        Self::Doi,
        Self::Url,
        Self::Abstract,
        Self::Keywords,
        Self::Note,
    ];

    /// Fields whose values can be checked against evidence snapshots.
    pub const EVIDENCE_CHECKED: [Self; 8] = [
        Self::Journal,
        Self::Booktitle,
        Self::Volume,
        Self::Number,
        Self::Pages,
        Self::Publisher,
        Self::Year,
        Self::Doi,
    ];

    /// The field name as written in a bibliography file.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Author => "author",
            Self::Title => "title",
            Self::Journal => "journal",
            Self::Booktitle => "booktitle",
            Self::Publisher => "publisher",
            Self::Year => "year",
            Self::Volume => "volume",
            Self::Number => "number",
            Self::Pages => "pages",
            Self::Doi => "doi",
            Self::Url => "url",
            Self::Abstract => "abstract",
            Self::Keywords => "keywords",
            Self::Note => "note",
        }
    }

    /// Resolve a field name (case-insensitive). `venue` and `issue` are
    /// accepted as aliases for `journal` and `number`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        match lower.as_str() {
            "venue" => return Some(Self::Journal),
            "issue" => return Some(Self::Number),
            _ => {}
        }
        Self::ALL.into_iter().find(|field| field.as_str() == lower)
    }

    /// Free-text fields, where whitespace and case are not significant for
    /// comparison.
    #[must_use]
    pub const fn is_prose(self) -> bool {
        matches!(
            self,
            Self::Author
                | Self::Title
                | Self::Journal
                | Self::Booktitle
                | Self::Publisher
                | Self::Abstract
                | Self::Keywords
                | Self::Note
        )
    }
}

impl fmt::Display for BibField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a record came from.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Provenance {
    /// File name of the bibliography the record was parsed from.
    pub source: String,
    /// Research domain index, when the source is a domain file.
    pub domain: Option<u32>,
}

/// One citation entry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct BibRecord {
    pub key: String,
    pub entry_type: String,
    #[serde(default)]
    pub fields: BTreeMap<BibField, String>,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
    #[serde(default)]
    pub provenance: Option<Provenance>,
}

impl BibRecord {
    #[must_use]
    pub fn new(key: impl Into<String>, entry_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entry_type: entry_type.into(),
            fields: BTreeMap::new(),
            extra: BTreeMap::new(),
            provenance: None,
        }
    }

    /// Builder-style setter, used heavily by tests and the renderer.
    #[must_use]
    pub fn with(mut self, field: BibField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: BibField, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }

    /// Set a field by name, routing unrecognized names into the extra bucket.
    pub fn set_named(&mut self, name: &str, value: impl Into<String>) {
        match BibField::from_name(name) {
            Some(field) => self.set(field, value),
            None => {
                self.extra.insert(name.trim().to_ascii_lowercase(), value.into());
            }
        }
    }

    /// The trimmed field value, `None` when absent or blank.
    #[must_use]
    pub fn get(&self, field: BibField) -> Option<&str> {
        self.fields
            .get(&field)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    #[must_use]
    pub fn is_populated(&self, field: BibField) -> bool {
        self.get(field).is_some()
    }

    /// Number of non-empty fields, recognized and extra.
    #[must_use]
    pub fn populated_count(&self) -> usize {
        let known = self.fields.values().filter(|v| !v.trim().is_empty()).count();
        let extra = self.extra.values().filter(|v| !v.trim().is_empty()).count();
        known + extra
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.get(BibField::Title)
    }

    #[must_use]
    pub fn year(&self) -> Option<&str> {
        self.get(BibField::Year)
    }

    #[must_use]
    pub fn doi(&self) -> Option<&str> {
        self.get(BibField::Doi)
    }

    /// Journal, falling back to book title.
    #[must_use]
    pub fn venue(&self) -> Option<&str> {
        self.get(BibField::Journal)
            .or_else(|| self.get(BibField::Booktitle))
    }

    /// Authors split on the ` and ` separator.
    #[must_use]
    pub fn authors(&self) -> Vec<&str> {
        self.get(BibField::Author)
            .map(|field| {
                field
                    .split(" and ")
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Surname of the first author (`Last, First` or `First Last`).
    #[must_use]
    pub fn first_author_surname(&self) -> Option<&str> {
        let first = *self.authors().first()?;
        let surname = match first.split_once(',') {
            Some((last, _)) => last.trim(),
            None => first.split_whitespace().last().unwrap_or(first),
        };
        (!surname.is_empty()).then_some(surname)
    }
}
