//! Evidence snapshots: metadata captured from retrieval APIs at search time.
//!
//! Snapshots are read-only. They may enrich a record, never author one.
//! Retrieval sources disagree on field names, so [`EvidenceSnapshot::from_object`]
//! accepts the common spellings (`publication_year`, `container_title`,
//! `source.name`, `authorships[].author.display_name`, ...).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identity::{DurableIdentity, normalize_doi, normalize_title};
use crate::record::BibField;

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct EvidenceSnapshot {
    /// File the snapshot was read from.
    pub source_file: String,
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub year: Option<String>,
    pub journal: Option<String>,
    pub booktitle: Option<String>,
    pub publisher: Option<String>,
    pub volume: Option<String>,
    pub number: Option<String>,
    pub pages: Option<String>,
    pub doi: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
}

fn scalar(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn first_scalar(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::Array(items) => items.iter().find_map(scalar),
        other => scalar(other),
    })
}

fn author_name(value: &Value) -> Option<String> {
    match value {
        Value::String(_) => scalar(value),
        Value::Object(obj) => first_scalar(obj, &["name", "display_name"]).or_else(|| {
            obj.get("author")
                .and_then(Value::as_object)
                .and_then(|inner| first_scalar(inner, &["display_name", "name"]))
        }),
        _ => None,
    }
}

impl EvidenceSnapshot {
    /// Build a snapshot from one JSON object. Returns `None` when the object
    /// carries neither a title nor a DOI, since it cannot be matched.
    #[must_use]
    pub fn from_object(obj: &Map<String, Value>, source_file: &str) -> Option<Self> {
        let title = first_scalar(obj, &["title"]);
        let doi = first_scalar(obj, &["doi", "DOI"]);
        if title.is_none() && doi.is_none() {
            return None;
        }

        let authors = ["authors", "authorships", "author"]
            .iter()
            .find_map(|key| match obj.get(*key)? {
                Value::Array(items) => Some(items.iter().filter_map(author_name).collect()),
                Value::String(s) => Some(
                    s.split(" and ")
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .map(String::from)
                        .collect(),
                ),
                _ => None,
            })
            .unwrap_or_default();

        let journal = first_scalar(obj, &["journal", "container_title", "container-title", "venue"])
            .or_else(|| {
                obj.get("source")
                    .and_then(Value::as_object)
                    .and_then(|source| first_scalar(source, &["name", "display_name"]))
            });

        Some(Self {
            source_file: source_file.to_string(),
            title,
            authors,
            year: first_scalar(obj, &["year", "publication_year"]),
            journal,
            booktitle: first_scalar(obj, &["booktitle"]),
            publisher: first_scalar(obj, &["publisher"]),
            volume: first_scalar(obj, &["volume"]),
            number: first_scalar(obj, &["issue", "number"]),
            pages: first_scalar(obj, &["pages", "page"]),
            doi,
            url: first_scalar(obj, &["url", "URL"]),
            abstract_text: first_scalar(obj, &["abstract"]),
        })
    }

    /// The value this snapshot supplies for a record field.
    #[must_use]
    pub fn value(&self, field: BibField) -> Option<String> {
        match field {
            BibField::Author => (!self.authors.is_empty()).then(|| self.authors.join(" and ")),
            BibField::Title => self.title.clone(),
            BibField::Journal => self.journal.clone(),
            BibField::Booktitle => self.booktitle.clone(),
            BibField::Publisher => self.publisher.clone(),
            BibField::Year => self.year.clone(),
            BibField::Volume => self.volume.clone(),
            BibField::Number => self.number.clone(),
            BibField::Pages => self.pages.clone(),
            BibField::Doi => self.doi.clone(),
            BibField::Url => self.url.clone(),
            BibField::Abstract => self.abstract_text.clone(),
            BibField::Keywords | BibField::Note => None,
        }
    }

    #[must_use]
    pub fn normalized_doi(&self) -> Option<String> {
        self.doi.as_deref().map(normalize_doi).filter(|d| !d.is_empty())
    }

    #[must_use]
    pub fn normalized_title(&self) -> Option<String> {
        self.title.as_deref().map(normalize_title).filter(|t| !t.is_empty())
    }

    /// Identity under the same rules as a record.
    #[must_use]
    pub fn identity(&self) -> Option<DurableIdentity> {
        if let Some(doi) = self.normalized_doi() {
            return Some(DurableIdentity::Doi { doi });
        }
        Some(DurableIdentity::TitleYear {
            title: self.normalized_title()?,
            year: self.year.clone(),
        })
    }
}
