//! Merge results: the deduplicated bibliography and its warnings.
//!
//! Enrichment conflicts and identity ambiguities are warnings. They never block
//! a phase; they travel with the surviving record into `merge-report.json`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::identity::DurableIdentity;
use crate::record::{BibField, BibRecord};

/// Two sources hold differing values for one field. The existing value won.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct EnrichmentConflict {
    /// Key of the surviving record.
    pub key: String,
    pub field: BibField,
    pub kept: String,
    pub discarded: String,
    /// Where the discarded value came from (file name or snapshot file).
    pub source: String,
}

/// Records that could not be confidently identified as one paper.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct IdentityAmbiguity {
    /// Key of the record that was kept distinct.
    pub key: String,
    pub source: String,
    /// Candidate identities it might have belonged to.
    pub candidates: Vec<DurableIdentity>,
    pub reason: String,
}

/// A key that had to be suffixed because another identity already used it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct KeyRename {
    pub source: String,
    pub from: String,
    pub to: String,
}

/// An evidence value the cleaner refused to copy into a record.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RejectedEvidence {
    pub key: String,
    pub field: BibField,
    pub reason: String,
    /// Snapshot file the value came from.
    pub source: String,
}

/// A record dropped from the merge because it has no usable identity.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SkippedRecord {
    pub key: String,
    pub source: String,
    pub reason: String,
}

/// One deduplicated paper.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MergedEntry {
    pub identity: DurableIdentity,
    pub record: BibRecord,
    /// Every source file that contributed a record, in precedence order.
    pub sources: Vec<String>,
    /// Keys of every record folded into this entry, representative first.
    pub merged_keys: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<EnrichmentConflict>,
}

impl MergedEntry {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.record.key
    }

    /// Populated recognized fields, used by idempotence checks.
    #[must_use]
    pub fn populated_fields(&self) -> Vec<BibField> {
        BibField::ALL
            .into_iter()
            .filter(|field| self.record.is_populated(*field))
            .collect()
    }
}

/// The full output of a dedupe run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MergedBibliography {
    pub entries: Vec<MergedEntry>,
    #[serde(default)]
    pub ambiguities: Vec<IdentityAmbiguity>,
    #[serde(default)]
    pub renamed_keys: Vec<KeyRename>,
    #[serde(default)]
    pub skipped: Vec<SkippedRecord>,
    /// Number of input records across all files.
    pub records_in: usize,
}

impl MergedBibliography {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&MergedEntry> {
        self.entries.iter().find(|entry| entry.key() == key)
    }

    /// Entry a cited key refers to: the surviving key first, then any key
    /// folded into an entry.
    #[must_use]
    pub fn resolve(&self, key: &str) -> Option<&MergedEntry> {
        self.get(key).or_else(|| {
            self.entries
                .iter()
                .find(|entry| entry.merged_keys.iter().any(|k| k == key))
        })
    }

    /// Records in output order.
    pub fn records(&self) -> impl Iterator<Item = &BibRecord> {
        self.entries.iter().map(|entry| &entry.record)
    }

    /// Number of input records folded into another entry.
    #[must_use]
    pub fn duplicates_folded(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| entry.merged_keys.len().saturating_sub(1))
            .sum()
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.entries.iter().map(|e| e.warnings.len()).sum::<usize>() + self.ambiguities.len()
    }
}
