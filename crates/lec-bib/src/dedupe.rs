//! Cross-file deduplication.
//!
//! Files are given in precedence order (first file wins ties). Records are
//! grouped by durable identity, one representative per group is enriched from
//! the others, and groups are emitted in order of first appearance.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use lec_core::identity::{DurableIdentity, normalize_field};
use lec_core::merge::{
    EnrichmentConflict, IdentityAmbiguity, KeyRename, MergedBibliography, MergedEntry,
    SkippedRecord,
};
use lec_core::record::{BibField, BibRecord};
use tracing::{debug, warn};

use crate::error::BibError;
use crate::parser::{ParsedBibFile, parse_file};
use crate::validator::is_fatal;

/// One input record with its position in precedence order.
struct Candidate<'a> {
    source: &'a str,
    record: &'a BibRecord,
}

struct Group {
    identity: DurableIdentity,
    /// Candidate indices in precedence order.
    members: Vec<usize>,
}

impl Group {
    fn first(&self) -> usize {
        self.members.first().copied().unwrap_or(usize::MAX)
    }
}

/// Parse `paths` in order and deduplicate them.
///
/// # Errors
///
/// Returns `BibError::NoInput` for an empty list and `BibError::Read` when a
/// file cannot be read.
pub fn dedupe_files(paths: &[impl AsRef<Path>]) -> Result<MergedBibliography, BibError> {
    if paths.is_empty() {
        return Err(BibError::NoInput);
    }
    let files = paths
        .iter()
        .map(|path| parse_file(path.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(dedupe(&files))
}

/// Deduplicate parsed files given in precedence order.
#[must_use]
pub fn dedupe(files: &[ParsedBibFile]) -> MergedBibliography {
    let mut merged = MergedBibliography::default();
    let mut candidates = Vec::new();

    for file in files {
        for record in &file.records {
            merged.records_in += 1;
            if is_fatal(record) {
                merged.skipped.push(skip(record, &file.name, "missing both title and author"));
            } else if DurableIdentity::of(record).is_none() {
                merged.skipped.push(skip(record, &file.name, "no DOI or title to identify it"));
            } else {
                candidates.push(Candidate {
                    source: &file.name,
                    record,
                });
            }
        }
    }

    let groups = group(&candidates, &mut merged.ambiguities);

    let mut used_keys = HashSet::new();
    for group in groups {
        let rep = representative(&group, &candidates);
        let original_key = &candidates[rep].record.key;
        let key = unique_key(original_key, &mut used_keys);
        if key != *original_key {
            debug!(from = %original_key, to = %key, "renamed colliding key");
            merged.renamed_keys.push(KeyRename {
                source: candidates[rep].source.to_string(),
                from: original_key.clone(),
                to: key.clone(),
            });
        }
        merged.entries.push(merge_group(group, rep, key, &candidates));
    }

    merged
}

fn skip(record: &BibRecord, source: &str, reason: &str) -> SkippedRecord {
    warn!(key = %record.key, source, reason, "skipping record");
    SkippedRecord {
        key: record.key.clone(),
        source: source.to_string(),
        reason: reason.to_string(),
    }
}

/// Assign every candidate to a group; returns groups in first-appearance order.
fn group(candidates: &[Candidate<'_>], ambiguities: &mut Vec<IdentityAmbiguity>) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut by_identity: HashMap<DurableIdentity, usize> = HashMap::new();

    // DOI groups first, so a DOI-less record can join one that appears later.
    let mut doi_groups_by_title: HashMap<DurableIdentity, Vec<usize>> = HashMap::new();
    for candidate in candidates {
        let Some(identity) = DurableIdentity::of(candidate.record).filter(DurableIdentity::is_doi)
        else {
            continue;
        };
        let idx = *by_identity.entry(identity.clone()).or_insert_with(|| {
            groups.push(Group {
                identity,
                members: Vec::new(),
            });
            groups.len() - 1
        });
        if let Some(title_year) = DurableIdentity::title_year(candidate.record) {
            let entry = doi_groups_by_title.entry(title_year).or_default();
            if !entry.contains(&idx) {
                entry.push(idx);
            }
        }
    }

    for (position, candidate) in candidates.iter().enumerate() {
        let Some(identity) = DurableIdentity::of(candidate.record) else {
            continue;
        };
        let idx = if identity.is_doi() {
            group_for(&mut groups, &mut by_identity, identity)
        } else {
            match doi_groups_by_title.get(&identity).map(Vec::as_slice) {
                Some([only]) => *only,
                Some(several) => {
                    let candidates: Vec<DurableIdentity> = several
                        .iter()
                        .map(|g| groups[*g].identity.clone())
                        .collect();
                    warn!(key = %candidate.record.key, source = candidate.source, "title and year match several DOIs");
                    ambiguities.push(IdentityAmbiguity {
                        key: candidate.record.key.clone(),
                        source: candidate.source.to_string(),
                        candidates,
                        reason: "title and year match records with different DOIs".into(),
                    });
                    group_for(&mut groups, &mut by_identity, identity)
                }
                None => group_for(&mut groups, &mut by_identity, identity),
            }
        };
        groups[idx].members.push(position);
    }

    groups.retain(|g| !g.members.is_empty());
    groups.sort_by_key(Group::first);
    groups
}

fn group_for(
    groups: &mut Vec<Group>,
    by_identity: &mut HashMap<DurableIdentity, usize>,
    identity: DurableIdentity,
) -> usize {
    *by_identity.entry(identity.clone()).or_insert_with(|| {
        groups.push(Group {
            identity,
            members: Vec::new(),
        });
        groups.len() - 1
    })
}

/// Most populated member; ties go to the earliest.
fn representative(group: &Group, candidates: &[Candidate<'_>]) -> usize {
    let mut best = group.first();
    let mut best_count = 0;
    for &member in &group.members {
        let count = candidates[member].record.populated_count();
        if count > best_count {
            best = member;
            best_count = count;
        }
    }
    best
}

/// `smith2020`, then `smith2020b`, `smith2020c`, ...
fn unique_key(key: &str, used: &mut HashSet<String>) -> String {
    if used.insert(key.to_string()) {
        return key.to_string();
    }
    let mut n = 2u32;
    loop {
        let suffix = if n <= 26 {
            char::from_u32(u32::from(b'a') + n - 1).map_or_else(|| n.to_string(), String::from)
        } else {
            n.to_string()
        };
        let candidate = format!("{key}{suffix}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn merge_group(group: Group, rep: usize, key: String, candidates: &[Candidate<'_>]) -> MergedEntry {
    let mut record = candidates[rep].record.clone();
    record.key = key;

    let mut sources = vec![candidates[rep].source.to_string()];
    let mut merged_keys = vec![candidates[rep].record.key.clone()];
    let mut warnings = Vec::new();

    for &member in group.members.iter().filter(|m| **m != rep) {
        let other = candidates[member].record;
        let source = candidates[member].source;
        if !sources.iter().any(|s| s == source) {
            sources.push(source.to_string());
        }
        if !merged_keys.contains(&other.key) {
            merged_keys.push(other.key.clone());
        }

        for field in BibField::ALL {
            let Some(value) = other.get(field) else {
                continue;
            };
            match record.get(field) {
                None => record.set(field, value),
                Some(kept) if normalize_field(field, kept) != normalize_field(field, value) => {
                    warn!(key = %record.key, %field, kept, discarded = value, source, "enrichment conflict");
                    warnings.push(EnrichmentConflict {
                        key: record.key.clone(),
                        field,
                        kept: kept.to_string(),
                        discarded: value.to_string(),
                        source: source.to_string(),
                    });
                }
                Some(_) => {}
            }
        }
        for (name, value) in &other.extra {
            if !value.trim().is_empty() {
                record
                    .extra
                    .entry(name.clone())
                    .or_insert_with(|| value.clone());
            }
        }
    }

    // Sources in precedence order, not representative-first.
    sources.sort_by_key(|s| {
        group
            .members
            .iter()
            .position(|m| candidates[*m].source == s.as_str())
            .unwrap_or(usize::MAX)
    });

    MergedEntry {
        identity: group.identity,
        record,
        sources,
        merged_keys,
        warnings,
    }
}
