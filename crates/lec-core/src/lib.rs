//! # lec-core
//!
//! Core types and error types for Lectern.
//!
//! This crate provides the foundational types shared across all Lectern crates:
//! - The bibliographic record model (closed field set plus an extra-field bucket)
//! - Durable identity normalization (DOI, title, year)
//! - Evidence snapshots used as a read-only oracle by the cleaner
//! - Validation results and rule names
//! - Merge results: provenance, enrichment conflicts, identity ambiguities
//! - Pipeline phase enums and the progress ledger envelope
//! - CLI response types
//! - Cross-cutting error types

pub mod enums;
pub mod errors;
pub mod evidence;
pub mod identity;
pub mod ledger;
pub mod merge;
pub mod record;
pub mod responses;
pub mod validation;
