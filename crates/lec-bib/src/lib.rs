//! # lec-bib
//!
//! Bibliography handling for Lectern: a BibTeX-style parser and renderer,
//! the structural record validator, the evidence-backed metadata cleaner, and
//! the cross-file deduplicator.
//!
//! Everything here is synchronous and pure apart from file reads; the
//! pipeline and hook crates decide when to run it and what to do with the
//! reports.

pub mod cleaner;
pub mod dedupe;
mod error;
pub mod parser;
pub mod render;
pub mod validator;

pub use cleaner::{CleanOutcome, EvidenceIndex, FileCleanReport, clean, clean_file, verify};
pub use dedupe::{dedupe, dedupe_files};
pub use error::BibError;
pub use parser::{ParsedBibFile, parse_bytes, parse_file, parse_str};
pub use render::{render_bibliography, render_record};
pub use validator::{ValidationRules, validate, validate_file, validate_parsed};
