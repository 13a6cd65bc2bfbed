//! # lec-hooks
//!
//! Checks that run at trust boundaries:
//!
//! - [`gate`]: the phase-exit gate for one bibliography file, combining the
//!   structural validator with an evidence cross-check.
//! - [`guard`]: a pre-write guard that inspects a tool-call payload and denies
//!   writes of invalid `.bib` content before they reach disk.
//! - [`ledger`]: line-by-line schema validation of the progress ledger.

mod error;
pub mod gate;
pub mod guard;
pub mod ledger;

pub use error::HookError;
pub use gate::{BibGateReport, check_bib_file};
pub use guard::{GuardDecision, WritePayload, guard_stdin, guard_write};
pub use ledger::{LedgerValidationReport, validate_ledger_file};
