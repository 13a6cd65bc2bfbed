//! # lec-pipeline
//!
//! The coordination layer of a Lectern run:
//!
//! - [`layout`]: every path of the run directory's file contract
//! - [`contract`]: phase units, expected artifacts, structural checks
//! - [`ledger`] / [`tracker`]: the append-only progress ledger and the
//!   completion rules built on it
//! - [`worker`]: the worker trait and the external-command implementation
//! - [`orchestrator`]: the phase state machine with bounded fan-out
//! - [`assembler`]: the final review, references, and evidence table

pub mod assembler;
pub mod contract;
mod error;
pub mod layout;
pub mod ledger;
mod mirror;
pub mod orchestrator;
pub mod tracker;
pub mod worker;

pub use error::{PipelineError, WorkerError};
pub use layout::{RunLayout, slugify};
pub use orchestrator::{Orchestrator, PhaseObserver, RunRequest};
pub use tracker::{ArtifactAudit, PhaseTracker};
pub use worker::{CommandWorker, Worker, WorkerTask};
