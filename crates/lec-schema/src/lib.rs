//! # lec-schema
//!
//! JSON Schema generation, validation, and registry for Lectern.
//!
//! Record, ledger, and report types are defined in `lec-core` with
//! `#[derive(JsonSchema)]`. This crate builds their schemas once and validates
//! arbitrary JSON values against them. `lec-hooks` uses it to check ledger
//! lines; the CLI uses it for `lectern schema`.

mod error;
mod registry;

pub use error::SchemaError;
pub use registry::SchemaRegistry;
