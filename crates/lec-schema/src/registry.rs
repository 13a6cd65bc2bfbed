//! Central schema registry for all persisted Lectern types.
//!
//! The `SchemaRegistry` builds JSON Schemas from lec-core types at construction
//! time using [`schemars::schema_for!`] and provides validation via `jsonschema`.

use std::collections::HashMap;

use schemars::schema_for;

use crate::error::SchemaError;

/// Central store of all JSON Schemas in the Lectern system.
pub struct SchemaRegistry {
    schemas: HashMap<&'static str, serde_json::Value>,
}

macro_rules! register {
    ($map:expr, $name:expr, $ty:ty) => {
        $map.insert($name, schema_for!($ty).to_value());
    };
}

impl SchemaRegistry {
    /// Build a registry containing the record, ledger, report, and CLI
    /// response schemas from lec-core.
    #[must_use]
    pub fn new() -> Self {
        let mut schemas = HashMap::new();

        // --- Bibliography (4) ---
        register!(schemas, "bib_record", lec_core::record::BibRecord);
        register!(
            schemas,
            "evidence_snapshot",
            lec_core::evidence::EvidenceSnapshot
        );
        register!(
            schemas,
            "validation_result",
            lec_core::validation::ValidationResult
        );
        register!(
            schemas,
            "merge_report",
            lec_core::merge::MergedBibliography
        );

        // --- Ledger envelope (1) ---
        register!(schemas, "ledger_entry", lec_core::ledger::LedgerEntry);

        // --- CLI response types (5) ---
        register!(
            schemas,
            "run_response",
            lec_core::responses::RunResponse
        );
        register!(
            schemas,
            "status_response",
            lec_core::responses::StatusResponse
        );
        register!(
            schemas,
            "dedupe_response",
            lec_core::responses::DedupeResponse
        );
        register!(
            schemas,
            "clean_response",
            lec_core::responses::CleanResponse
        );
        register!(
            schemas,
            "assemble_response",
            lec_core::responses::AssembleResponse
        );

        Self { schemas }
    }

    /// Get a schema by name. Returns `None` if not found.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.schemas.get(name)
    }

    /// Validate a JSON value against a named schema.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::NotFound` if the schema name is unknown, or
    /// `SchemaError::ValidationFailed` if validation produces errors.
    pub fn validate(&self, name: &str, instance: &serde_json::Value) -> Result<(), SchemaError> {
        let schema = self
            .get(name)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))?;

        let validator = jsonschema::validator_for(schema)
            .map_err(|e| SchemaError::Generation(format!("{e}")))?;

        let errors: Vec<String> = validator
            .iter_errors(instance)
            .map(|e| format!("{e}"))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::ValidationFailed { errors })
        }
    }

    /// Parse `line` as JSON and validate it against a named schema.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::InvalidJson` when `line` is not JSON, otherwise
    /// the errors of [`Self::validate`].
    pub fn validate_str(&self, name: &str, line: &str) -> Result<(), SchemaError> {
        let value: serde_json::Value =
            serde_json::from_str(line).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;
        self.validate(name, &value)
    }

    /// List all registered schema names.
    #[must_use]
    pub fn list(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.schemas.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Number of registered schemas.
    #[must_use]
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lec_core::enums::{Phase, PhaseStatus};
    use lec_core::ledger::LedgerEntry;
    use lec_core::record::{BibField, BibRecord};
    use pretty_assertions::assert_eq;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new()
    }

    #[test]
    fn registry_has_expected_count() {
        // 4 bibliography + 1 ledger + 5 responses = 10
        assert_eq!(registry().schema_count(), 10);
    }

    #[test]
    fn registry_list_is_sorted() {
        let reg = registry();
        let names = reg.list();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn get_nonexistent_schema() {
        assert!(registry().get("nonexistent").is_none());
    }

    #[test]
    fn validate_valid_ledger_entry() {
        let reg = registry();
        let entry = LedgerEntry::new(Phase::Plan, PhaseStatus::Completed)
            .with_artifacts(vec!["intermediate_files/lit-review-plan.md".into()]);
        let json = serde_json::to_value(&entry).unwrap();
        assert!(reg.validate("ledger_entry", &json).is_ok());
    }

    #[test]
    fn validate_rejects_unknown_phase() {
        let reg = registry();
        let invalid = serde_json::json!({
            "v": 1,
            "ts": "2026-02-08T12:00:00Z",
            "phase": "review",
            "status": "completed"
        });
        let result = reg.validate("ledger_entry", &invalid);
        if let Err(SchemaError::ValidationFailed { errors }) = result {
            assert!(!errors.is_empty());
        } else {
            panic!("Expected ValidationFailed");
        }
    }

    #[test]
    fn validate_rejects_missing_status() {
        let reg = registry();
        let line = r#"{"ts":"2026-02-08T12:00:00Z","phase":"plan"}"#;
        assert!(matches!(
            reg.validate_str("ledger_entry", line),
            Err(SchemaError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn validate_str_reports_invalid_json() {
        let reg = registry();
        assert!(matches!(
            reg.validate_str("ledger_entry", "{not json"),
            Err(SchemaError::InvalidJson(_))
        ));
    }

    #[test]
    fn validate_valid_bib_record() {
        let reg = registry();
        let record = BibRecord::new("smith2020", "article")
            .with(BibField::Title, "X")
            .with(BibField::Author, "Smith, John");
        let json = serde_json::to_value(&record).unwrap();
        assert!(reg.validate("bib_record", &json).is_ok());
    }

    #[test]
    fn clean_response_lists_rejected_evidence() {
        let reg = registry();
        let response = serde_json::json!({
            "file": "literature-domain-1.bib",
            "changed": false,
            "records_changed": 0,
            "fields_filled": 0,
            "conflicts": [],
            "rejected": [{
                "key": "smith2020",
                "field": "abstract",
                "reason": "has unbalanced braces",
                "source": "openalex.json"
            }],
            "refused": false
        });
        assert!(reg.validate("clean_response", &response).is_ok());

        let bad_field = serde_json::json!({
            "file": "x.bib",
            "changed": false,
            "records_changed": 0,
            "fields_filled": 0,
            "conflicts": [],
            "rejected": [{"key": "k", "field": "colour", "reason": "r", "source": "s"}]
        });
        assert!(reg.validate("clean_response", &bad_field).is_err());
    }

    #[test]
    fn validate_nonexistent_schema_returns_not_found() {
        let result = registry().validate("bogus", &serde_json::json!({}));
        assert!(matches!(result, Err(SchemaError::NotFound(_))));
    }

    #[test]
    fn all_expected_schemas_present() {
        let reg = registry();
        let expected = [
            "bib_record",
            "evidence_snapshot",
            "validation_result",
            "merge_report",
            "ledger_entry",
            "run_response",
            "status_response",
            "dedupe_response",
            "clean_response",
            "assemble_response",
        ];
        for name in &expected {
            assert!(reg.get(name).is_some(), "Missing expected schema: {name}");
        }
    }
}
