use std::fs;
use std::path::Path;

use lec_schema::SchemaRegistry;
use serde::Serialize;

use crate::error::HookError;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LedgerLineError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerValidationReport {
    pub file: String,
    pub entries_checked: usize,
    pub errors: Vec<LedgerLineError>,
}

impl LedgerValidationReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check every line of a progress ledger against the `ledger_entry` schema.
///
/// # Errors
///
/// Returns `HookError::Io` when the file cannot be read.
pub fn validate_ledger_file(path: &Path) -> Result<LedgerValidationReport, HookError> {
    let content = fs::read_to_string(path)?;
    let schema = SchemaRegistry::new();
    let mut errors = Vec::new();
    let mut entries_checked = 0usize;

    for (line_idx, line) in content.lines().enumerate() {
        let line_no = line_idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        entries_checked += 1;

        if trimmed.starts_with('\u{feff}') {
            errors.push(LedgerLineError {
                line: line_no,
                message: "BOM detected".to_string(),
            });
            continue;
        }

        if trimmed.starts_with("<<<<<<<")
            || trimmed.starts_with("=======")
            || trimmed.starts_with(">>>>>>>")
        {
            errors.push(LedgerLineError {
                line: line_no,
                message: "git conflict marker detected".to_string(),
            });
            continue;
        }

        let value: serde_json::Value = match serde_json::from_str(trimmed) {
            Ok(value) => value,
            Err(error) => {
                errors.push(LedgerLineError {
                    line: line_no,
                    message: format!("invalid JSON: {error}"),
                });
                continue;
            }
        };

        if let Err(error) = schema.validate("ledger_entry", &value) {
            errors.push(LedgerLineError {
                line: line_no,
                message: format!("schema validation failed: {error}"),
            });
        }
    }

    Ok(LedgerValidationReport {
        file: path.display().to_string(),
        entries_checked,
        errors,
    })
}
