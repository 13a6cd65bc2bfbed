//! Validation results produced by the record validator.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::Rule;
use crate::record::BibField;

/// One rule violation for one record.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Violation {
    pub rule: Rule,
    /// Key of the offending record.
    pub key: String,
    /// Offending field name, when the rule is field-scoped.
    pub field: Option<String>,
    pub message: String,
}

impl Violation {
    #[must_use]
    pub fn new(rule: Rule, key: &str, field: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            rule,
            key: key.to_string(),
            field: field.map(String::from),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn for_field(rule: Rule, key: &str, field: BibField, message: impl Into<String>) -> Self {
        Self::new(rule, key, Some(field.as_str()), message)
    }
}

/// Outcome of validating one record. Never carries a modified record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    #[must_use]
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            valid: violations.is_empty(),
            violations,
        }
    }

    /// A record missing both title and author can be neither deduplicated
    /// nor cited.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        let missing = |field: BibField| {
            self.violations.iter().any(|v| {
                v.rule == Rule::RequiredField && v.field.as_deref() == Some(field.as_str())
            })
        };
        missing(BibField::Title) && missing(BibField::Author)
    }

    /// Violations of one rule.
    pub fn by_rule(&self, rule: Rule) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.rule == rule)
    }

    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
        self.valid = false;
    }
}
