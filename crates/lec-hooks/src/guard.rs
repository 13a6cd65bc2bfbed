//! Pre-write guard for `.bib` files.
//!
//! Agent runtimes call this with the pending tool call on stdin. Anything that
//! is not a `Write` of non-empty `.bib` content is allowed untouched;
//! bibliography writes are parsed and validated in memory and denied with the
//! reasons when any rule fails.

use lec_bib::{ValidationRules, parse_str, validate_parsed};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::HookError;

/// Most reasons listed in a deny message.
const MAX_REASONS: usize = 20;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolInput {
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub content: String,
}

/// The pending tool call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WritePayload {
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: ToolInput,
}

impl WritePayload {
    /// Parse a payload from raw stdin text.
    ///
    /// # Errors
    ///
    /// Returns `HookError::Json` when the text is not a JSON payload.
    pub fn from_json(text: &str) -> Result<Self, HookError> {
        Ok(serde_json::from_str(text)?)
    }

    fn is_bib_write(&self) -> bool {
        self.tool_name == "Write"
            && self.tool_input.file_path.ends_with(".bib")
            && !self.tool_input.content.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Deny { reasons: Vec<String> },
}

impl GuardDecision {
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// The hook response written to stdout.
    #[must_use]
    pub fn to_hook_output(&self) -> Value {
        match self {
            Self::Allow => json!({ "hookSpecificOutput": {} }),
            Self::Deny { reasons } => {
                let more = reasons.len().saturating_sub(MAX_REASONS);
                let extra = format!("... and {more} more");
                let mut listed: Vec<&str> =
                    reasons.iter().take(MAX_REASONS).map(String::as_str).collect();
                if more > 0 {
                    listed.push(&extra);
                }
                json!({
                    "hookSpecificOutput": {
                        "permissionDecision": "deny",
                        "denyReason": format!("BibTeX validation failed:\n- {}", listed.join("\n- ")),
                    }
                })
            }
        }
    }
}

/// Decide whether the pending write may proceed.
#[must_use]
pub fn guard_write(payload: &WritePayload, rules: &ValidationRules) -> GuardDecision {
    if !payload.is_bib_write() {
        return GuardDecision::Allow;
    }

    let parsed = parse_str(&payload.tool_input.file_path, &payload.tool_input.content);
    let result = validate_parsed(&parsed, rules);
    if result.valid {
        return GuardDecision::Allow;
    }

    let reasons: Vec<String> = result
        .violations
        .iter()
        .map(|v| {
            if v.key.is_empty() {
                format!("{}: {}", v.rule, v.message)
            } else {
                format!("{}: {}: {}", v.key, v.rule, v.message)
            }
        })
        .collect();
    debug!(file = %payload.tool_input.file_path, reasons = reasons.len(), "denying bibliography write");
    GuardDecision::Deny { reasons }
}

/// Guard raw stdin text. Unparseable payloads are allowed.
#[must_use]
pub fn guard_stdin(text: &str, rules: &ValidationRules) -> GuardDecision {
    WritePayload::from_json(text).map_or(GuardDecision::Allow, |payload| guard_write(&payload, rules))
}
