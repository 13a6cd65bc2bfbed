//! External worker commands, one per role.

use std::collections::BTreeMap;

use lec_core::enums::WorkerRole;
use serde::{Deserialize, Serialize};

/// How to launch one worker role.
///
/// `command[0]` is the program, the rest are its arguments. `env` is added on
/// top of the inherited environment.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct WorkerCommand {
    #[serde(default)]
    pub command: Vec<String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl WorkerCommand {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.command.first().is_some_and(|program| !program.trim().is_empty())
    }

    #[must_use]
    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        self.command.get(1..).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorkersConfig {
    #[serde(default)]
    pub planner: WorkerCommand,
    #[serde(default)]
    pub researcher: WorkerCommand,
    #[serde(default)]
    pub synthesis_planner: WorkerCommand,
    #[serde(default)]
    pub writer: WorkerCommand,
}

impl WorkersConfig {
    #[must_use]
    pub const fn for_role(&self, role: WorkerRole) -> &WorkerCommand {
        match role {
            WorkerRole::Planner => &self.planner,
            WorkerRole::Researcher => &self.researcher,
            WorkerRole::SynthesisPlanner => &self.synthesis_planner,
            WorkerRole::Writer => &self.writer,
        }
    }

    /// Roles with no command configured.
    #[must_use]
    pub fn unconfigured_roles(&self) -> Vec<WorkerRole> {
        [
            WorkerRole::Planner,
            WorkerRole::Researcher,
            WorkerRole::SynthesisPlanner,
            WorkerRole::Writer,
        ]
        .into_iter()
        .filter(|role| !self.for_role(*role).is_configured())
        .collect()
    }
}
