//! Orchestrator tuning.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const fn default_worker_timeout_secs() -> u64 {
    1800
}

const fn default_max_concurrent_workers() -> usize {
    4
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Wall-clock bound for a single worker invocation.
    #[serde(default = "default_worker_timeout_secs")]
    pub worker_timeout_secs: u64,

    /// Upper bound on workers running at once during fan-out.
    #[serde(default = "default_max_concurrent_workers")]
    pub max_concurrent_workers: usize,

    /// Skip units whose artifact already exists and validates.
    #[serde(default = "default_true")]
    pub reuse_valid_artifacts: bool,

    /// Fill missing bibliography fields from evidence snapshots after research.
    #[serde(default = "default_true")]
    pub clean_with_evidence: bool,
}

impl PipelineConfig {
    #[must_use]
    pub const fn worker_timeout(&self) -> Duration {
        Duration::from_secs(self.worker_timeout_secs)
    }

    /// Concurrency limit, never below one.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.max_concurrent_workers.max(1)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_timeout_secs: default_worker_timeout_secs(),
            max_concurrent_workers: default_max_concurrent_workers(),
            reuse_valid_artifacts: true,
            clean_with_evidence: true,
        }
    }
}
