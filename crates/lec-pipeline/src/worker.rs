//! Worker invocation.
//!
//! A worker receives one [`WorkerTask`] and must write exactly one file, the
//! task's `output`. Nothing else it produces is trusted: the orchestrator
//! re-validates that path after the worker returns.

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;

use lec_config::WorkersConfig;
use lec_core::enums::WorkerRole;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::WorkerError;

/// Lines of stderr kept when a command worker fails.
const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerTask {
    pub role: WorkerRole,
    /// Domain or section index for fanned-out phases.
    pub unit: Option<u32>,
    /// Domain name or section heading.
    pub unit_name: Option<String>,
    pub topic: String,
    pub description: String,
    pub run_root: PathBuf,
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
}

/// Runs one task to completion.
///
/// Implementations must be cancel-safe: the orchestrator drops the future when
/// the worker timeout expires.
pub trait Worker: Send + Sync + 'static {
    fn run(&self, task: WorkerTask) -> impl Future<Output = Result<(), WorkerError>> + Send;
}

/// Runs the configured external command for the task's role.
///
/// The task is written to the child's stdin as JSON and exported as
/// `LECTERN_*` environment variables. The child is killed if the future is
/// dropped.
#[derive(Debug, Clone)]
pub struct CommandWorker {
    commands: WorkersConfig,
}

impl CommandWorker {
    #[must_use]
    pub const fn new(commands: WorkersConfig) -> Self {
        Self { commands }
    }
}

impl Worker for CommandWorker {
    async fn run(&self, task: WorkerTask) -> Result<(), WorkerError> {
        let spec = self.commands.for_role(task.role);
        let Some(program) = spec.program().filter(|p| !p.trim().is_empty()) else {
            return Err(WorkerError::NotConfigured { role: task.role });
        };

        let mut command = Command::new(program);
        command
            .args(spec.args())
            .envs(&spec.env)
            .envs(task_env(&task))
            .current_dir(&task.run_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(role = %task.role, unit = ?task.unit, program, "spawning worker");
        let mut child = command.spawn().map_err(|source| WorkerError::Spawn {
            program: program.to_string(),
            source,
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            let payload = serde_json::to_vec(&task)
                .map_err(|e| WorkerError::Other(format!("failed to encode task: {e}")))?;
            match stdin.write_all(&payload).await {
                Ok(()) => {}
                // The command may ignore stdin and exit before reading it.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Err(e) => return Err(e.into()),
            }
        }

        let output = child.wait_with_output().await?;
        debug!(
            role = %task.role,
            unit = ?task.unit,
            status = %output.status,
            stdout_bytes = output.stdout.len(),
            "worker exited"
        );
        if output.status.success() {
            Ok(())
        } else {
            Err(WorkerError::Exited {
                status: output.status.to_string(),
                stderr_tail: stderr_tail(&output.stderr),
            })
        }
    }
}

fn task_env(task: &WorkerTask) -> Vec<(&'static str, String)> {
    let join = |paths: &[PathBuf]| {
        std::env::join_paths(paths)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    vec![
        ("LECTERN_ROLE", task.role.to_string()),
        (
            "LECTERN_UNIT",
            task.unit.map(|u| u.to_string()).unwrap_or_default(),
        ),
        ("LECTERN_UNIT_NAME", task.unit_name.clone().unwrap_or_default()),
        ("LECTERN_TOPIC", task.topic.clone()),
        ("LECTERN_DESCRIPTION", task.description.clone()),
        ("LECTERN_RUN_ROOT", task.run_root.display().to_string()),
        ("LECTERN_INPUTS", join(&task.inputs)),
        ("LECTERN_OUTPUT", task.output.display().to_string()),
    ]
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    let tail = lines[start..].join("\n");
    if tail.trim().is_empty() {
        "(no stderr output)".to_string()
    } else {
        tail
    }
}
