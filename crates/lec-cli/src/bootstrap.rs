use std::path::{Path, PathBuf};

use anyhow::Context;
use lec_config::LecternConfig;
use lec_pipeline::RunLayout;

/// Load `.env` from the project root (or the working directory), then the
/// layered config with the project's `.lectern/config.toml`.
pub fn load_config(project_root: &Path) -> anyhow::Result<LecternConfig> {
    load_project_dotenv(project_root)?;
    LecternConfig::load_from(project_root).context("failed to load lectern configuration")
}

fn load_project_dotenv(project_root: &Path) -> anyhow::Result<()> {
    let env_path = project_root.join(".env");
    if env_path.exists() {
        dotenvy::from_path(&env_path)
            .with_context(|| format!("failed to load dotenv file at {}", env_path.display()))?;
        return Ok(());
    }

    dotenvy::dotenv().ok();
    Ok(())
}

/// Run directory for `topic`: an explicit `--run-dir`, else
/// `<project>/<output_dir>/<slug>`.
#[must_use]
pub fn run_layout(
    project_root: &Path,
    config: &LecternConfig,
    topic: Option<&str>,
    run_dir: Option<&str>,
) -> Option<RunLayout> {
    if let Some(dir) = run_dir {
        return Some(RunLayout::new(PathBuf::from(dir)));
    }
    let output_dir = project_root.join(&config.general.output_dir);
    topic.map(|topic| RunLayout::for_topic(&output_dir, topic))
}
