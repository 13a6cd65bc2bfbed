use std::path::Path;

use lec_config::LecternConfig;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(
    command: Commands,
    project_root: &Path,
    config: &LecternConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Run(args) => commands::run::handle(&args, project_root, config, flags).await,
        Commands::Status(args) => commands::status::handle(&args, project_root, config, flags),
        Commands::Validate(args) => commands::validate::handle(&args, config, flags),
        Commands::Clean(args) => commands::clean::handle(&args, flags),
        Commands::Dedupe(args) => commands::dedupe::handle(&args, flags),
        Commands::Assemble(args) => {
            commands::assemble::handle(&args, project_root, config, flags).await
        }
        Commands::Schema(args) => commands::schema::handle(&args, flags),
        Commands::Hook { action } => commands::hook::handle(&action, config, flags),
    }
}
