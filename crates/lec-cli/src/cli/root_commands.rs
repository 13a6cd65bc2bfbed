use clap::{Args, Subcommand, ValueEnum};
use lec_core::enums::Phase;

use crate::cli::subcommands::HookCommands;

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Run (or resume) the pipeline for a topic.
    Run(RunArgs),
    /// Show ledger-derived phase status for a run.
    Status(StatusArgs),
    /// Validate a bibliography file.
    Validate(ValidateArgs),
    /// Fill and correct bibliography fields from evidence snapshots.
    Clean(CleanArgs),
    /// Merge bibliography files into one deduplicated bibliography.
    Dedupe(DedupeArgs),
    /// Run the assemble phase for an existing run.
    Assemble(AssembleArgs),
    /// List registered schemas or dump one.
    Schema(SchemaArgs),
    /// Hook handler called by agent runtimes and shell wrappers.
    Hook {
        #[command(subcommand)]
        action: HookCommands,
    },
}

/// CLI spelling of a pipeline phase.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum PhaseArg {
    Plan,
    Research,
    SynthesisPlan,
    Write,
    Assemble,
}

impl From<PhaseArg> for Phase {
    fn from(arg: PhaseArg) -> Self {
        match arg {
            PhaseArg::Plan => Self::Plan,
            PhaseArg::Research => Self::Research,
            PhaseArg::SynthesisPlan => Self::SynthesisPlan,
            PhaseArg::Write => Self::Write,
            PhaseArg::Assemble => Self::Assemble,
        }
    }
}

/// Arguments for `lectern run`.
#[derive(Clone, Debug, Args)]
pub struct RunArgs {
    /// Research topic; also names the run directory.
    pub topic: String,
    /// Longer description handed to every worker (defaults to the topic).
    #[arg(short, long)]
    pub description: Option<String>,
    /// Stop after this phase.
    #[arg(long, value_enum)]
    pub until: Option<PhaseArg>,
    /// Explicit run directory instead of `<output_dir>/<slug>`.
    #[arg(long)]
    pub run_dir: Option<String>,
}

/// Arguments for `lectern status`.
#[derive(Clone, Debug, Args)]
pub struct StatusArgs {
    /// Research topic of the run.
    #[arg(required_unless_present = "run_dir")]
    pub topic: Option<String>,
    /// Explicit run directory.
    #[arg(long)]
    pub run_dir: Option<String>,
}

/// Arguments for `lectern validate`.
#[derive(Clone, Debug, Args)]
pub struct ValidateArgs {
    /// Bibliography file to check.
    pub file: String,
    /// Evidence snapshot directory (defaults to a sibling `json/` directory).
    #[arg(long)]
    pub evidence_dir: Option<String>,
}

/// Arguments for `lectern clean`.
#[derive(Clone, Debug, Args)]
pub struct CleanArgs {
    /// Bibliography file to rewrite in place.
    pub file: String,
    /// Evidence snapshot directory (defaults to a sibling `json/` directory).
    #[arg(long)]
    pub evidence_dir: Option<String>,
}

/// Arguments for `lectern dedupe`.
#[derive(Clone, Debug, Args)]
pub struct DedupeArgs {
    /// Bibliography files in precedence order.
    #[arg(required = true)]
    pub files: Vec<String>,
    /// Merged bibliography output path.
    #[arg(short, long)]
    pub output: String,
    /// Also write the merge report as JSON.
    #[arg(long)]
    pub report: Option<String>,
}

/// Arguments for `lectern assemble`.
#[derive(Clone, Debug, Args)]
pub struct AssembleArgs {
    /// Research topic of the run; used in the review title.
    pub topic: String,
    /// Explicit run directory.
    #[arg(long)]
    pub run_dir: Option<String>,
}

/// Arguments for `lectern schema`.
#[derive(Clone, Debug, Args)]
pub struct SchemaArgs {
    /// Schema name (omit to list all).
    pub name: Option<String>,
}
