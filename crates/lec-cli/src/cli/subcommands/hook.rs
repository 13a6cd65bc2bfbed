use clap::Subcommand;

/// Hook entrypoints called by agent runtimes and shell wrappers.
#[derive(Clone, Debug, Subcommand)]
pub enum HookCommands {
    /// Gate one bibliography file; exits non-zero when it is invalid.
    #[command(name = "validate-bib")]
    ValidateBib {
        /// Bibliography file to check.
        file: String,
        /// Evidence snapshot directory (defaults to a sibling `json/` directory).
        #[arg(long)]
        evidence_dir: Option<String>,
    },
    /// Pre-write guard: reads a tool call from stdin, answers allow or deny.
    #[command(name = "guard-write")]
    GuardWrite,
    /// Check every line of a progress ledger against its schema.
    #[command(name = "validate-ledger")]
    ValidateLedger {
        /// Ledger file (defaults to the run ledger under the current directory).
        file: Option<String>,
    },
}
