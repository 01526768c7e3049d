//! Command-line surface: a thin `clap` shell around [`crate::services::orchestrator::run`].

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Local code-quality gate orchestrator with a content-addressed
/// verification cache.
#[derive(Debug, Parser)]
#[command(name = "firsttry", version, about, long_about = None)]
pub struct Cli {
    /// Repository root to operate on.
    #[arg(long, global = true, default_value = ".")]
    pub repo_root: PathBuf,

    /// Emit machine-readable JSON instead of a human-readable summary.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Plan and execute the configured checks.
    Run {
        /// Restrict execution to these task ids and their transitive
        /// dependents; every other task's result is carried over from the
        /// last recorded run.
        #[arg(long, value_delimiter = ',')]
        changed: Option<Vec<String>>,

        /// Skip the zero-run fast path even if nothing changed.
        #[arg(long)]
        no_fast_path: bool,

        /// Run and report without updating any on-disk state.
        #[arg(long)]
        verify_only: bool,

        /// Use the partial-ok pass bar instead of strict.
        #[arg(long)]
        partial_ok: bool,
    },

    /// Delete cached task results and the recorded green run.
    ClearCache {
        /// Only clear this task's cache entries, rather than everything.
        #[arg(long)]
        task: Option<String>,
    },
}
