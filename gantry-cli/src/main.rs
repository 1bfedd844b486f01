//! Gantry, the dataset version control CLI.
//!
//! # Usage
//!
//! ```text
//! gantry pull <dataset> [--version <id>] [--force]
//! gantry push <dataset> --message <text>
//! gantry diff <dataset> [--json]
//! gantry stash <dataset>
//! gantry restore <dataset>
//! gantry rollback <dataset> <version> [--force]
//! gantry versions <dataset> [--json]
//! gantry delete <dataset> --yes
//! gantry config show|set|path
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    config::ConfigCommand,
    delete::DeleteArgs,
    diff::DiffArgs,
    pull::PullArgs,
    push::PushArgs,
    rollback::RollbackArgs,
    stash::{RestoreArgs, StashArgs},
    versions::VersionsArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "gantry",
    version,
    about = "Keep local dataset folders in sync with versioned Gantry datasets",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sync a dataset folder to a version (latest by default).
    Pull(PullArgs),

    /// Commit every local change as a new version.
    Push(PushArgs),

    /// Show uncommitted changes.
    Diff(DiffArgs),

    /// Move uncommitted changes aside and reset the folder to HEAD.
    Stash(StashArgs),

    /// Bring back stashed changes.
    Restore(RestoreArgs),

    /// Create a new version with the contents of an older one.
    Rollback(RollbackArgs),

    /// List versions, newest first.
    Versions(VersionsArgs),

    /// Delete the dataset on the server. Local files are kept.
    Delete(DeleteArgs),

    /// Read or change ~/.gantry/config.yaml.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Pull(args) => args.run(),
        Commands::Push(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Stash(args) => args.run(),
        Commands::Restore(args) => args.run(),
        Commands::Rollback(args) => args.run(),
        Commands::Versions(args) => args.run(),
        Commands::Delete(args) => args.run(),
        Commands::Config { command } => commands::config::run(command),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
