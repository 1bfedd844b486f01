//! `gantry rollback`: new version with an older version's contents.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use uuid::Uuid;

use super::{open_dataset, print_version_line};

/// Arguments for `gantry rollback`.
#[derive(Args, Debug)]
pub struct RollbackArgs {
    /// Dataset name.
    pub dataset: String,

    /// Version whose contents become the new latest version.
    pub version: Uuid,

    /// Discard local changes.
    #[arg(long)]
    pub force: bool,
}

impl RollbackArgs {
    pub fn run(self) -> Result<()> {
        let dataset = open_dataset(&self.dataset)?;
        let rolled = dataset
            .rollback(self.version, self.force)
            .with_context(|| format!("rollback failed for '{}'", self.dataset))?;
        match rolled {
            Some(version) => print_version_line("rolled back", &self.dataset, &version),
            None => println!(
                "{} local changes in '{}' block the rollback; stash them or pass --force",
                "!".yellow(),
                self.dataset
            ),
        }
        Ok(())
    }
}
