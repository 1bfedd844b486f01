//! `gantry pull`: sync a dataset folder to a version.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use uuid::Uuid;

use super::{open_dataset, print_version_line};

/// Arguments for `gantry pull`.
#[derive(Args, Debug)]
pub struct PullArgs {
    /// Dataset name.
    pub dataset: String,

    /// Version to check out; defaults to the latest.
    #[arg(long)]
    pub version: Option<Uuid>,

    /// Discard local changes.
    #[arg(long)]
    pub force: bool,
}

impl PullArgs {
    pub fn run(self) -> Result<()> {
        let dataset = open_dataset(&self.dataset)?;
        let pulled = dataset
            .pull(self.version, self.force)
            .with_context(|| format!("pull failed for '{}'", self.dataset))?;
        match pulled {
            Some(version) => print_version_line("pulled", &self.dataset, &version),
            None => println!(
                "{} local changes in '{}' were kept; run `gantry stash {}` or pass --force",
                "!".yellow(),
                self.dataset,
                self.dataset
            ),
        }
        Ok(())
    }
}
