//! `gantry stash` / `gantry restore`.

use anyhow::{Context, Result};
use clap::Args;

use super::{diff::print_summary, open_dataset};

/// Arguments for `gantry stash`.
#[derive(Args, Debug)]
pub struct StashArgs {
    /// Dataset name.
    pub dataset: String,
}

impl StashArgs {
    pub fn run(self) -> Result<()> {
        let dataset = open_dataset(&self.dataset)?;
        let stashed = dataset
            .stash()
            .with_context(|| format!("stash failed for '{}'", self.dataset))?;
        if stashed.is_empty() {
            println!("nothing to stash in '{}'; any earlier stash is kept", self.dataset);
            return Ok(());
        }
        print_summary(&self.dataset, &stashed);
        println!("stashed; run `gantry restore {}` to bring these back", self.dataset);
        Ok(())
    }
}

/// Arguments for `gantry restore`.
#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Dataset name.
    pub dataset: String,
}

impl RestoreArgs {
    pub fn run(self) -> Result<()> {
        let dataset = open_dataset(&self.dataset)?;
        match dataset
            .restore()
            .with_context(|| format!("restore failed for '{}'", self.dataset))?
        {
            Some(restored) => print_summary(&self.dataset, &restored),
            None => println!("nothing stashed for '{}'", self.dataset),
        }
        Ok(())
    }
}
