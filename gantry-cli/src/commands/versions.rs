//! `gantry versions`: version history, newest first.

use anyhow::{Context, Result};
use clap::Args;

use super::{open_dataset, print_versions};

/// Arguments for `gantry versions`.
#[derive(Args, Debug)]
pub struct VersionsArgs {
    /// Dataset name.
    pub dataset: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl VersionsArgs {
    pub fn run(self) -> Result<()> {
        let dataset = open_dataset(&self.dataset)?;
        let versions = dataset
            .list_versions()
            .with_context(|| format!("could not list versions of '{}'", self.dataset))?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&versions)?);
        } else {
            print_versions(&versions);
        }
        Ok(())
    }
}
