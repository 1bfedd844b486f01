//! `gantry delete`: soft-delete a dataset on the server.

use anyhow::{bail, Context, Result};
use clap::Args;

use super::open_dataset;

/// Arguments for `gantry delete`.
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Dataset name.
    pub dataset: String,

    /// Confirm the deletion.
    #[arg(long)]
    pub yes: bool,
}

impl DeleteArgs {
    pub fn run(self) -> Result<()> {
        if !self.yes {
            bail!(
                "refusing to delete '{}' without --yes; local files are never touched",
                self.dataset
            );
        }
        let dataset = open_dataset(&self.dataset)?;
        dataset
            .delete()
            .with_context(|| format!("delete failed for '{}'", self.dataset))?;
        println!("✓ '{}' deleted on the server", self.dataset);
        Ok(())
    }
}
