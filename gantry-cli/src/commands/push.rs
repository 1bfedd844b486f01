//! `gantry push`: commit local changes as a new version.

use anyhow::{Context, Result};
use clap::Args;

use super::{open_dataset, print_version_line};

/// Arguments for `gantry push`.
#[derive(Args, Debug)]
pub struct PushArgs {
    /// Dataset name.
    pub dataset: String,

    /// Message recorded with the new version.
    #[arg(long, short)]
    pub message: String,
}

impl PushArgs {
    pub fn run(self) -> Result<()> {
        let dataset = open_dataset(&self.dataset)?;
        let version = dataset
            .push_version(&self.message)
            .with_context(|| format!("push failed for '{}'", self.dataset))?;
        print_version_line("pushed", &self.dataset, &version);
        Ok(())
    }
}
