//! `gantry diff`: list uncommitted changes.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use gantry_core::DiffSummary;

use super::open_dataset;

/// Arguments for `gantry diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Dataset name.
    pub dataset: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let dataset = open_dataset(&self.dataset)?;
        let diff = dataset
            .get_diff()
            .with_context(|| format!("diff failed for '{}'", self.dataset))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&diff)?);
            return Ok(());
        }
        print_summary(&self.dataset, &diff);
        Ok(())
    }
}

pub fn print_summary(name: &str, diff: &DiffSummary) {
    if diff.is_empty() {
        println!("✓ '{name}': no local changes");
        return;
    }
    for path in &diff.new_files {
        println!("  {} {path}", "new:     ".green());
    }
    for path in &diff.modified_files {
        println!("  {} {path}", "modified:".yellow());
    }
    for path in &diff.deleted_files {
        println!("  {} {path}", "deleted: ".red());
    }
    println!("{} change(s) in '{name}'", diff.total());
}
