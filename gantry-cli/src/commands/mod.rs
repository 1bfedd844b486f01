//! Subcommand implementations.

pub mod config;
pub mod delete;
pub mod diff;
pub mod pull;
pub mod push;
pub mod rollback;
pub mod stash;
pub mod versions;

use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use gantry_core::{config as gantry_config, types::DatasetName, VersionInfo};
use gantry_sync::{GantryDataset, HttpApi};

/// Load config, connect to the API and look the dataset up by name.
pub fn open_dataset(name: &str) -> Result<GantryDataset> {
    let config = gantry_config::load().context("failed to load ~/.gantry/config.yaml")?;
    let home = gantry_config::home().context("could not determine home directory")?;
    let api = Arc::new(HttpApi::new(&config.api_origin, config.api_key.clone()));
    GantryDataset::open(
        &DatasetName::from(name),
        &config.workspace_at(&home),
        config.sync_config(),
        api.clone(),
        api,
    )
    .with_context(|| format!("failed to open dataset '{name}'"))
}

#[derive(Tabled)]
pub struct VersionRow {
    #[tabled(rename = "version")]
    pub version: String,
    #[tabled(rename = "message")]
    pub message: String,
    #[tabled(rename = "created")]
    pub created: String,
    #[tabled(rename = "by")]
    pub created_by: String,
    #[tabled(rename = "latest")]
    pub latest: String,
}

impl From<&VersionInfo> for VersionRow {
    fn from(v: &VersionInfo) -> Self {
        Self {
            version: v.version_id.to_string(),
            message: v.message.clone(),
            created: v.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            created_by: v.created_by.clone(),
            latest: if v.is_latest_version { "*".into() } else { String::new() },
        }
    }
}

pub fn print_versions(versions: &[VersionInfo]) {
    let rows: Vec<VersionRow> = versions.iter().map(VersionRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

/// One-line summary after a sync.
pub fn print_version_line(verb: &str, dataset: &str, version: &VersionInfo) {
    println!(
        "{} {verb} '{dataset}' at {} ({})",
        "✓".green(),
        version.version_id.to_string().bold(),
        version.message
    );
}
