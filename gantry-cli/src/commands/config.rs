//! `gantry config`: show and edit `~/.gantry/config.yaml`.

use anyhow::{Context, Result};
use clap::Subcommand;

use gantry_core::config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective config (file plus environment). The API key is masked.
    Show,

    /// Set one key: api_origin, api_key, workspace, batch_size, presign_expiration_secs.
    Set { key: String, value: String },

    /// Print the config file location.
    Path,
}

pub fn run(command: ConfigCommand) -> Result<()> {
    let home = config::home().context("could not determine home directory")?;
    match command {
        ConfigCommand::Show => {
            let mut cfg = config::load().context("failed to load config")?;
            if cfg.api_key.is_some() {
                cfg.api_key = Some("********".to_string());
            }
            let workspace = cfg.workspace_at(&home);
            cfg.workspace = Some(workspace);
            print!("{}", cfg.to_yaml().context("failed to render config")?);
        }
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_at(&home).context("failed to load config")?;
            cfg.set(&key, &value)
                .with_context(|| format!("cannot set '{key}'"))?;
            config::save_at(&home, &cfg).context("failed to save config")?;
            println!("✓ {key} updated");
        }
        ConfigCommand::Path => println!("{}", config::config_path_at(&home).display()),
    }
    Ok(())
}
