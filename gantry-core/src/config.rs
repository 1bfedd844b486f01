//! Client configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.gantry/
//!   config.yaml   (mode 0600, written by `gantry config set`)
//! ```
//!
//! Every function has two forms, as elsewhere in this crate:
//! - `fn_at(home: &Path, …)` for tests with `TempDir`
//! - `fn(…)` which derives home from `dirs::home_dir()`
//!
//! Environment variables (`GANTRY_API_KEY`, `GANTRY_API_ORIGIN`,
//! `GANTRY_WORKSPACE`) win over the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_API_ORIGIN: &str = "https://app.gantry.io";
pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_PRESIGN_EXPIRATION_SECS: u64 = 3600;
pub const DEFAULT_WORKSPACE_DIR: &str = "gantry-datasets";

pub const ENV_API_KEY: &str = "GANTRY_API_KEY";
pub const ENV_API_ORIGIN: &str = "GANTRY_API_ORIGIN";
pub const ENV_WORKSPACE: &str = "GANTRY_WORKSPACE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GantryConfig {
    pub api_origin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Parent folder of local dataset folders. `None` means `<home>/gantry-datasets`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<PathBuf>,
    pub batch_size: usize,
    pub presign_expiration_secs: u64,
}

impl Default for GantryConfig {
    fn default() -> Self {
        Self {
            api_origin: DEFAULT_API_ORIGIN.to_string(),
            api_key: None,
            workspace: None,
            batch_size: DEFAULT_BATCH_SIZE,
            presign_expiration_secs: DEFAULT_PRESIGN_EXPIRATION_SECS,
        }
    }
}

/// The subset of config the sync engine consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Files per transfer batch. Always at least 1.
    pub batch_size: usize,
    pub presign_expiration_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            presign_expiration_secs: DEFAULT_PRESIGN_EXPIRATION_SECS,
        }
    }
}

impl GantryConfig {
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            batch_size: self.batch_size,
            presign_expiration_secs: self.presign_expiration_secs,
        }
    }

    /// Resolved workspace folder.
    pub fn workspace_at(&self, home: &Path) -> PathBuf {
        self.workspace
            .clone()
            .unwrap_or_else(|| home.join(DEFAULT_WORKSPACE_DIR))
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Overlay values from `lookup` (normally `std::env::var`).
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY).filter(|v| !v.is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(origin) = lookup(ENV_API_ORIGIN).filter(|v| !v.is_empty()) {
            self.api_origin = origin;
        }
        if let Some(ws) = lookup(ENV_WORKSPACE).filter(|v| !v.is_empty()) {
            self.workspace = Some(PathBuf::from(ws));
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.presign_expiration_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "presign_expiration_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.api_origin.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "api_origin",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Set one field from its string form. Used by `gantry config set`.
    pub fn set(&mut self, field: &str, value: &str) -> Result<(), ConfigError> {
        match field {
            "api_origin" => self.api_origin = value.to_string(),
            "api_key" => self.api_key = Some(value.to_string()),
            "workspace" => self.workspace = Some(PathBuf::from(value)),
            "batch_size" => self.batch_size = parse_number("batch_size", value)?,
            "presign_expiration_secs" => {
                self.presign_expiration_secs = parse_number("presign_expiration_secs", value)?
            }
            _ => {
                return Err(ConfigError::Invalid {
                    field: "key",
                    reason: format!("unknown config key '{field}'"),
                })
            }
        }
        self.validate()
    }
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        field,
        reason: format!("'{value}' is not a number"),
    })
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// `<home>/.gantry/config.yaml` (pure, no I/O).
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".gantry").join("config.yaml")
}

/// Read the config file. A missing file yields the defaults.
pub fn load_at(home: &Path) -> Result<GantryConfig, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(GantryConfig::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let config: GantryConfig =
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })?;
    config.validate()?;
    Ok(config)
}

/// File config plus environment overrides.
pub fn load() -> Result<GantryConfig, ConfigError> {
    let config = load_at(&home()?)?.with_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Atomically write the config: `.yaml.tmp` sibling, `chmod 0600`, `rename`.
pub fn save_at(home: &Path, config: &GantryConfig) -> Result<(), ConfigError> {
    config.validate()?;
    let path = config_path_at(home);
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| home.to_path_buf());
    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::Io {
        path: dir.clone(),
        source,
    })?;

    let tmp_path = path.with_file_name("config.yaml.tmp");
    let yaml = serde_yaml::to_string(config)?;
    let written = std::fs::write(&tmp_path, yaml)
        .and_then(|_| set_file_permissions(&tmp_path))
        .and_then(|_| std::fs::rename(&tmp_path, &path));
    if let Err(source) = written {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(ConfigError::Io { path, source });
    }
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(config: &GantryConfig) -> Result<(), ConfigError> {
    save_at(&home()?, config)
}

pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
