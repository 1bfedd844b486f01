//! Gantry core library: dataset domain types, on-disk layout, object
//! locations and client configuration.
//!
//! - [`types`]: records, commits, dataset descriptors
//! - [`layout`]: reserved paths inside a dataset folder
//! - [`locator`]: object URLs and keys
//! - [`config`]: `~/.gantry/config.yaml`
//! - [`error`]: [`RecordError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod layout;
pub mod locator;
pub mod types;

pub use config::{GantryConfig, SyncConfig};
pub use error::{ConfigError, RecordError};
pub use layout::DatasetLayout;
pub use locator::ObjectLocator;
pub use types::{
    Commit, DatasetInfo, DatasetName, DiffSummary, FileRecord, NewCommit, PendingFile, VersionInfo,
};
