//! Error types for gantry-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or validating dataset records and locators.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    /// A manifest line must carry every field before it is written.
    #[error("incomplete dataset file info for '{file_name}': missing {field}")]
    Incomplete {
        file_name: String,
        field: &'static str,
    },

    /// A file name that would resolve outside the dataset folder or into
    /// its reserved directories.
    #[error("unsafe file name '{file_name}': {reason}")]
    UnsafePath {
        file_name: String,
        reason: &'static str,
    },

    /// The URL is not of the form `scheme://bucket/key`.
    #[error("malformed object url '{url}'")]
    MalformedUrl { url: String },
}

/// All errors that can arise from loading or saving the client config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, annotated with the config path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the file path.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A value parsed but is out of range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}
