//! Error types for gantry-sync.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use gantry_core::error::RecordError;

/// All errors that can arise from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No manifest or HEAD in the workspace; `pull` first.
    #[error("dataset '{name}' not found locally at {path}; pull it first")]
    DatasetNotFound { name: String, path: PathBuf },

    #[error("commit {id} not found")]
    CommitNotFound { id: Uuid },

    /// Local HEAD is behind the server's latest commit.
    #[error("local HEAD {head} is out of date (latest is {latest}); pull before pushing")]
    HeadOutOfDate { head: String, latest: String },

    #[error("dataset '{name}' has been deleted")]
    DatasetDeleted { name: String },

    #[error("dataset '{name}' has no commits")]
    NoCommits { name: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Two manifest lines share a `file_name`.
    #[error("duplicate manifest entry '{file_name}' at {path}:{line}")]
    DuplicateEntry {
        file_name: String,
        path: PathBuf,
        line: usize,
    },

    #[error("malformed manifest line {line} in {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("no presigned url returned for object '{key}'")]
    MissingPresignedUrl { key: String },

    /// At least one object in a batch failed; `source` is the first failure.
    #[error("{direction} failed for {failed} of {total} objects: {source}")]
    Transfer {
        direction: Direction,
        failed: usize,
        total: usize,
        #[source]
        source: Box<SyncError>,
    },

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("could not start transfer workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (HEAD, stash descriptor).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors talking to the dataset API or the object store.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Non-2xx response.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("could not decode response: {0}")]
    Decode(String),

    /// A presigned PUT succeeded without reporting an object version.
    #[error("upload of '{key}' returned no object version")]
    MissingVersionId { key: String },
}

impl RemoteError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upload,
    Download,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Upload => f.write_str("upload"),
            Direction::Download => f.write_str("download"),
        }
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
