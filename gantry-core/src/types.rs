//! Domain types shared by the sync engine and its callers.
//!
//! Everything here is plain data: manifest lines, commits as the server
//! reports them, and the projections handed back to users. All types are
//! serde-serializable; JSON field names match the dataset API.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RecordError;
use crate::layout;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed dataset name. Also the name of the dataset folder inside
/// the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetName(pub String);

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for DatasetName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DatasetName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Manifest records
// ---------------------------------------------------------------------------

/// One line of a dataset manifest. Every field is required.
///
/// Construct with [`FileRecord::new`] or [`PendingFile::into_record`]; both
/// refuse empty fields so an incomplete line can never reach disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    file_name: String,
    url: String,
    version_id: String,
    sha256: String,
}

impl FileRecord {
    pub fn new(
        file_name: impl Into<String>,
        url: impl Into<String>,
        version_id: impl Into<String>,
        sha256: impl Into<String>,
    ) -> Result<Self, RecordError> {
        let record = Self {
            file_name: file_name.into(),
            url: url.into(),
            version_id: version_id.into(),
            sha256: sha256.into(),
        };
        record.validate()?;
        Ok(record)
    }

    /// Re-check a record that arrived through deserialization. `file_name`
    /// must be a plain relative path outside the reserved directories.
    pub fn validate(&self) -> Result<(), RecordError> {
        let missing = if self.file_name.is_empty() {
            Some("file_name")
        } else if self.url.is_empty() {
            Some("url")
        } else if self.version_id.is_empty() {
            Some("version_id")
        } else if self.sha256.is_empty() {
            Some("sha256")
        } else {
            None
        };
        if let Some(field) = missing {
            return Err(RecordError::Incomplete {
                file_name: self.file_name.clone(),
                field,
            });
        }
        layout::check_relative(&self.file_name)?;
        if layout::is_reserved(&self.file_name) {
            return Err(RecordError::UnsafePath {
                file_name: self.file_name.clone(),
                reason: "inside a reserved directory",
            });
        }
        Ok(())
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn version_id(&self) -> &str {
        &self.version_id
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    /// Serialize as a single manifest line, including the trailing newline.
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// A file on its way into a manifest: the object version is unknown until
/// the upload finishes, and deletions carry no hash worth keeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingFile {
    pub file_name: String,
    pub url: String,
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(default)]
    pub sha256: Option<String>,
}

impl PendingFile {
    pub fn new(file_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            url: url.into(),
            version_id: None,
            sha256: None,
        }
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }

    pub fn with_version_id(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }

    /// Promote to a manifest record; fails if any field is still missing.
    pub fn into_record(self) -> Result<FileRecord, RecordError> {
        let Some(version_id) = self.version_id else {
            return Err(RecordError::Incomplete {
                file_name: self.file_name,
                field: "version_id",
            });
        };
        let Some(sha256) = self.sha256 else {
            return Err(RecordError::Incomplete {
                file_name: self.file_name,
                field: "sha256",
            });
        };
        FileRecord::new(self.file_name, self.url, version_id, sha256)
    }
}

// ---------------------------------------------------------------------------
// Commits
// ---------------------------------------------------------------------------

/// A commit as recorded by the dataset server. The local HEAD file holds one
/// of these verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub id: Uuid,
    #[serde(default, alias = "parent_commit")]
    pub parent_commit_id: Option<Uuid>,
    pub message: String,
    /// Object-store version of the manifest blob for this commit.
    pub metadata_s3_file_version: String,
    #[serde(with = "http_date")]
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub is_latest_commit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<Uuid>,
}

/// Body of a create-commit request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCommit {
    pub message: String,
    pub metadata_s3_file_version: String,
    pub parent_commit_id: Uuid,
    /// Client-chosen id; lets uploaded objects live under the commit id
    /// before the commit exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<Uuid>,
}

/// User-facing projection of a [`Commit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version_id: Uuid,
    pub dataset: String,
    pub message: String,
    #[serde(with = "http_date")]
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub is_latest_version: bool,
}

impl VersionInfo {
    pub fn from_commit(commit: &Commit, dataset: &DatasetName) -> Self {
        Self {
            version_id: commit.id,
            dataset: dataset.0.clone(),
            message: commit.message.clone(),
            created_at: commit.created_at,
            created_by: commit.created_by.clone(),
            is_latest_version: commit.is_latest_commit,
        }
    }
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

pub const DEFAULT_S3_PREFIX: &str = "datasets/v1";

fn default_s3_prefix() -> String {
    DEFAULT_S3_PREFIX.to_string()
}

/// Server-side description of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub id: Uuid,
    pub name: DatasetName,
    pub bucket_name: String,
    #[serde(default = "default_s3_prefix")]
    pub s3_prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_region: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

/// Path-only view of local changes. Also the on-disk stash descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiffSummary {
    #[serde(default)]
    pub new_files: Vec<String>,
    #[serde(default)]
    pub modified_files: Vec<String>,
    #[serde(default)]
    pub deleted_files: Vec<String>,
}

impl DiffSummary {
    pub fn is_empty(&self) -> bool {
        self.new_files.is_empty() && self.modified_files.is_empty() && self.deleted_files.is_empty()
    }

    pub fn total(&self) -> usize {
        self.new_files.len() + self.modified_files.len() + self.deleted_files.len()
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Serde adapter for the server's HTTP-date timestamps
/// (`Thu, 16 Feb 2023 00:16:33 GMT`). RFC 3339 is accepted on input.
pub mod http_date {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc2822(raw)
            .or_else(|_| DateTime::parse_from_rfc3339(raw))
            .map(|dt| dt.with_timezone(&Utc))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
