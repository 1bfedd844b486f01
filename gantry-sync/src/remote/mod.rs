//! Remote boundary: the commit/metadata API and the object store.
//!
//! The sync engine is storage-agnostic. [`http::HttpApi`] talks to the real
//! dataset API; [`memory::MemoryRemote`] keeps everything in process and is
//! what the tests run against.

use std::collections::HashMap;
use std::io::Read;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gantry_core::types::{Commit, DatasetInfo, DatasetName, NewCommit};

use crate::error::RemoteError;

pub mod http;
pub mod memory;

pub use http::HttpApi;
pub use memory::MemoryRemote;

/// Server-held commit log and dataset metadata.
pub trait CommitLog: Send + Sync {
    fn dataset(&self, name: &DatasetName) -> Result<DatasetInfo, RemoteError>;

    /// Newest first.
    fn list_commits(&self, dataset_id: Uuid) -> Result<Vec<Commit>, RemoteError>;

    /// A missing commit is `RemoteError::Status { status: 404, .. }`.
    fn get_commit(&self, dataset_id: Uuid, commit_id: Uuid) -> Result<Commit, RemoteError>;

    /// Rejects with status 400 when `parent_commit_id` is not the latest commit.
    fn create_commit(&self, dataset_id: Uuid, commit: &NewCommit) -> Result<Commit, RemoteError>;

    /// Soft delete.
    fn disable_dataset(&self, dataset_id: Uuid) -> Result<(), RemoteError>;
}

/// One versioned object to presign for download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    #[serde(rename = "obj_key")]
    pub key: String,
    pub version_id: String,
}

/// Versioned object storage reached through presigned URLs.
pub trait ObjectStore: Send + Sync {
    /// `key → url` for every requested object.
    fn presign_get(
        &self,
        dataset_id: Uuid,
        objects: &[ObjectRef],
        expiration_secs: u64,
    ) -> Result<HashMap<String, String>, RemoteError>;

    /// `key → url` for every requested key.
    fn presign_put(
        &self,
        dataset_id: Uuid,
        keys: &[String],
    ) -> Result<HashMap<String, String>, RemoteError>;

    /// Open the object behind a presigned GET url.
    fn get(&self, url: &str) -> Result<Box<dyn Read + Send>, RemoteError>;

    /// Upload `len` bytes to a presigned PUT url; returns the new object version.
    fn put(&self, url: &str, body: &mut dyn Read, len: u64) -> Result<String, RemoteError>;
}
