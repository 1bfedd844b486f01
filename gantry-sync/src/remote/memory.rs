//! In-memory implementation of both remote traits.
//!
//! Behaves like the dataset API for everything the sync engine relies on:
//! versioned objects, newest-first commit lists, parent validation on commit
//! and soft delete. All data is lost when the remote is dropped.
//! Thread-safe via RwLock.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{SubsecRound, Utc};
use uuid::Uuid;

use gantry_core::layout::MANIFEST_FILE;
use gantry_core::locator::ObjectLocator;
use gantry_core::types::{Commit, DatasetInfo, DatasetName, NewCommit, DEFAULT_S3_PREFIX};

use super::{CommitLog, ObjectRef, ObjectStore};
use crate::error::RemoteError;

const SCHEME: &str = "memory://";
const VERSION_PARAM: &str = "?versionId=";
pub const PARENT_OUT_OF_DATE: &str =
    r#"Details: {"error":"Parent version out of date!","response":"error"}"#;

pub struct MemoryRemote {
    bucket: String,
    inner: RwLock<MemoryRemoteInner>,
}

#[derive(Default)]
struct MemoryRemoteInner {
    datasets: Vec<StoredDataset>,

    /// Object key -> versions, oldest first.
    objects: HashMap<String, Vec<StoredObject>>,

    next_version: u64,

    /// Uploads to keys containing any of these fail with HTTP 500.
    failing_uploads: Vec<String>,

    /// Downloads of keys containing any of these fail with HTTP 500.
    failing_downloads: Vec<String>,
}

struct StoredDataset {
    info: DatasetInfo,
    /// Oldest first.
    commits: Vec<Commit>,
}

struct StoredObject {
    version_id: String,
    bytes: Vec<u8>,
}

impl MemoryRemoteInner {
    fn dataset_by_id(&self, id: Uuid) -> Result<&StoredDataset, RemoteError> {
        self.datasets
            .iter()
            .find(|d| d.info.id == id)
            .ok_or_else(|| not_found(format!("dataset {id}")))
    }

    fn dataset_by_id_mut(&mut self, id: Uuid) -> Result<&mut StoredDataset, RemoteError> {
        self.datasets
            .iter_mut()
            .find(|d| d.info.id == id)
            .ok_or_else(|| not_found(format!("dataset {id}")))
    }

    fn store(&mut self, key: &str, bytes: Vec<u8>) -> String {
        self.next_version += 1;
        let version_id = format!("v{:06}", self.next_version);
        self.objects
            .entry(key.to_string())
            .or_default()
            .push(StoredObject {
                version_id: version_id.clone(),
                bytes,
            });
        version_id
    }

    fn has_version(&self, key: &str, version_id: &str) -> bool {
        self.objects
            .get(key)
            .is_some_and(|versions| versions.iter().any(|o| o.version_id == version_id))
    }
}

fn not_found(what: String) -> RemoteError {
    RemoteError::Status {
        status: 404,
        body: format!(r#"{{"error":"{what} not found","response":"error"}}"#),
    }
}

fn bad_request(body: impl Into<String>) -> RemoteError {
    RemoteError::Status {
        status: 400,
        body: body.into(),
    }
}

fn injected(key: &str) -> RemoteError {
    RemoteError::Status {
        status: 500,
        body: format!("injected failure for '{key}'"),
    }
}

impl MemoryRemote {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            inner: RwLock::new(MemoryRemoteInner::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryRemoteInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryRemoteInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a dataset with an initial commit over an empty manifest.
    pub fn create_dataset(&self, name: impl Into<DatasetName>) -> DatasetInfo {
        let info = DatasetInfo {
            id: Uuid::new_v4(),
            name: name.into(),
            bucket_name: self.bucket.clone(),
            s3_prefix: DEFAULT_S3_PREFIX.to_string(),
            aws_region: None,
            disabled: false,
        };
        let manifest_key = ObjectLocator::for_dataset(&info).key(MANIFEST_FILE, None);

        let mut inner = self.write();
        let version = inner.store(&manifest_key, Vec::new());
        let initial = Commit {
            id: Uuid::new_v4(),
            parent_commit_id: None,
            message: "initial dataset commit".to_string(),
            metadata_s3_file_version: version,
            created_at: Utc::now().trunc_subsecs(0),
            created_by: "memory".to_string(),
            is_latest_commit: true,
            dataset_id: Some(info.id),
        };
        inner.datasets.push(StoredDataset {
            info: info.clone(),
            commits: vec![initial],
        });
        info
    }

    /// Make every upload whose key contains `pattern` fail.
    pub fn fail_uploads_matching(&self, pattern: impl Into<String>) {
        self.write().failing_uploads.push(pattern.into());
    }

    /// Make every download whose key contains `pattern` fail.
    pub fn fail_downloads_matching(&self, pattern: impl Into<String>) {
        self.write().failing_downloads.push(pattern.into());
    }

    pub fn clear_failures(&self) {
        let mut inner = self.write();
        inner.failing_uploads.clear();
        inner.failing_downloads.clear();
    }

    /// Store bytes directly, bypassing presigning. Returns the version id.
    pub fn put_object(&self, key: &str, bytes: impl Into<Vec<u8>>) -> String {
        self.write().store(key, bytes.into())
    }

    /// Latest bytes stored under `key`.
    pub fn latest_object(&self, key: &str) -> Option<Vec<u8>> {
        self.read()
            .objects
            .get(key)
            .and_then(|versions| versions.last())
            .map(|o| o.bytes.clone())
    }

    /// Total number of stored object versions.
    pub fn object_versions(&self) -> usize {
        self.read().objects.values().map(Vec::len).sum()
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new("memory-bucket")
    }
}

impl CommitLog for MemoryRemote {
    fn dataset(&self, name: &DatasetName) -> Result<DatasetInfo, RemoteError> {
        self.read()
            .datasets
            .iter()
            .find(|d| &d.info.name == name)
            .map(|d| d.info.clone())
            .ok_or_else(|| not_found(format!("dataset {name}")))
    }

    fn list_commits(&self, dataset_id: Uuid) -> Result<Vec<Commit>, RemoteError> {
        let inner = self.read();
        let dataset = inner.dataset_by_id(dataset_id)?;
        Ok(dataset.commits.iter().rev().cloned().collect())
    }

    fn get_commit(&self, dataset_id: Uuid, commit_id: Uuid) -> Result<Commit, RemoteError> {
        let inner = self.read();
        inner
            .dataset_by_id(dataset_id)?
            .commits
            .iter()
            .find(|c| c.id == commit_id)
            .cloned()
            .ok_or_else(|| not_found(format!("commit {commit_id}")))
    }

    fn create_commit(&self, dataset_id: Uuid, commit: &NewCommit) -> Result<Commit, RemoteError> {
        let mut inner = self.write();
        let info = inner.dataset_by_id(dataset_id)?.info.clone();
        let manifest_key = ObjectLocator::for_dataset(&info).key(MANIFEST_FILE, None);
        if !inner.has_version(&manifest_key, &commit.metadata_s3_file_version) {
            return Err(bad_request(format!(
                r#"{{"error":"Manifest version {} not found","response":"error"}}"#,
                commit.metadata_s3_file_version
            )));
        }

        let dataset = inner.dataset_by_id_mut(dataset_id)?;
        let latest = dataset.commits.last().map(|c| c.id);
        if latest != Some(commit.parent_commit_id) {
            return Err(bad_request(PARENT_OUT_OF_DATE));
        }
        let id = commit.commit_id.unwrap_or_else(Uuid::new_v4);
        if dataset.commits.iter().any(|c| c.id == id) {
            return Err(bad_request(format!(
                r#"{{"error":"Commit {id} already exists","response":"error"}}"#
            )));
        }

        for previous in dataset.commits.iter_mut() {
            previous.is_latest_commit = false;
        }
        let created = Commit {
            id,
            parent_commit_id: Some(commit.parent_commit_id),
            message: commit.message.clone(),
            metadata_s3_file_version: commit.metadata_s3_file_version.clone(),
            created_at: Utc::now().trunc_subsecs(0),
            created_by: "memory".to_string(),
            is_latest_commit: true,
            dataset_id: Some(dataset_id),
        };
        dataset.commits.push(created.clone());
        Ok(created)
    }

    fn disable_dataset(&self, dataset_id: Uuid) -> Result<(), RemoteError> {
        self.write().dataset_by_id_mut(dataset_id)?.info.disabled = true;
        Ok(())
    }
}

impl ObjectStore for MemoryRemote {
    fn presign_get(
        &self,
        dataset_id: Uuid,
        objects: &[ObjectRef],
        _expiration_secs: u64,
    ) -> Result<HashMap<String, String>, RemoteError> {
        self.read().dataset_by_id(dataset_id)?;
        Ok(objects
            .iter()
            .map(|o| {
                let url = format!("{SCHEME}{}{VERSION_PARAM}{}", o.key, o.version_id);
                (o.key.clone(), url)
            })
            .collect())
    }

    fn presign_put(
        &self,
        dataset_id: Uuid,
        keys: &[String],
    ) -> Result<HashMap<String, String>, RemoteError> {
        self.read().dataset_by_id(dataset_id)?;
        Ok(keys
            .iter()
            .map(|key| (key.clone(), format!("{SCHEME}{key}")))
            .collect())
    }

    fn get(&self, url: &str) -> Result<Box<dyn Read + Send>, RemoteError> {
        let rest = url
            .strip_prefix(SCHEME)
            .ok_or_else(|| RemoteError::Transport(format!("unsupported url '{url}'")))?;
        let (key, version_id) = rest
            .split_once(VERSION_PARAM)
            .ok_or_else(|| bad_request(format!("missing version in '{url}'")))?;

        let inner = self.read();
        if inner.failing_downloads.iter().any(|p| key.contains(p.as_str())) {
            return Err(injected(key));
        }
        let bytes = inner
            .objects
            .get(key)
            .and_then(|versions| versions.iter().find(|o| o.version_id == version_id))
            .map(|o| o.bytes.clone())
            .ok_or_else(|| not_found(format!("object {key}@{version_id}")))?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn put(&self, url: &str, body: &mut dyn Read, len: u64) -> Result<String, RemoteError> {
        let key = url
            .strip_prefix(SCHEME)
            .ok_or_else(|| RemoteError::Transport(format!("unsupported url '{url}'")))?;
        if self.read().failing_uploads.iter().any(|p| key.contains(p.as_str())) {
            return Err(injected(key));
        }
        let mut bytes = Vec::with_capacity(usize::try_from(len).unwrap_or_default());
        body.read_to_end(&mut bytes)
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(self.write().store(key, bytes))
    }
}
