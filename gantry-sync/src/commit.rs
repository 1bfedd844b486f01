//! Commit manager: the server's commit log plus the local HEAD file.

use std::fs;
use std::sync::Arc;

use uuid::Uuid;

use gantry_core::layout::DatasetLayout;
use gantry_core::types::{Commit, DatasetInfo, DatasetName, NewCommit};

use crate::error::{io_err, RemoteError, SyncError};
use crate::remote::CommitLog;

/// Substring of the server's 400 body when the parent is not the latest commit.
pub const PARENT_OUT_OF_DATE: &str = "Parent version out of date";

pub struct CommitManager {
    log: Arc<dyn CommitLog>,
    dataset: DatasetInfo,
}

impl CommitManager {
    pub fn new(log: Arc<dyn CommitLog>, dataset: DatasetInfo) -> Self {
        Self { log, dataset }
    }

    /// Newest first.
    pub fn list_commits(&self) -> Result<Vec<Commit>, SyncError> {
        Ok(self.log.list_commits(self.dataset.id)?)
    }

    pub fn latest_commit(&self) -> Result<Commit, SyncError> {
        self.list_commits()?
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::NoCommits {
                name: self.dataset.name.0.clone(),
            })
    }

    pub fn get_commit(&self, id: Uuid) -> Result<Commit, SyncError> {
        match self.log.get_commit(self.dataset.id, id) {
            Ok(commit) => Ok(commit),
            Err(e) if e.status() == Some(404) => Err(SyncError::CommitNotFound { id }),
            Err(e) => Err(e.into()),
        }
    }

    pub fn create_commit(&self, commit: &NewCommit) -> Result<Commit, SyncError> {
        match self.log.create_commit(self.dataset.id, commit) {
            Ok(created) => {
                tracing::info!("created commit {} ({})", created.id, created.message);
                Ok(created)
            }
            Err(RemoteError::Status { status: 400, body }) if body.contains(PARENT_OUT_OF_DATE) => {
                let latest = self
                    .latest_commit()
                    .map(|c| c.id.to_string())
                    .unwrap_or_else(|_| "unknown".to_string());
                Err(SyncError::HeadOutOfDate {
                    head: commit.parent_commit_id.to_string(),
                    latest,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the latest commit when `head` is it.
    pub fn ensure_head_current(&self, head: &Commit) -> Result<Commit, SyncError> {
        let latest = self.latest_commit()?;
        if latest.id != head.id {
            return Err(SyncError::HeadOutOfDate {
                head: head.id.to_string(),
                latest: latest.id.to_string(),
            });
        }
        Ok(latest)
    }
}

// ---------------------------------------------------------------------------
// HEAD file
// ---------------------------------------------------------------------------

pub fn head_exists(layout: &DatasetLayout) -> bool {
    layout.head().is_file()
}

/// Missing HEAD → `DatasetNotFound`.
pub fn read_head(layout: &DatasetLayout, dataset: &DatasetName) -> Result<Commit, SyncError> {
    let path = layout.head();
    if !path.is_file() {
        return Err(SyncError::DatasetNotFound {
            name: dataset.0.clone(),
            path,
        });
    }
    let contents = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Atomic: `HEAD.tmp` then rename.
pub fn write_head(layout: &DatasetLayout, commit: &Commit) -> Result<(), SyncError> {
    let dir = layout.metadata_dir();
    fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
    let path = layout.head();
    let tmp = path.with_file_name("HEAD.tmp");
    let json = serde_json::to_string_pretty(commit)?;
    fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, &path) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    tracing::debug!("HEAD -> {}", commit.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryRemote;
    use tempfile::TempDir;

    fn manager() -> (Arc<MemoryRemote>, CommitManager) {
        let remote = Arc::new(MemoryRemote::new("bucket"));
        let info = remote.create_dataset("ds");
        let manager = CommitManager::new(remote.clone(), info);
        (remote, manager)
    }

    #[test]
    fn unknown_commit_maps_to_not_found() {
        let (_remote, manager) = manager();
        let id = Uuid::new_v4();
        assert!(matches!(
            manager.get_commit(id),
            Err(SyncError::CommitNotFound { id: got }) if got == id
        ));
    }

    #[test]
    fn stale_parent_maps_to_head_out_of_date() {
        let (_remote, manager) = manager();
        let latest = manager.latest_commit().unwrap();
        let err = manager
            .create_commit(&NewCommit {
                message: "x".into(),
                metadata_s3_file_version: latest.metadata_s3_file_version.clone(),
                parent_commit_id: Uuid::new_v4(),
                commit_id: None,
            })
            .unwrap_err();
        match err {
            SyncError::HeadOutOfDate { latest: reported, .. } => {
                assert_eq!(reported, latest.id.to_string())
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn head_roundtrips_and_tmp_is_gone() {
        let (_remote, manager) = manager();
        let dir = TempDir::new().unwrap();
        let layout = DatasetLayout::at(dir.path());
        let name = DatasetName::from("ds");
        assert!(matches!(
            read_head(&layout, &name),
            Err(SyncError::DatasetNotFound { .. })
        ));

        let latest = manager.latest_commit().unwrap();
        write_head(&layout, &latest).unwrap();
        assert!(head_exists(&layout));
        assert_eq!(read_head(&layout, &name).unwrap(), latest);
        assert!(!layout.head().with_file_name("HEAD.tmp").exists());
        manager.ensure_head_current(&latest).unwrap();
    }
}
