//! `GantryDataset`: the sync orchestrator.
//!
//! Every public operation starts with explicit guard calls, then drives the
//! diff engine, transfer engine and commit manager in a fixed order. The
//! manifest/HEAD swap is the local commit point.
//!
//! ## `push_version` state machine
//!
//! ```text
//! diff -> (empty: no-op) -> HEAD verified -> files uploaded
//!      -> manifest backed up -> manifest replaced -> manifest uploaded
//!      -> commit -> accepted:  HEAD advances, backup discarded
//!                   rejected:  manifest recovered, HEAD unchanged
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

use gantry_core::config::SyncConfig;
use gantry_core::layout::{DatasetLayout, MANIFEST_FILE};
use gantry_core::locator::{object_key, ObjectLocator};
use gantry_core::types::{Commit, DatasetInfo, DatasetName, DiffSummary, NewCommit, VersionInfo};

use crate::commit::{self, CommitManager};
use crate::error::{io_err, RemoteError, SyncError};
use crate::manifest::{Manifest, ManifestDelta};
use crate::remote::{CommitLog, ObjectStore};
use crate::stash::StashManager;
use crate::transfer::{Download, TransferEngine, Upload};
use crate::workspace::{remove_file_if_present, Workspace};

pub struct GantryDataset {
    info: DatasetInfo,
    log: Arc<dyn CommitLog>,
    commits: CommitManager,
    workspace: Workspace,
}

impl GantryDataset {
    /// The dataset folder is `<workspace_dir>/<dataset name>/`.
    pub fn new(
        info: DatasetInfo,
        workspace_dir: &Path,
        config: SyncConfig,
        log: Arc<dyn CommitLog>,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self, SyncError> {
        let layout = DatasetLayout::new(workspace_dir, &info.name);
        let locator = ObjectLocator::for_dataset(&info);
        let transfer = TransferEngine::new(store, info.id, config, layout.metadata_dir())?;
        let workspace = Workspace::new(info.name.clone(), layout, locator, transfer);
        let commits = CommitManager::new(log.clone(), info.clone());
        Ok(Self {
            info,
            log,
            commits,
            workspace,
        })
    }

    /// Look the dataset up by name, then [`GantryDataset::new`].
    pub fn open(
        name: &DatasetName,
        workspace_dir: &Path,
        config: SyncConfig,
        log: Arc<dyn CommitLog>,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self, SyncError> {
        let info = log.dataset(name)?;
        Self::new(info, workspace_dir, config, log, store)
    }

    pub fn name(&self) -> &DatasetName {
        &self.info.name
    }

    pub fn info(&self) -> &DatasetInfo {
        &self.info
    }

    pub fn root(&self) -> &Path {
        self.workspace.root()
    }

    // -----------------------------------------------------------------------
    // Guards
    // -----------------------------------------------------------------------

    fn ensure_not_deleted(&self) -> Result<(), SyncError> {
        if self.log.dataset(&self.info.name)?.disabled {
            return Err(SyncError::DatasetDeleted {
                name: self.info.name.0.clone(),
            });
        }
        Ok(())
    }

    fn ensure_exists_locally(&self) -> Result<(), SyncError> {
        if !self.workspace.manifests.exists() {
            return Err(SyncError::DatasetNotFound {
                name: self.info.name.0.clone(),
                path: self.workspace.manifests.path(),
            });
        }
        Ok(())
    }

    /// True when uncommitted changes must stop the caller.
    fn local_changes_block(&self, forced: bool) -> Result<bool, SyncError> {
        if forced
            || !commit::head_exists(&self.workspace.layout)
            || !self.workspace.manifests.exists()
        {
            return Ok(false);
        }
        let manifest = self.workspace.manifests.load()?;
        if self.workspace.local_diff(&manifest)?.is_empty() {
            return Ok(false);
        }
        tracing::warn!(
            "Local changes detected! Push them with push_version, park them with stash, \
             or discard them with forced=true."
        );
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Pull / rollback
    // -----------------------------------------------------------------------

    /// Sync the workspace to `version_id`, or to the latest commit.
    ///
    /// Returns `None` when uncommitted changes block the pull.
    pub fn pull(
        &self,
        version_id: Option<Uuid>,
        forced: bool,
    ) -> Result<Option<VersionInfo>, SyncError> {
        self.ensure_not_deleted()?;
        if self.local_changes_block(forced)? {
            return Ok(None);
        }
        let target = match version_id {
            Some(id) => self.commits.get_commit(id)?,
            None => self.commits.latest_commit()?,
        };
        self.checkout(&target).map(Some)
    }

    /// Record a new commit pointing at `version_id`'s snapshot, then pull it.
    /// History is never rewritten.
    pub fn rollback(
        &self,
        version_id: Uuid,
        forced: bool,
    ) -> Result<Option<VersionInfo>, SyncError> {
        self.ensure_not_deleted()?;
        self.ensure_exists_locally()?;
        if self.local_changes_block(forced)? {
            return Ok(None);
        }

        let target = self.commits.get_commit(version_id)?;
        let head = self.head()?;
        let created = self.commits.create_commit(&NewCommit {
            message: format!("Rollback dataset to version: {version_id}"),
            metadata_s3_file_version: target.metadata_s3_file_version,
            parent_commit_id: head.id,
            commit_id: None,
        })?;
        self.checkout(&created).map(Some)
    }

    fn checkout(&self, target: &Commit) -> Result<VersionInfo, SyncError> {
        let layout = &self.workspace.layout;
        let metadata_dir = layout.metadata_dir();
        fs::create_dir_all(&metadata_dir).map_err(|e| io_err(&metadata_dir, e))?;

        let staged = self.workspace.manifests.staged_path();
        let manifest_download = Download {
            key: self.workspace.locator.key(MANIFEST_FILE, None),
            version_id: target.metadata_s3_file_version.clone(),
            dest: staged.clone(),
        };
        let synced = self
            .workspace
            .transfer
            .download(std::slice::from_ref(&manifest_download))
            .and_then(|_| Manifest::read(&staged))
            .and_then(|manifest| self.workspace.resync(&manifest));
        if let Err(e) = synced {
            remove_file_if_present(&staged)?;
            return Err(e);
        }

        self.workspace.manifests.install(&staged)?;
        commit::write_head(layout, target)?;
        for dir in [
            layout.stash_dir(),
            layout.tabular_manifests_dir(),
            layout.artifacts_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }

        tracing::info!("{} is at version {}", self.info.name, target.id);
        Ok(VersionInfo::from_commit(target, &self.info.name))
    }

    // -----------------------------------------------------------------------
    // Push
    // -----------------------------------------------------------------------

    /// Commit every local change as a new version.
    pub fn push_version(&self, message: &str) -> Result<VersionInfo, SyncError> {
        self.ensure_exists_locally()?;
        self.ensure_not_deleted()?;
        if message.trim().is_empty() {
            return Err(SyncError::InvalidArgument(
                "version message must not be empty".to_string(),
            ));
        }

        let manifest = self.workspace.manifests.load()?;
        let local = self.workspace.local_diff(&manifest)?;
        if local.is_empty() {
            tracing::warn!("No local changes to add!");
            return self.current_version();
        }

        let head = self.head()?;
        self.commits.ensure_head_current(&head)?;

        let commit_id = Uuid::new_v4();
        let pending = local.for_commit(&self.workspace.locator, commit_id);
        let changed: Vec<_> = pending
            .new
            .iter()
            .chain(&pending.modified)
            .cloned()
            .collect();
        let uploads = changed
            .iter()
            .map(|file| -> Result<Upload, SyncError> {
                Ok(Upload {
                    key: object_key(&file.url)?.to_string(),
                    source: self.workspace.layout.file(&file.file_name)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let versions = self.workspace.transfer.upload(&uploads)?;

        let mut records = changed
            .into_iter()
            .zip(versions)
            .map(|(file, version)| file.with_version_id(version).into_record())
            .collect::<Result<Vec<_>, _>>()?;
        let modified = records.split_off(pending.new.len());
        let delta = ManifestDelta {
            new: records,
            modified,
            deleted: pending.deleted.into_iter().map(|f| f.file_name).collect(),
        };

        let manifests = &self.workspace.manifests;
        manifests.backup()?;
        let committed = manifests
            .replace(&delta)
            .and_then(|_| self.upload_manifest())
            .and_then(|manifest_version| {
                self.commits.create_commit(&NewCommit {
                    message: message.to_string(),
                    metadata_s3_file_version: manifest_version,
                    parent_commit_id: head.id,
                    commit_id: Some(commit_id),
                })
            });

        match committed {
            Ok(created) => {
                commit::write_head(&self.workspace.layout, &created)?;
                manifests.discard_backup()?;
                Ok(VersionInfo::from_commit(&created, &self.info.name))
            }
            Err(e) => {
                if let Err(recover_err) = manifests.recover() {
                    tracing::error!("could not recover manifest after failed push: {recover_err}");
                }
                Err(e)
            }
        }
    }

    fn upload_manifest(&self) -> Result<String, SyncError> {
        let key = self.workspace.locator.key(MANIFEST_FILE, None);
        let upload = Upload {
            key: key.clone(),
            source: self.workspace.manifests.path(),
        };
        self.workspace
            .transfer
            .upload(&[upload])?
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::MissingVersionId { key }.into())
    }

    // -----------------------------------------------------------------------
    // Local state
    // -----------------------------------------------------------------------

    /// Path lists of uncommitted changes.
    pub fn get_diff(&self) -> Result<DiffSummary, SyncError> {
        self.ensure_exists_locally()?;
        let manifest = self.workspace.manifests.load()?;
        Ok(self.workspace.local_diff(&manifest)?.summary())
    }

    /// Park local changes and reset the tree to HEAD.
    pub fn stash(&self) -> Result<DiffSummary, SyncError> {
        self.ensure_exists_locally()?;
        StashManager::new(&self.workspace).stash()
    }

    /// Bring back the stashed changes. `None` when nothing was stashed.
    pub fn restore(&self) -> Result<Option<DiffSummary>, SyncError> {
        self.ensure_exists_locally()?;
        StashManager::new(&self.workspace).restore()
    }

    pub fn head(&self) -> Result<Commit, SyncError> {
        commit::read_head(&self.workspace.layout, &self.info.name)
    }

    pub fn current_version(&self) -> Result<VersionInfo, SyncError> {
        Ok(VersionInfo::from_commit(&self.head()?, &self.info.name))
    }

    // -----------------------------------------------------------------------
    // Server-side
    // -----------------------------------------------------------------------

    /// Newest first.
    pub fn list_versions(&self) -> Result<Vec<VersionInfo>, SyncError> {
        Ok(self
            .commits
            .list_commits()?
            .iter()
            .map(|c| VersionInfo::from_commit(c, &self.info.name))
            .collect())
    }

    /// Soft-delete the dataset on the server. Local files are left alone.
    pub fn delete(&self) -> Result<(), SyncError> {
        self.log.disable_dataset(self.info.id)?;
        tracing::info!("dataset {} deleted", self.info.name);
        Ok(())
    }
}
