//! Stash manager: park uncommitted changes and bring them back.
//!
//! The descriptor (`.dataset_metadata/stash.json`) is the public diff at
//! stash time. New and modified files are moved under `.dataset_stash/`
//! keeping their relative paths. At most one stash exists.

use std::fs;
use std::path::Path;

use gantry_core::types::DiffSummary;

use crate::error::{io_err, SyncError};
use crate::workspace::{remove_file_if_present, Workspace};

pub struct StashManager<'a> {
    workspace: &'a Workspace,
}

impl<'a> StashManager<'a> {
    pub fn new(workspace: &'a Workspace) -> Self {
        Self { workspace }
    }

    /// Move local changes aside and resync the tree to the manifest.
    ///
    /// A clean tree is a no-op: any existing stash is left untouched.
    pub fn stash(&self) -> Result<DiffSummary, SyncError> {
        let layout = &self.workspace.layout;
        let manifest = self.workspace.manifests.load()?;
        let summary = self.workspace.local_diff(&manifest)?.summary();
        if summary.is_empty() {
            tracing::warn!("No local changes to stash");
            return Ok(summary);
        }

        if let Some(previous) = self.read_descriptor()? {
            for path in previous.modified_files.iter().chain(&previous.new_files) {
                remove_file_if_present(&layout.stashed(path)?)?;
            }
            tracing::debug!("dropped previous stash of {} files", previous.total());
        }
        self.write_descriptor(&summary)?;

        for path in summary.modified_files.iter().chain(&summary.new_files) {
            move_file(&layout.file(path)?, &layout.stashed(path)?)?;
        }

        self.workspace.resync(&manifest)?;
        tracing::info!("stashed {} changes", summary.total());
        Ok(summary)
    }

    /// Re-apply the stash. Returns `None` when there is nothing to restore.
    pub fn restore(&self) -> Result<Option<DiffSummary>, SyncError> {
        let Some(summary) = self.read_descriptor()? else {
            tracing::warn!("No stashed files were found!");
            return Ok(None);
        };

        let layout = &self.workspace.layout;
        for path in summary.modified_files.iter().chain(&summary.new_files) {
            move_file(&layout.stashed(path)?, &layout.file(path)?)?;
        }
        for path in &summary.deleted_files {
            remove_file_if_present(&layout.file(path)?)?;
        }

        let descriptor = layout.stash_descriptor();
        fs::remove_file(&descriptor).map_err(|e| io_err(&descriptor, e))?;
        tracing::info!("restored {} changes", summary.total());
        Ok(Some(summary))
    }

    fn read_descriptor(&self) -> Result<Option<DiffSummary>, SyncError> {
        let path = self.workspace.layout.stash_descriptor();
        if !path.is_file() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn write_descriptor(&self, summary: &DiffSummary) -> Result<(), SyncError> {
        let path = self.workspace.layout.stash_descriptor();
        let tmp = path.with_file_name("stash.json.tmp");
        fs::write(&tmp, serde_json::to_string(summary)?).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(&path, e));
        }
        Ok(())
    }
}

fn move_file(from: &Path, to: &Path) -> Result<(), SyncError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    fs::rename(from, to).map_err(|e| io_err(from, e))
}
