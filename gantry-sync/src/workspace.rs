//! One dataset folder plus the machinery to bring it in line with a manifest.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use gantry_core::layout::DatasetLayout;
use gantry_core::locator::{object_key, ObjectLocator};
use gantry_core::types::{DatasetName, FileRecord};

use crate::checksum;
use crate::diff::{self, LocalDiff, SyncDiff};
use crate::error::{io_err, SyncError};
use crate::manifest::{Manifest, ManifestStore};
use crate::transfer::{Download, TransferEngine};

pub struct Workspace {
    pub(crate) name: DatasetName,
    pub(crate) layout: DatasetLayout,
    pub(crate) locator: ObjectLocator,
    pub(crate) manifests: ManifestStore,
    pub(crate) transfer: TransferEngine,
}

impl Workspace {
    pub fn new(
        name: DatasetName,
        layout: DatasetLayout,
        locator: ObjectLocator,
        transfer: TransferEngine,
    ) -> Self {
        let manifests = ManifestStore::new(layout.clone(), name.clone());
        Self {
            name,
            layout,
            locator,
            manifests,
            transfer,
        }
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    /// Hash the tree and compare it with `manifest`.
    pub fn local_diff(&self, manifest: &Manifest) -> Result<LocalDiff, SyncError> {
        let index = checksum::index_workspace(self.layout.root())?;
        Ok(diff::compare(&index, manifest))
    }

    /// Overwrite modified files, restore missing ones and delete untracked
    /// ones so the tree matches `manifest` exactly.
    pub fn resync(&self, manifest: &Manifest) -> Result<SyncDiff, SyncError> {
        let sync = self.local_diff(manifest)?.for_sync(manifest);
        let downloads = sync
            .downloads()
            .map(|record| self.download_for(record))
            .collect::<Result<Vec<_>, _>>()?;
        self.transfer.download(&downloads)?;

        for path in &sync.new {
            remove_file_if_present(&self.layout.file(path)?)?;
        }
        if !sync.is_empty() {
            tracing::info!(
                "{}: restored {} files, removed {} untracked",
                self.name,
                downloads.len(),
                sync.new.len()
            );
        }
        Ok(sync)
    }

    pub fn download_for(&self, record: &FileRecord) -> Result<Download, SyncError> {
        Ok(Download {
            key: object_key(record.url())?.to_string(),
            version_id: record.version_id().to_string(),
            dest: self.layout.file(record.file_name())?,
        })
    }
}

pub(crate) fn remove_file_if_present(path: &Path) -> Result<(), SyncError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_err(path, e)),
    }
}
