//! Diff engine: classify workspace paths against a manifest.
//!
//! Whole-file, content-hash based. Three derived shapes serve the three
//! consumers: commits (pending uploads), syncs (what to re-download or remove)
//! and users (path lists).

use uuid::Uuid;

use gantry_core::layout::is_reserved;
use gantry_core::locator::ObjectLocator;
use gantry_core::types::{DiffSummary, FileRecord, PendingFile};

use crate::checksum::ChecksumIndex;
use crate::manifest::Manifest;

/// Result of comparing a [`ChecksumIndex`] with a [`Manifest`].
///
/// `new` and `modified` follow index order (sorted by path); `deleted`
/// follows manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalDiff {
    /// `(path, local sha256)`
    pub new: Vec<(String, String)>,
    /// `(path, local sha256)`
    pub modified: Vec<(String, String)>,
    pub deleted: Vec<String>,
}

/// Pure map comparison; reserved paths on either side are ignored.
pub fn compare(index: &ChecksumIndex, manifest: &Manifest) -> LocalDiff {
    let mut diff = LocalDiff::default();

    for (path, hash) in index.iter().filter(|(p, _)| !is_reserved(p)) {
        match manifest.get(path) {
            None => diff.new.push((path.clone(), hash.clone())),
            Some(record) if record.sha256() != hash => {
                diff.modified.push((path.clone(), hash.clone()))
            }
            Some(_) => {}
        }
    }

    diff.deleted = manifest
        .iter()
        .map(FileRecord::file_name)
        .filter(|name| !is_reserved(name) && !index.contains_key(*name))
        .map(str::to_string)
        .collect();

    diff
}

/// Files to upload and drop for a new commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitDiff {
    pub new: Vec<PendingFile>,
    pub modified: Vec<PendingFile>,
    /// Deletions carry an empty URL.
    pub deleted: Vec<PendingFile>,
}

/// What a sync must do to make the workspace match a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncDiff {
    /// Untracked paths; removed on sync.
    pub new: Vec<String>,
    /// Manifest records to re-download over local edits.
    pub modified: Vec<FileRecord>,
    /// Manifest records missing locally.
    pub deleted: Vec<FileRecord>,
}

impl SyncDiff {
    /// Records that must be downloaded, modified first.
    pub fn downloads(&self) -> impl Iterator<Item = &FileRecord> {
        self.modified.iter().chain(self.deleted.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

impl LocalDiff {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    pub fn for_commit(&self, locator: &ObjectLocator, commit_id: Uuid) -> CommitDiff {
        let pending = |(path, hash): &(String, String)| {
            PendingFile::new(path.clone(), locator.url(path, Some(commit_id))).with_sha256(hash.clone())
        };
        CommitDiff {
            new: self.new.iter().map(pending).collect(),
            modified: self.modified.iter().map(pending).collect(),
            deleted: self
                .deleted
                .iter()
                .map(|path| PendingFile::new(path.clone(), ""))
                .collect(),
        }
    }

    /// Paths in `modified`/`deleted` come from `manifest`, so every lookup hits.
    pub fn for_sync(&self, manifest: &Manifest) -> SyncDiff {
        SyncDiff {
            new: self.new.iter().map(|(path, _)| path.clone()).collect(),
            modified: self
                .modified
                .iter()
                .filter_map(|(path, _)| manifest.get(path).cloned())
                .collect(),
            deleted: self
                .deleted
                .iter()
                .filter_map(|path| manifest.get(path).cloned())
                .collect(),
        }
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            new_files: self.new.iter().map(|(p, _)| p.clone()).collect(),
            modified_files: self.modified.iter().map(|(p, _)| p.clone()).collect(),
            deleted_files: self.deleted.clone(),
        }
    }
}
