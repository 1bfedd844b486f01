//! Checksum indexer: walk a dataset folder and hash every regular file.
//!
//! Reserved top-level folders (`.dataset_metadata/`, `.dataset_stash/`) are
//! never indexed. Symlinks are not followed. Hashes depend on content only.

use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use gantry_core::layout::RESERVED_DIRS;

use crate::error::{io_err, SyncError};

/// Relative `/`-separated path → lowercase hex SHA-256, sorted by path.
pub type ChecksumIndex = BTreeMap<String, String>;

/// Stream `path` through SHA-256.
pub fn hash_file(path: &Path) -> Result<String, SyncError> {
    let mut file = File::open(path).map_err(|e| io_err(path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| io_err(path, e))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Index every regular file under `root`. Any unreadable entry aborts the walk.
///
/// A missing `root` yields an empty index.
pub fn index_workspace(root: &Path) -> Result<ChecksumIndex, SyncError> {
    let mut index = ChecksumIndex::new();
    if !root.exists() {
        return Ok(index);
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| {
            !(entry.depth() == 1
                && entry.file_type().is_dir()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| RESERVED_DIRS.contains(&name)))
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            io_err(path, e.into())
        })?;
        if entry.path_is_symlink() {
            tracing::debug!("skipping symlink {}", entry.path().display());
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = relative_key(root, entry.path())?;
        index.insert(relative, hash_file(entry.path())?);
    }

    tracing::debug!("indexed {} files under {}", index.len(), root.display());
    Ok(index)
}

/// `root/a/b.csv` → `a/b.csv`. Non-UTF-8 names are refused rather than
/// rewritten, since the key must map back to the same file.
pub fn relative_key(root: &Path, path: &Path) -> Result<String, SyncError> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| {
            SyncError::InvalidArgument(format!(
                "file name is not valid UTF-8: {}",
                path.display()
            ))
        })?;
    Ok(parts.join("/"))
}
