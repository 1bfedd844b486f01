//! Reserved paths inside a local dataset folder.
//!
//! ```text
//! <workspace>/<dataset>/
//!   .dataset_metadata/
//!     .gantry_manifest.jsonl      (current snapshot, NDJSON)
//!     .gantry_manifest.jsonl.new  (staged replacement, transient)
//!     .gantry_manifest.jsonl.bak  (push backup, transient)
//!     HEAD                        (JSON commit)
//!     stash.json                  (JSON diff summary)
//!   .dataset_stash/               (stashed file contents)
//!   tabular_manifests/
//!   artifacts/
//! ```

use std::path::{Component, Path, PathBuf};

use crate::error::RecordError;
use crate::types::DatasetName;

pub const METADATA_DIR: &str = ".dataset_metadata";
pub const STASH_DIR: &str = ".dataset_stash";
pub const TABULAR_MANIFESTS_DIR: &str = "tabular_manifests";
pub const ARTIFACTS_DIR: &str = "artifacts";

pub const MANIFEST_FILE: &str = ".dataset_metadata/.gantry_manifest.jsonl";
pub const HEAD_FILE: &str = ".dataset_metadata/HEAD";
pub const STASH_FILE: &str = ".dataset_metadata/stash.json";

pub const NEW_SUFFIX: &str = ".new";
pub const BACKUP_SUFFIX: &str = ".bak";

/// SHA-256 of the empty byte string.
pub const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Top-level names the indexer and diff never treat as dataset content.
pub const RESERVED_DIRS: [&str; 2] = [METADATA_DIR, STASH_DIR];

/// Path helpers for one dataset folder. Pure; no I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    root: PathBuf,
}

impl DatasetLayout {
    /// `<workspace>/<dataset>/`
    pub fn new(workspace: &Path, dataset: &DatasetName) -> Self {
        Self {
            root: workspace.join(&dataset.0),
        }
    }

    /// Use `root` directly as the dataset folder.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a `/`-separated path relative to the dataset root.
    /// Paths that could leave the root are refused.
    pub fn file(&self, relative: &str) -> Result<PathBuf, RecordError> {
        check_relative(relative)?;
        Ok(join(&self.root, relative))
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join(METADATA_DIR)
    }

    pub fn manifest(&self) -> PathBuf {
        join(&self.root, MANIFEST_FILE)
    }

    pub fn staged_manifest(&self) -> PathBuf {
        join(&self.root, &format!("{MANIFEST_FILE}{NEW_SUFFIX}"))
    }

    pub fn manifest_backup(&self) -> PathBuf {
        join(&self.root, &format!("{MANIFEST_FILE}{BACKUP_SUFFIX}"))
    }

    pub fn head(&self) -> PathBuf {
        join(&self.root, HEAD_FILE)
    }

    pub fn stash_descriptor(&self) -> PathBuf {
        join(&self.root, STASH_FILE)
    }

    pub fn stash_dir(&self) -> PathBuf {
        self.root.join(STASH_DIR)
    }

    /// Where a stashed copy of `relative` lives.
    pub fn stashed(&self, relative: &str) -> Result<PathBuf, RecordError> {
        check_relative(relative)?;
        Ok(join(&self.stash_dir(), relative))
    }

    pub fn tabular_manifests_dir(&self) -> PathBuf {
        self.root.join(TABULAR_MANIFESTS_DIR)
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.root.join(ARTIFACTS_DIR)
    }
}

fn join(base: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|part| !part.is_empty())
        .fold(base.to_path_buf(), |acc, part| acc.join(part))
}

/// Accept only plain `/`-separated relative paths: no root, no `.` or `..`,
/// no drive prefixes or backslashes.
pub fn check_relative(relative: &str) -> Result<(), RecordError> {
    let unsafe_path = |reason: &'static str| RecordError::UnsafePath {
        file_name: relative.to_string(),
        reason,
    };
    if relative.is_empty() {
        return Err(unsafe_path("empty path"));
    }
    if relative.starts_with('/') || relative.starts_with('\\') {
        return Err(unsafe_path("absolute path"));
    }
    for part in relative.split('/').filter(|part| !part.is_empty()) {
        if part == ".." {
            return Err(unsafe_path("parent directory component"));
        }
        if part == "." {
            return Err(unsafe_path("current directory component"));
        }
        let mut components = Path::new(part).components();
        let plain = matches!(components.next(), Some(Component::Normal(_)))
            && components.next().is_none();
        if !plain || part.contains('\\') {
            return Err(unsafe_path("not a plain path component"));
        }
    }
    Ok(())
}

/// True for paths under a reserved top-level directory.
pub fn is_reserved(relative: &str) -> bool {
    let first = relative.split('/').next().unwrap_or_default();
    RESERVED_DIRS.contains(&first)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_rooted_at_dataset() {
        let layout = DatasetLayout::new(Path::new("/ws"), &DatasetName::from("ds"));
        assert!(layout
            .manifest()
            .ends_with("ds/.dataset_metadata/.gantry_manifest.jsonl"));
        assert!(layout
            .staged_manifest()
            .ends_with(".dataset_metadata/.gantry_manifest.jsonl.new"));
        assert!(layout.head().ends_with("ds/.dataset_metadata/HEAD"));
        assert!(layout
            .stashed("a/b.csv")
            .unwrap()
            .ends_with("ds/.dataset_stash/a/b.csv"));
        assert!(layout.file("a/b.csv").unwrap().ends_with("ds/a/b.csv"));
    }

    #[test]
    fn file_refuses_paths_that_leave_the_root() {
        let layout = DatasetLayout::new(Path::new("/ws"), &DatasetName::from("ds"));
        for bad in ["../escaped.txt", "a/../../b", "/etc/passwd", "./a", "", "a\\..\\b"] {
            let err = layout.file(bad).unwrap_err();
            assert!(
                matches!(err, RecordError::UnsafePath { .. }),
                "{bad:?} accepted: {err}"
            );
            assert!(layout.stashed(bad).is_err(), "{bad:?} accepted by stashed");
        }
    }

    #[test]
    fn reserved_matches_first_component_only() {
        assert!(is_reserved(".dataset_metadata/HEAD"));
        assert!(is_reserved(".dataset_stash/a.csv"));
        assert!(!is_reserved("artifacts/.dataset_stash"));
        assert!(!is_reserved(".dataset_metadata_copy/x"));
    }
}
