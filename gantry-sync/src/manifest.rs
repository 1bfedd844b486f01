//! Manifest store: the NDJSON snapshot of every tracked file.
//!
//! ## `replace` protocol
//!
//! 1. Open the current manifest for streaming reads.
//! 2. Write each line to `<manifest>.new`: unchanged lines verbatim, modified
//!    entries substituted in place, deleted entries dropped.
//! 3. Append new entries in the order given.
//! 4. Flush and `sync_all` the staged file.
//! 5. Rename over the manifest (atomic on POSIX). On failure remove `.new`.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use gantry_core::layout::DatasetLayout;
use gantry_core::types::{DatasetName, FileRecord};

use crate::error::{io_err, SyncError};

// ---------------------------------------------------------------------------
// Manifest (in memory)
// ---------------------------------------------------------------------------

/// Parsed manifest: records in file order plus a by-name index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    records: Vec<FileRecord>,
    by_name: HashMap<String, usize>,
}

impl Manifest {
    /// Build from records, rejecting duplicate names.
    #[cfg(test)]
    pub(crate) fn from_records(records: Vec<FileRecord>) -> Result<Self, SyncError> {
        let mut manifest = Manifest::default();
        for (i, record) in records.into_iter().enumerate() {
            manifest.push(record, Path::new("<memory>"), i + 1)?;
        }
        Ok(manifest)
    }

    /// Parse NDJSON. Blank lines are ignored; `path` is only used in errors.
    pub fn parse(path: &Path, contents: &str) -> Result<Self, SyncError> {
        let mut manifest = Manifest::default();
        for (i, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record = parse_line(path, i + 1, line)?;
            manifest.push(record, path, i + 1)?;
        }
        Ok(manifest)
    }

    pub fn read(path: &Path) -> Result<Self, SyncError> {
        let contents = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        Self::parse(path, &contents)
    }

    fn push(&mut self, record: FileRecord, path: &Path, line: usize) -> Result<(), SyncError> {
        if self.by_name.contains_key(record.file_name()) {
            return Err(SyncError::DuplicateEntry {
                file_name: record.file_name().to_string(),
                path: path.to_path_buf(),
                line,
            });
        }
        self.by_name
            .insert(record.file_name().to_string(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    pub fn get(&self, file_name: &str) -> Option<&FileRecord> {
        self.by_name.get(file_name).map(|&i| &self.records[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.iter()
    }
}

fn parse_line(path: &Path, line: usize, raw: &str) -> Result<FileRecord, SyncError> {
    let record: FileRecord =
        serde_json::from_str(raw).map_err(|source| SyncError::ManifestParse {
            path: path.to_path_buf(),
            line,
            source,
        })?;
    record.validate()?;
    Ok(record)
}

// ---------------------------------------------------------------------------
// Delta
// ---------------------------------------------------------------------------

/// Changes applied by [`ManifestStore::replace`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDelta {
    pub new: Vec<FileRecord>,
    pub modified: Vec<FileRecord>,
    pub deleted: Vec<String>,
}

// ---------------------------------------------------------------------------
// ManifestStore (on disk)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ManifestStore {
    layout: DatasetLayout,
    dataset: DatasetName,
}

impl ManifestStore {
    pub fn new(layout: DatasetLayout, dataset: DatasetName) -> Self {
        Self { layout, dataset }
    }

    pub fn path(&self) -> PathBuf {
        self.layout.manifest()
    }

    pub fn staged_path(&self) -> PathBuf {
        self.layout.staged_manifest()
    }

    pub fn backup_path(&self) -> PathBuf {
        self.layout.manifest_backup()
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    fn not_found(&self) -> SyncError {
        SyncError::DatasetNotFound {
            name: self.dataset.0.clone(),
            path: self.path(),
        }
    }

    /// Load the current manifest. Missing file → `DatasetNotFound`.
    pub fn load(&self) -> Result<Manifest, SyncError> {
        if !self.exists() {
            return Err(self.not_found());
        }
        Manifest::read(&self.path())
    }

    /// Rewrite the manifest with `delta` applied. See the module docs.
    pub fn replace(&self, delta: &ManifestDelta) -> Result<(), SyncError> {
        if !self.exists() {
            return Err(self.not_found());
        }
        let staged = self.staged_path();
        if let Err(e) = self.write_staged(delta, &staged) {
            let _ = fs::remove_file(&staged);
            return Err(e);
        }
        self.install(&staged)?;
        tracing::info!(
            "manifest updated: {} new, {} modified, {} deleted",
            delta.new.len(),
            delta.modified.len(),
            delta.deleted.len()
        );
        Ok(())
    }

    fn write_staged(&self, delta: &ManifestDelta, staged: &Path) -> Result<(), SyncError> {
        let current = self.path();
        let modified: HashMap<&str, &FileRecord> = delta
            .modified
            .iter()
            .map(|r| (r.file_name(), r))
            .collect();
        let deleted: HashSet<&str> = delta.deleted.iter().map(String::as_str).collect();

        let reader = BufReader::new(File::open(&current).map_err(|e| io_err(&current, e))?);
        let file = File::create(staged).map_err(|e| io_err(staged, e))?;
        let mut writer = BufWriter::new(file);
        let mut seen = HashSet::new();
        let mut line_no = 0;

        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| io_err(&current, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let record = parse_line(&current, i + 1, &line)?;
            let name = record.file_name();
            if !seen.insert(name.to_string()) {
                return Err(SyncError::DuplicateEntry {
                    file_name: name.to_string(),
                    path: current.clone(),
                    line: i + 1,
                });
            }
            if deleted.contains(name) {
                continue;
            }
            let out = match modified.get(name) {
                Some(replacement) => replacement.to_jsonl()?,
                None => format!("{line}\n"),
            };
            writer
                .write_all(out.as_bytes())
                .map_err(|e| io_err(staged, e))?;
            line_no += 1;
        }

        for record in &delta.new {
            line_no += 1;
            if !seen.insert(record.file_name().to_string()) {
                return Err(SyncError::DuplicateEntry {
                    file_name: record.file_name().to_string(),
                    path: staged.to_path_buf(),
                    line: line_no,
                });
            }
            writer
                .write_all(record.to_jsonl()?.as_bytes())
                .map_err(|e| io_err(staged, e))?;
        }

        let file = writer
            .into_inner()
            .map_err(|e| io_err(staged, e.into_error()))?;
        file.sync_all().map_err(|e| io_err(staged, e))?;
        Ok(())
    }

    /// Rename `staged` over the manifest. On failure `staged` is removed.
    pub fn install(&self, staged: &Path) -> Result<(), SyncError> {
        let target = self.path();
        let dir = self.layout.metadata_dir();
        fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        if let Err(e) = fs::rename(staged, &target) {
            let _ = fs::remove_file(staged);
            return Err(io_err(&target, e));
        }
        Ok(())
    }

    /// Copy the manifest aside before a remote operation that may fail.
    pub fn backup(&self) -> Result<(), SyncError> {
        let (from, to) = (self.path(), self.backup_path());
        fs::copy(&from, &to).map_err(|e| io_err(&to, e))?;
        tracing::debug!("manifest backed up to {}", to.display());
        Ok(())
    }

    /// Put the backup back over the manifest. No-op when no backup exists.
    pub fn recover(&self) -> Result<(), SyncError> {
        let (from, to) = (self.backup_path(), self.path());
        if !from.exists() {
            return Ok(());
        }
        fs::rename(&from, &to).map_err(|e| io_err(&to, e))?;
        tracing::warn!("manifest recovered from backup");
        Ok(())
    }

    pub fn discard_backup(&self) -> Result<(), SyncError> {
        let path = self.backup_path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(name: &str, version: &str) -> FileRecord {
        FileRecord::new(name, format!("s3://b/p/ds/{name}"), version, "ab12").unwrap()
    }

    fn store_with(dir: &TempDir, contents: &str) -> ManifestStore {
        let layout = DatasetLayout::at(dir.path());
        fs::create_dir_all(layout.metadata_dir()).unwrap();
        fs::write(layout.manifest(), contents).unwrap();
        ManifestStore::new(layout, DatasetName::from("ds"))
    }

    #[test]
    fn missing_manifest_is_dataset_not_found() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::new(DatasetLayout::at(dir.path()), DatasetName::from("ds"));
        assert!(matches!(store.load(), Err(SyncError::DatasetNotFound { .. })));
    }

    #[test]
    fn parse_reports_line_number() {
        let good = record("a", "1").to_jsonl().unwrap();
        let err = Manifest::parse(Path::new("m"), &format!("{good}\nnot json\n")).unwrap_err();
        assert!(
            matches!(err, SyncError::ManifestParse { line: 2, .. }),
            "got: {err}"
        );
    }

    #[test]
    fn parse_rejects_duplicates_and_incomplete_lines() {
        let line = record("a", "1").to_jsonl().unwrap();
        let err = Manifest::parse(Path::new("m"), &format!("{line}{line}")).unwrap_err();
        assert!(matches!(err, SyncError::DuplicateEntry { line: 2, .. }));

        let incomplete = r#"{"file_name":"a","url":"s3://b/k","version_id":"","sha256":"x"}"#;
        let err = Manifest::parse(Path::new("m"), incomplete).unwrap_err();
        assert!(matches!(err, SyncError::Record(_)));
    }

    #[test]
    fn replace_preserves_unchanged_lines_verbatim() {
        let dir = TempDir::new().unwrap();
        // Key order and spacing differ from what to_jsonl would produce.
        let odd = r#"{"sha256": "ab12", "file_name": "keep", "version_id": "1", "url": "s3://b/p/ds/keep"}"#;
        let contents = format!(
            "{}{odd}\n{}",
            record("mod", "1").to_jsonl().unwrap(),
            record("gone", "1").to_jsonl().unwrap()
        );
        let store = store_with(&dir, &contents);

        store
            .replace(&ManifestDelta {
                new: vec![record("fresh", "1")],
                modified: vec![record("mod", "2")],
                deleted: vec!["gone".into()],
            })
            .unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], record("mod", "2").to_jsonl().unwrap().trim_end());
        assert_eq!(lines[1], odd);
        assert_eq!(lines[2], record("fresh", "1").to_jsonl().unwrap().trim_end());
        assert!(!store.staged_path().exists());
    }

    #[test]
    fn replace_refuses_new_entry_that_already_exists() {
        let dir = TempDir::new().unwrap();
        let original = record("a", "1").to_jsonl().unwrap();
        let store = store_with(&dir, &original);
        let err = store
            .replace(&ManifestDelta {
                new: vec![record("a", "2")],
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, SyncError::DuplicateEntry { .. }));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), original);
        assert!(!store.staged_path().exists());
    }

    #[test]
    fn backup_and_recover_restore_exact_bytes() {
        let dir = TempDir::new().unwrap();
        let original = record("a", "1").to_jsonl().unwrap();
        let store = store_with(&dir, &original);

        store.backup().unwrap();
        store
            .replace(&ManifestDelta {
                deleted: vec!["a".into()],
                ..Default::default()
            })
            .unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "");

        store.recover().unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), original);
        assert!(!store.backup_path().exists());
        store.discard_backup().unwrap();
    }
}
