//! Transfer engine: batched presigning plus bounded-pool byte transfers.
//!
//! Inputs are split into batches of `batch_size`. Each batch costs one
//! presign call; its transfers then run on a rayon pool of `batch_size`
//! workers. Every transfer runs to completion. Failures are logged and
//! counted, and the first one is reported as [`SyncError::Transfer`].
//!
//! Downloads are streamed into `<scratch_dir>/<uuid>.part` and renamed onto
//! their destination, so an interrupted transfer never leaves a partial file
//! inside the tracked tree.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use uuid::Uuid;

use gantry_core::config::SyncConfig;

use crate::error::{io_err, Direction, SyncError};
use crate::remote::{ObjectRef, ObjectStore};

/// A local file to store under `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub key: String,
    pub source: PathBuf,
}

/// A stored object version to write to `dest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub key: String,
    pub version_id: String,
    pub dest: PathBuf,
}

pub struct TransferEngine {
    store: Arc<dyn ObjectStore>,
    dataset_id: Uuid,
    batch_size: usize,
    expiration_secs: u64,
    scratch_dir: PathBuf,
    pool: rayon::ThreadPool,
}

impl TransferEngine {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        dataset_id: Uuid,
        config: SyncConfig,
        scratch_dir: impl Into<PathBuf>,
    ) -> Result<Self, SyncError> {
        let batch_size = config.batch_size.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(batch_size)
            .thread_name(|i| format!("gantry-transfer-{i}"))
            .build()?;
        Ok(Self {
            store,
            dataset_id,
            batch_size,
            expiration_secs: config.presign_expiration_secs,
            scratch_dir: scratch_dir.into(),
            pool,
        })
    }

    /// Upload every file; returns object versions in input order.
    pub fn upload(&self, uploads: &[Upload]) -> Result<Vec<String>, SyncError> {
        if uploads.is_empty() {
            tracing::info!("no files to upload");
            return Ok(Vec::new());
        }

        let mut versions = Vec::with_capacity(uploads.len());
        let mut failures = Vec::new();
        for batch in uploads.chunks(self.batch_size) {
            let keys: Vec<String> = batch.iter().map(|u| u.key.clone()).collect();
            let urls = self.store.presign_put(self.dataset_id, &keys)?;
            let results: Vec<Result<String, SyncError>> = self
                .pool
                .install(|| batch.par_iter().map(|u| self.upload_one(u, &urls)).collect());

            for (upload, result) in batch.iter().zip(results) {
                match result {
                    Ok(version) => versions.push(version),
                    Err(e) => {
                        tracing::error!("upload of {} failed: {e}", upload.source.display());
                        failures.push(e);
                    }
                }
            }
        }

        report(Direction::Upload, failures, uploads.len())?;
        tracing::info!("uploaded {} files", uploads.len());
        Ok(versions)
    }

    /// Download every object to its destination.
    pub fn download(&self, downloads: &[Download]) -> Result<(), SyncError> {
        if downloads.is_empty() {
            tracing::info!("no files to download");
            return Ok(());
        }

        let mut failures = Vec::new();
        for batch in downloads.chunks(self.batch_size) {
            let objects: Vec<ObjectRef> = batch
                .iter()
                .map(|d| ObjectRef {
                    key: d.key.clone(),
                    version_id: d.version_id.clone(),
                })
                .collect();
            let urls = self
                .store
                .presign_get(self.dataset_id, &objects, self.expiration_secs)?;
            let results: Vec<Result<(), SyncError>> = self
                .pool
                .install(|| batch.par_iter().map(|d| self.download_one(d, &urls)).collect());

            for (download, result) in batch.iter().zip(results) {
                if let Err(e) = result {
                    tracing::error!("download of {} failed: {e}", download.key);
                    failures.push(e);
                }
            }
        }

        report(Direction::Download, failures, downloads.len())?;
        tracing::info!("downloaded {} files", downloads.len());
        Ok(())
    }

    fn upload_one(
        &self,
        upload: &Upload,
        urls: &HashMap<String, String>,
    ) -> Result<String, SyncError> {
        let url = presigned(urls, &upload.key)?;
        let mut file = File::open(&upload.source).map_err(|e| io_err(&upload.source, e))?;
        let len = file
            .metadata()
            .map_err(|e| io_err(&upload.source, e))?
            .len();
        let version = self.store.put(url, &mut file, len)?;
        tracing::debug!("uploaded {} as {}@{version}", upload.source.display(), upload.key);
        Ok(version)
    }

    fn download_one(
        &self,
        download: &Download,
        urls: &HashMap<String, String>,
    ) -> Result<(), SyncError> {
        let url = presigned(urls, &download.key)?;
        let mut body = self.store.get(url)?;

        let dest = &download.dest;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        fs::create_dir_all(&self.scratch_dir).map_err(|e| io_err(&self.scratch_dir, e))?;
        let part = part_path(&self.scratch_dir);
        let written = File::create(&part)
            .and_then(|mut file| io::copy(&mut body, &mut file))
            .map_err(|e| io_err(&part, e))
            .and_then(|_| fs::rename(&part, dest).map_err(|e| io_err(dest, e)));
        if let Err(e) = written {
            let _ = fs::remove_file(&part);
            return Err(e);
        }
        tracing::debug!("downloaded {}@{} to {}", download.key, download.version_id, dest.display());
        Ok(())
    }
}

fn presigned<'a>(urls: &'a HashMap<String, String>, key: &str) -> Result<&'a str, SyncError> {
    urls.get(key)
        .map(String::as_str)
        .ok_or_else(|| SyncError::MissingPresignedUrl {
            key: key.to_string(),
        })
}

fn part_path(scratch_dir: &Path) -> PathBuf {
    scratch_dir.join(format!("{}.part", Uuid::new_v4()))
}

fn report(direction: Direction, failures: Vec<SyncError>, total: usize) -> Result<(), SyncError> {
    let failed = failures.len();
    match failures.into_iter().next() {
        None => Ok(()),
        Some(first) => Err(SyncError::Transfer {
            direction,
            failed,
            total,
            source: Box::new(first),
        }),
    }
}
