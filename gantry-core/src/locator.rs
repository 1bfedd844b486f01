//! Object-store locations for dataset files.
//!
//! Files live at `s3://<bucket>/<prefix>/<dataset>/[<commit_id>/]<file_name>`.
//! The object key is everything after the bucket.

use uuid::Uuid;

use crate::error::RecordError;
use crate::types::{DatasetInfo, DatasetName};

const SCHEME: &str = "s3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocator {
    bucket: String,
    prefix: String,
    dataset: DatasetName,
}

impl ObjectLocator {
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>, dataset: DatasetName) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into().trim_matches('/').to_string(),
            dataset,
        }
    }

    pub fn for_dataset(info: &DatasetInfo) -> Self {
        Self::new(&info.bucket_name, &info.s3_prefix, info.name.clone())
    }

    /// Object key for `file_name`, optionally namespaced by commit.
    pub fn key(&self, file_name: &str, commit_id: Option<Uuid>) -> String {
        let mut key = String::new();
        if !self.prefix.is_empty() {
            key.push_str(&self.prefix);
            key.push('/');
        }
        key.push_str(&self.dataset.0);
        key.push('/');
        if let Some(commit_id) = commit_id {
            key.push_str(&commit_id.to_string());
            key.push('/');
        }
        key.push_str(file_name);
        key
    }

    pub fn url(&self, file_name: &str, commit_id: Option<Uuid>) -> String {
        format!("{SCHEME}://{}/{}", self.bucket, self.key(file_name, commit_id))
    }
}

/// Split `scheme://bucket/key` into `(bucket, key)`.
pub fn parse_object_url(url: &str) -> Result<(&str, &str), RecordError> {
    let malformed = || RecordError::MalformedUrl {
        url: url.to_string(),
    };
    let (_, rest) = url.split_once("://").ok_or_else(malformed)?;
    let (bucket, key) = rest.split_once('/').ok_or_else(malformed)?;
    if bucket.is_empty() || key.is_empty() {
        return Err(malformed());
    }
    Ok((bucket, key))
}

/// The object key part of an object URL.
pub fn object_key(url: &str) -> Result<&str, RecordError> {
    parse_object_url(url).map(|(_, key)| key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator() -> ObjectLocator {
        ObjectLocator::new("test-bucket", "datasets/v1/", DatasetName::from("ds"))
    }

    #[test]
    fn url_without_commit() {
        assert_eq!(
            locator().url(".dataset_metadata/.gantry_manifest.jsonl", None),
            "s3://test-bucket/datasets/v1/ds/.dataset_metadata/.gantry_manifest.jsonl"
        );
    }

    #[test]
    fn url_with_commit_roundtrips_to_key() {
        let commit = Uuid::new_v4();
        let loc = locator();
        let url = loc.url("artifacts/cat.png", Some(commit));
        assert_eq!(
            object_key(&url).unwrap(),
            format!("datasets/v1/ds/{commit}/artifacts/cat.png")
        );
        assert_eq!(object_key(&url).unwrap(), loc.key("artifacts/cat.png", Some(commit)));
    }

    #[test]
    fn malformed_urls_are_rejected() {
        assert!(parse_object_url("no-scheme/key").is_err());
        assert!(parse_object_url("s3://bucket-only").is_err());
        assert!(parse_object_url("").is_err());
    }
}
