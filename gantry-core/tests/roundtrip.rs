//! Roundtrip serialisation tests for `gantry-core` types.
//!
//! Each `#[case]` is isolated; no shared state.

use chrono::{TimeZone, Utc};
use gantry_core::types::{Commit, DiffSummary, FileRecord, NewCommit};
use rstest::rstest;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn commit(parent: Option<Uuid>, message: &str) -> Commit {
    Commit {
        id: Uuid::new_v4(),
        parent_commit_id: parent,
        message: message.to_string(),
        metadata_s3_file_version: "3HL4kqtJlcpXroDTDmJ+rmSpXd3dIbrHY".to_string(),
        // Second precision: the wire format drops sub-seconds.
        created_at: Utc.with_ymd_and_hms(2023, 2, 16, 0, 16, 33).unwrap(),
        created_by: "04c894c7-a853-4fec-a024-66f5aae07b06".to_string(),
        is_latest_commit: parent.is_none(),
        dataset_id: Some(Uuid::new_v4()),
    }
}

// ---------------------------------------------------------------------------
// Commits
// ---------------------------------------------------------------------------

#[rstest]
#[case("root", commit(None, "initial dataset commit"))]
#[case("child", commit(Some(Uuid::new_v4()), "add 3 files"))]
#[case("unicode_message", commit(None, "日本語・한국어 «rollback» <>&\"'"))]
fn commit_roundtrip(#[case] label: &str, #[case] commit: Commit) {
    let json = serde_json::to_string(&commit)
        .unwrap_or_else(|e| panic!("[{label}] serialize failed: {e}"));
    let back: Commit = serde_json::from_str(&json)
        .unwrap_or_else(|e| panic!("[{label}] deserialize failed: {e}"));
    assert_eq!(commit, back, "[{label}]");
}

#[test]
fn new_commit_omits_absent_commit_id() {
    let body = NewCommit {
        message: "m".to_string(),
        metadata_s3_file_version: "v1".to_string(),
        parent_commit_id: Uuid::nil(),
        commit_id: None,
    };
    let value = serde_json::to_value(&body).expect("serialize");
    assert!(value.get("commit_id").is_none());
    assert_eq!(value["parent_commit_id"], Uuid::nil().to_string());
}

// ---------------------------------------------------------------------------
// Manifest records
// ---------------------------------------------------------------------------

#[rstest]
#[case("plain", "a.csv")]
#[case("nested", "artifacts/images/cat.png")]
#[case("unicode", "données/表.csv")]
#[case("spaces", "my file (1).txt")]
fn record_jsonl_is_one_parseable_line(#[case] label: &str, #[case] name: &str) {
    let record = FileRecord::new(name, format!("s3://b/p/ds/{name}"), "vid", "f00d").unwrap();
    let line = record.to_jsonl().unwrap();
    assert!(line.ends_with('\n'), "[{label}] trailing newline");
    assert_eq!(line.matches('\n').count(), 1, "[{label}] single line");
    let back: FileRecord = serde_json::from_str(line.trim_end()).unwrap();
    assert_eq!(record, back, "[{label}]");
}

#[rstest]
#[case("", "s3://b/k", "v", "h", "file_name")]
#[case("a", "", "v", "h", "url")]
#[case("a", "s3://b/k", "", "h", "version_id")]
#[case("a", "s3://b/k", "v", "", "sha256")]
fn incomplete_record_names_missing_field(
    #[case] name: &str,
    #[case] url: &str,
    #[case] version: &str,
    #[case] sha: &str,
    #[case] missing: &str,
) {
    let err = FileRecord::new(name, url, version, sha).unwrap_err();
    assert!(err.to_string().contains(missing), "got: {err}");
}

#[test]
fn diff_summary_tolerates_missing_lists() {
    let summary: DiffSummary = serde_json::from_str(r#"{"new_files":["a"]}"#).unwrap();
    assert_eq!(summary.total(), 1);
    assert!(summary.modified_files.is_empty());
    assert!(!summary.is_empty());
}
