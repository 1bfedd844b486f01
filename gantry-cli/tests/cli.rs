use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn gantry_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("gantry"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("GANTRY_API_KEY")
        .env_remove("GANTRY_API_ORIGIN")
        .env_remove("GANTRY_WORKSPACE");
    cmd
}

#[test]
fn help_lists_every_subcommand() {
    let home = TempDir::new().expect("home");
    let mut assert = gantry_cmd(home.path()).arg("--help").assert().success();
    for sub in [
        "pull", "push", "diff", "stash", "restore", "rollback", "versions", "delete", "config",
    ] {
        assert = assert.stdout(contains(sub));
    }
}

#[test]
fn push_requires_a_message() {
    let home = TempDir::new().expect("home");
    gantry_cmd(home.path())
        .args(["push", "flowers"])
        .assert()
        .failure()
        .stderr(contains("--message"));
}

#[test]
fn rollback_rejects_a_malformed_version() {
    let home = TempDir::new().expect("home");
    gantry_cmd(home.path())
        .args(["rollback", "flowers", "not-a-uuid"])
        .assert()
        .failure()
        .stderr(contains("invalid value"));
}

#[test]
fn config_set_then_show_masks_the_key() {
    let home = TempDir::new().expect("home");
    gantry_cmd(home.path())
        .args(["config", "set", "api_key", "super-secret"])
        .assert()
        .success();
    gantry_cmd(home.path())
        .args(["config", "set", "batch_size", "9"])
        .assert()
        .success();

    gantry_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(contains("batch_size: 9"))
        .stdout(contains("********"))
        .stdout(contains("super-secret").not());

    let saved = std::fs::read_to_string(home.path().join(".gantry/config.yaml")).expect("read");
    assert!(saved.contains("super-secret"));
}

#[test]
fn config_set_rejects_bad_values() {
    let home = TempDir::new().expect("home");
    gantry_cmd(home.path())
        .args(["config", "set", "batch_size", "0"])
        .assert()
        .failure()
        .stderr(contains("batch_size"));
    assert!(!home.path().join(".gantry/config.yaml").exists());
}

#[test]
fn delete_without_confirmation_does_nothing() {
    let home = TempDir::new().expect("home");
    gantry_cmd(home.path())
        .args(["delete", "flowers"])
        .assert()
        .failure()
        .stderr(contains("--yes"));
}

#[test]
fn unreachable_server_reports_the_dataset() {
    let home = TempDir::new().expect("home");
    gantry_cmd(home.path())
        .env("GANTRY_API_ORIGIN", "http://127.0.0.1:9")
        .args(["diff", "flowers"])
        .assert()
        .failure()
        .stderr(contains("failed to open dataset 'flowers'"));
}
