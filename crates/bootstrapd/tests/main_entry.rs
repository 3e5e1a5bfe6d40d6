//! Integration tests for the `bootstrapd` binary entry point.
//!
//! Covers help output and the failures reported before the daemon forks.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use tempfile::TempDir;

#[test]
fn help_lists_the_config_flag() {
    let mut command = cargo_bin_cmd!("bootstrapd");
    command.arg("--help");
    command.assert().success().stdout(contains("--config"));
}

#[test]
fn missing_config_flag_prints_usage() {
    let mut command = cargo_bin_cmd!("bootstrapd");
    command.assert().failure().stderr(contains("Usage"));
}

#[test]
fn unreadable_config_exits_with_failure() {
    let dir = TempDir::new().expect("create temp dir");
    let mut command = cargo_bin_cmd!("bootstrapd");
    command
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .args(["--log-backend", "stdout"]);
    command
        .assert()
        .failure()
        .stderr(contains("couldn't read configuration"));
    assert!(!dir.path().join("bootstrapd.pid").exists());
}
