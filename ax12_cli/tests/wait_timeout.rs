//! A wait deadline expiring is a reporting condition, not a failure:
//! the servo keeps moving, the CLI just stops watching.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Slow settle so a short deadline reliably expires first
fn write_slow_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[sim]
settle_ms = 2000
startup_delay_ms = 1
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[test]
fn wait_timeout_is_not_an_error() {
    let dir = tempdir().unwrap();
    let cfg = write_slow_config(&dir);

    let mut cmd = Command::cargo_bin("ax12_cli").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("move")
        .arg("--id")
        .arg("2")
        .arg("--degrees")
        .arg("45")
        .arg("--timeout-ms")
        .arg("100");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("still settling"));
}

#[test]
fn no_wait_returns_immediately() {
    let dir = tempdir().unwrap();
    let cfg = write_slow_config(&dir);

    let mut cmd = Command::cargo_bin("ax12_cli").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("move")
        .arg("--id")
        .arg("2")
        .arg("--degrees")
        .arg("45")
        .arg("--no-wait");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("move dispatched"));
}
