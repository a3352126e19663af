use assert_cmd::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[bus]
device = "/dev/serial0"
baud_rate = 115200

[sim]
settle_ms = 40
startup_delay_ms = 1
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn stdout_line_containing(output: &std::process::Output, needle: &str) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout
        .lines()
        .find(|l| l.contains(needle))
        .unwrap_or_else(|| panic!("no stdout line containing {needle:?}:\n{stdout}"));
    serde_json::from_str(line).expect("confirmation line is valid JSON")
}

#[test]
fn json_move_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let output = Command::cargo_bin("ax12_cli")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("move")
        .arg("--id")
        .arg("5")
        .arg("--degrees")
        .arg("90")
        .output()
        .unwrap();
    assert!(output.status.success(), "move failed: {output:?}");

    let v = stdout_line_containing(&output, "\"final_deg\"");
    assert!(v["timestamp"].as_i64().is_some(), "timestamp: {v}");
    assert_eq!(v["id"].as_u64(), Some(5));
    assert_eq!(v["target_deg"].as_f64(), Some(90.0));
    assert!(v["duration_ms"].as_u64().is_some(), "duration_ms: {v}");
    assert_eq!(v["settled"].as_bool(), Some(true));

    let final_deg = v["final_deg"].as_f64().expect("final_deg is a number");
    assert!(
        (final_deg - 90.0).abs() < 0.5,
        "servo landed at {final_deg}"
    );
}

#[test]
fn json_error_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let output = Command::cargo_bin("ax12_cli")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .arg("move")
        .arg("--id")
        .arg("5")
        .arg("--degrees")
        .arg("999")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));

    let v = stdout_line_containing(&output, "\"reason\"");
    assert_eq!(v["reason"].as_str(), Some("InvalidArgument"));
    let message = v["message"].as_str().expect("message is a string");
    assert!(message.contains("What happened"), "message: {message}");
}

#[test]
fn json_scan_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let output = Command::cargo_bin("ax12_cli")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .arg("scan")
        .output()
        .unwrap();
    assert!(output.status.success(), "scan failed: {output:?}");

    let v = stdout_line_containing(&output, "\"ids\"");
    let ids = v["ids"].as_array().expect("ids is an array");
    assert!(ids.is_empty(), "simulated bus has no servos: {v}");
    assert_eq!(v["complete"].as_bool(), Some(true));
}
