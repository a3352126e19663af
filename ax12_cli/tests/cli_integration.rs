use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Build a minimal valid TOML config for the simulated backend
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[bus]
# unused by the simulated backend but kept realistic
device = "/dev/serial0"
baud_rate = 115200

[sim]
# fast settle keeps the suite quick
settle_ms = 40
startup_delay_ms = 1
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["move", "--id", "5", "--degrees", "90"], 0, "move complete", "stdout")]
#[case(&["move", "--id", "5"], 2, "required", "stderr")]
#[case(&["move", "--id", "5", "--degrees", "200"], 2, "Invalid argument", "stdout")]
#[case(&["set-torque", "--id", "3", "--percent", "150"], 2, "Invalid argument", "stdout")]
#[case(&["set-mode", "--id", "4", "--mode", "wheel"], 0, "mode set", "stdout")]
#[case(&["set-mode", "--id", "4", "--mode", "7"], 2, "unknown mode code", "stdout")]
#[case(&["scan"], 0, "no servos found", "stdout")]
#[case(&["self-check"], 0, "ok", "stdout")]
#[case(&["ping", "--id", "3"], 0, "responding", "stdout")]
#[case(&["status", "--id", "9"], 0, "servo 9", "stdout")]
#[case(&["turn", "--id", "5", "--percent", "-25"], 0, "turning", "stdout")]
#[case(&["turn", "--id", "5", "--percent", "0"], 0, "turn stopped", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("ax12_cli").unwrap();

    // Always include a valid config to avoid relying on the default path
    cmd.arg("--config").arg(&cfg);

    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);

    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn read_prints_a_bare_value() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("ax12_cli").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("read")
        .arg("--id")
        .arg("7")
        .arg("position");

    // Factory default position of a fresh simulated servo
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("0.0"));
}

#[rstest]
fn cli_rejects_out_of_range_baud() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cfg.toml");
    fs::write(&path, "[bus]\nbaud_rate = 999\n").unwrap();

    let mut cmd = Command::cargo_bin("ax12_cli").unwrap();
    cmd.arg("--config").arg(&path).arg("self-check");

    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("bus.baud_rate"));
}

#[rstest]
fn cli_reports_missing_explicit_config() {
    let dir = tempdir().unwrap();

    let mut cmd = Command::cargo_bin("ax12_cli").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("self-check");

    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("could not be read"));
}
