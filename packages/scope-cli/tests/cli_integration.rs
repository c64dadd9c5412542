use assert_cmd::Command;
use predicates::prelude::*;
use scope_rs::testing::{simple_capture, WaveformFileBuilder};
use std::path::Path;
use tempfile::tempdir;

fn scopeconv() -> Command {
    let mut cmd = Command::cargo_bin("scopeconv").unwrap();
    cmd.env_remove("SCOPE_FLUSH_THRESHOLD")
        .env_remove("SCOPE_SAVE_BUFFERS");
    cmd
}

fn write_captures(dir: &Path, count: usize) {
    for i in 0..count {
        let samples: Vec<f32> = (0..16).map(|s| (s + i) as f32).collect();
        std::fs::write(
            dir.join(format!("wav{:04}.bin", i)),
            simple_capture(&[("CHAN1", samples.as_slice()), ("CHAN2", samples.as_slice())]),
        )
        .unwrap();
    }
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    serde_json::from_slice(&output.stdout).unwrap()
}

// =============================================================================
// GENERAL
// =============================================================================

#[test]
fn test_no_args_shows_help() {
    scopeconv()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_flag() {
    scopeconv()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("scopeconv"));
}

#[test]
fn test_help_flag() {
    scopeconv()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Infiniium"));
}

// =============================================================================
// CONVERT SUBCOMMAND
// =============================================================================

#[test]
fn test_convert_missing_directory() {
    let dir = tempdir().unwrap();
    scopeconv()
        .args(["convert", "--dir"])
        .arg(dir.path().join("absent"))
        .arg("-o")
        .arg(dir.path().join("out"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Input directory not found"));
}

#[test]
fn test_convert_creates_database() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_captures(input.path(), 2);
    let out_dir = output.path().join("nested/out");

    scopeconv()
        .args(["convert", "--dir"])
        .arg(input.path())
        .arg("--out-directory")
        .arg(&out_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Converted 2 of 2 file(s)"))
        .stdout(predicate::str::contains("Channels: CHAN1, CHAN2"));

    assert!(out_dir.join("waveforms.sqlite").is_file());
}

#[test]
fn test_convert_json_report() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_captures(input.path(), 3);

    let report = json_stdout(
        scopeconv()
            .args(["convert", "--json", "--save-buffers", "-d"])
            .arg(input.path())
            .arg("-o")
            .arg(output.path()),
    );
    assert_eq!(report["files_converted"], 3);
    assert_eq!(report["flushes"], 1);
    assert_eq!(report["rows_written"]["waveforms"], 3 * 2 * 16);
    assert_eq!(report["rows_written"]["waveform_buffer"], 3 * 2 * 16);
    assert_eq!(report["aggregate"]["triggers"], 3);
}

#[test]
fn test_convert_partial_failure_exit_code() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_captures(input.path(), 2);
    WaveformFileBuilder::new()
        .cookie(*b"PK")
        .write(input.path().join("wav0001b.bin"))
        .unwrap();

    scopeconv()
        .args(["convert", "-d"])
        .arg(input.path())
        .arg("-o")
        .arg(output.path())
        .assert()
        .code(3)
        .stdout(predicate::str::contains("Converted 2 of 3 file(s)"))
        .stderr(predicate::str::contains("wav0001b.bin (FormatMismatch)"));
}

#[test]
fn test_flush_threshold_from_env() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_captures(input.path(), 3);

    let report = json_stdout(
        scopeconv()
            .env("SCOPE_FLUSH_THRESHOLD", "1")
            .args(["convert", "--json", "--compact", "--skip-average", "-d"])
            .arg(input.path())
            .arg("-o")
            .arg(output.path()),
    );
    assert_eq!(report["flushes"], 4);
    assert!(report.get("aggregate").is_none());
}

#[test]
fn test_invalid_flush_threshold_env() {
    let input = tempdir().unwrap();
    scopeconv()
        .env("SCOPE_FLUSH_THRESHOLD", "many")
        .args(["convert", "-d"])
        .arg(input.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("SCOPE_FLUSH_THRESHOLD"));
}

#[test]
fn test_report_written_to_file() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_captures(input.path(), 1);
    let report_path = output.path().join("report.json");

    scopeconv()
        .args(["convert", "-d"])
        .arg(input.path())
        .arg("-o")
        .arg(output.path())
        .arg("--report")
        .arg(&report_path)
        .assert()
        .success();

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["files_seen"], 1);
}

#[test]
fn test_log_file_captures_progress() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_captures(input.path(), 1);
    let log_path = output.path().join("convert.log");

    scopeconv()
        .args(["convert", "-d"])
        .arg(input.path())
        .arg("-o")
        .arg(output.path())
        .arg("--log-file")
        .arg(&log_path)
        .assert()
        .success();

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("Processing run wav0000.bin"));
    assert!(log.contains("Parsing CHAN2"));
}

// =============================================================================
// AVERAGE SUBCOMMAND
// =============================================================================

#[test]
fn test_average_without_database() {
    let dir = tempdir().unwrap();
    scopeconv()
        .args(["average", "-o"])
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Database not found"));
}

#[test]
fn test_average_after_skip() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_captures(input.path(), 2);

    scopeconv()
        .args(["convert", "--skip-average", "-d"])
        .arg(input.path())
        .arg("-o")
        .arg(output.path())
        .assert()
        .success();

    let summary = json_stdout(
        scopeconv()
            .args(["average", "--json", "-o"])
            .arg(output.path()),
    );
    assert_eq!(summary["triggers"], 2);
    assert_eq!(summary["average_rows"], 2 * 16);
    assert_eq!(summary["start_time_variance"], 0.0);
}

// =============================================================================
// INSPECT SUBCOMMAND
// =============================================================================

#[test]
fn test_inspect_valid_file() {
    let dir = tempdir().unwrap();
    write_captures(dir.path(), 1);

    let result = json_stdout(
        scopeconv()
            .args(["inspect", "--json", "--file"])
            .arg(dir.path().join("wav0000.bin")),
    );
    assert_eq!(result["valid"], true);
    assert_eq!(result["total_samples"], 32);
    assert_eq!(result["waveforms"][1]["channel"], "CHAN2");
    assert_eq!(result["waveforms"][0]["x_units"], "Seconds");
    assert_eq!(result["buffers"][0]["bytes_per_point"], 4);
}

#[test]
fn test_inspect_text_output() {
    let dir = tempdir().unwrap();
    write_captures(dir.path(), 1);

    scopeconv()
        .args(["inspect", "--file"])
        .arg(dir.path().join("wav0000.bin"))
        .assert()
        .success()
        .stdout(predicate::str::contains("2 waveform(s)"))
        .stdout(predicate::str::contains("Total samples: 32"));
}

#[test]
fn test_inspect_rejects_foreign_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wav0000.bin");
    WaveformFileBuilder::new().cookie(*b"PK").write(&path).unwrap();

    scopeconv()
        .args(["inspect", "--json", "--file"])
        .arg(&path)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"error_kind\": \"FormatMismatch\""));
}

#[test]
fn test_inspect_missing_file() {
    let dir = tempdir().unwrap();
    scopeconv()
        .args(["inspect", "--file"])
        .arg(dir.path().join("nope.bin"))
        .assert()
        .code(1);
}
