//! Integration tests for the command-line entry points
//!
//! Both binaries report a setup failure once, through the log, and exit
//! non-zero.

use std::process::{Command, Output};
use tempfile::tempdir;

fn combined(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

#[test]
fn test_extract_missing_input_reports_once() {
    let dir = tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_harvest-extract"))
        .arg(dir.path().join("missing.txt"))
        .arg(dir.path().join("out.csv"))
        .arg("-q")
        .env_remove("RUST_LOG")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let text = combined(&output);
    assert_eq!(text.matches("Failed to read URL list").count(), 1, "{}", text);
    assert!(!String::from_utf8_lossy(&output.stderr).contains("Error:"));
    assert!(!dir.path().join("out.csv").exists());
}

#[test]
fn test_crawl_missing_config_reports_once() {
    let dir = tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_harvest"))
        .arg(dir.path().join("missing.toml"))
        .arg("-q")
        .env_remove("RUST_LOG")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let text = combined(&output);
    assert_eq!(
        text.matches("Failed to load configuration").count(),
        1,
        "{}",
        text
    );
    assert!(!String::from_utf8_lossy(&output.stderr).contains("Error:"));
}
