//! Integration tests for the `bluestar` CLI binary.
//!
//! These cover argument parsing, help output, completions, config
//! commands, and error exits without touching the vendor cloud.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command with env isolation: no `BLUESTAR_*` leakage and config
/// directories pointed at `home`.
fn bluestar_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("bluestar");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("BLUESTAR_PROFILE")
        .env_remove("BLUESTAR_PHONE")
        .env_remove("BLUESTAR_PASSWORD")
        .env_remove("BLUESTAR_BASE_URL")
        .env_remove("BLUESTAR_OUTPUT")
        .env_remove("BLUESTAR_NO_BROKER")
        .env_remove("BLUESTAR_TIMEOUT")
        .env_remove("BLUESTAR_DEFAULT_PROFILE")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = bluestar_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    bluestar_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("devices")
            .and(predicate::str::contains("control"))
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("--no-broker")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    bluestar_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bluestar"));
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    bluestar_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_prints_toml_location() {
    let home = tempfile::tempdir().unwrap();
    bluestar_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_defaults() {
    let home = tempfile::tempdir().unwrap();
    bluestar_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[defaults]"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_control_requires_a_change() {
    let home = tempfile::tempdir().unwrap();
    let output = bluestar_cmd(home.path())
        .args(["control", "ac-1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_control_rejects_bad_toggle() {
    let home = tempfile::tempdir().unwrap();
    let output = bluestar_cmd(home.path())
        .args(["control", "ac-1", "--power", "maybe"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("maybe"));
}

#[test]
fn test_devices_without_credentials_exits_auth() {
    let home = tempfile::tempdir().unwrap();
    let output = bluestar_cmd(home.path()).arg("devices").output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("No credentials"));
}

#[test]
fn test_unknown_profile_exits_usage() {
    let home = tempfile::tempdir().unwrap();
    let output = bluestar_cmd(home.path())
        .args(["--profile", "nope", "devices"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("nope"));
}
