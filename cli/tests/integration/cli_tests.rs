//! Integration tests for the CLI surface: help, version and global flags.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

pub fn siteforge() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("siteforge"));
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_cli_no_args_shows_help() {
    siteforge().assert().code(2).stderr(predicate::str::contains(
        "Provision WordPress on a fresh Ubuntu server over SSH",
    ));
}

#[test]
fn test_cli_help_lists_commands() {
    siteforge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("probe"))
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_install_help_lists_site_options() {
    siteforge()
        .args(["install", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--domain"))
        .stdout(predicate::str::contains("--admin-email"))
        .stdout(predicate::str::contains("--ssl"))
        .stdout(predicate::str::contains("--identity"));
}

#[test]
fn test_version_command_shows_version() {
    siteforge()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "siteforge {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_version_command_json_outputs_valid_json() {
    let output = siteforge()
        .args(["version", "--json"])
        .output()
        .expect("run siteforge");
    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_unknown_command_fails() {
    siteforge()
        .arg("deploy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}
