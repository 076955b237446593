//! `siteforge install` input validation. Every case here is rejected before
//! any connection is attempted.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use crate::cli_tests::siteforge;

fn install(home: &TempDir) -> Command {
    let mut cmd = siteforge();
    cmd.env("SITEFORGE_CONFIG", home.path().join("config.yaml"))
        .env_remove("SITEFORGE_SSH_PASSWORD")
        .env_remove("SITEFORGE_SSH_PASSPHRASE")
        .args([
            "install",
            "--yes",
            "--host",
            "203.0.113.5",
            "--title",
            "My Blog",
            "--admin-user",
            "admin",
            "--admin-email",
            "ops@example.com",
        ]);
    cmd
}

#[test]
fn test_invalid_domain_is_rejected() {
    let home = TempDir::new().expect("tempdir");
    install(&home)
        .args(["--domain", "not a domain", "--password", "pw"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid domain"));
}

#[test]
fn test_invalid_domain_json_error_code() {
    let home = TempDir::new().expect("tempdir");
    let output = install(&home)
        .args(["--json", "--domain", "localhost", "--password", "pw"])
        .output()
        .expect("run siteforge");
    assert!(!output.status.success());
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["error"], true);
    assert_eq!(json["code"], "INVALID_INPUT");
}

#[test]
fn test_unsupported_php_version_is_rejected() {
    let home = TempDir::new().expect("tempdir");
    install(&home)
        .args(["--domain", "example.com", "--php", "5.6", "--password", "pw"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported PHP version '5.6'"));
}

#[test]
fn test_missing_credential_is_rejected() {
    let home = TempDir::new().expect("tempdir");
    install(&home)
        .args(["--domain", "example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No SSH credential given"));
}

#[test]
fn test_unreadable_key_file_is_rejected() {
    let home = TempDir::new().expect("tempdir");
    let missing = home.path().join("id_missing");
    install(&home)
        .args(["--domain", "example.com", "--identity"])
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read key file"));
}
