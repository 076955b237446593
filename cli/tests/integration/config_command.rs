//! `siteforge config` against a throwaway config file.

#![allow(clippy::expect_used)]

use predicates::prelude::*;
use tempfile::TempDir;

use crate::cli_tests::siteforge;

#[test]
fn test_config_show_prints_defaults_without_a_file() {
    let home = TempDir::new().expect("tempdir");
    siteforge()
        .env("SITEFORGE_CONFIG", home.path().join("config.yaml"))
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_version"))
        .stdout(predicate::str::contains("web_root: /var/www"));
}

#[test]
fn test_config_show_json_reports_path_and_values() {
    let home = TempDir::new().expect("tempdir");
    let path = home.path().join("config.yaml");
    std::fs::write(&path, "timeouts:\n  run_secs: 900\n").expect("write config");

    let output = siteforge()
        .env("SITEFORGE_CONFIG", &path)
        .args(["config", "show", "--json"])
        .output()
        .expect("run siteforge");
    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["config"]["timeouts"]["run_secs"], 900);
    assert_eq!(json["config"]["timeouts"]["quick_secs"], 30);
    assert_eq!(json["path"], path.display().to_string());
}

#[test]
fn test_config_path_honours_override() {
    let home = TempDir::new().expect("tempdir");
    let path = home.path().join("custom.yaml");
    siteforge()
        .env("SITEFORGE_CONFIG", &path)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.yaml"));
}

#[test]
fn test_invalid_config_json_error_code() {
    let home = TempDir::new().expect("tempdir");
    let path = home.path().join("config.yaml");
    std::fs::write(&path, "php:\n  default_version: \"5.6\"\n").expect("write config");

    let output = siteforge()
        .env("SITEFORGE_CONFIG", &path)
        .args(["config", "show", "--json"])
        .output()
        .expect("run siteforge");
    assert!(!output.status.success());
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["code"], "INVALID_CONFIG");
}
