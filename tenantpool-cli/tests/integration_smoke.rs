//! Smoke tests to verify command wiring

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_top_level_help() {
    let mut cmd = Command::cargo_bin("tenantpool").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("exec"));
}

#[test]
fn test_serve_help() {
    let mut cmd = Command::cargo_bin("tenantpool").unwrap();
    cmd.arg("serve").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Address to bind to"));
}

#[test]
fn test_check_help() {
    let mut cmd = Command::cargo_bin("tenantpool").unwrap();
    cmd.arg("check").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("read-only replica"));
}

#[test]
fn test_exec_requires_sql() {
    let mut cmd = Command::cargo_bin("tenantpool").unwrap();
    cmd.arg("exec");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("<SQL>"));
}

// === Config Command Tests ===

#[test]
fn test_config_path_honors_env() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tenantpool.toml");

    let mut cmd = Command::cargo_bin("tenantpool").unwrap();
    cmd.env("TENANTPOOL_CONFIG", &path).arg("config").arg("path");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("tenantpool.toml"));
}

#[test]
fn test_config_show_reports_missing_replica_host() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
tenant = "acme"

[db]
host = "primary.internal:3306"
name = "cheddar"
username = "app"
password = "hunter2"
"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("tenantpool").unwrap();
    cmd.current_dir(dir.path())
        .env("TENANTPOOL_CONFIG", &path)
        .env("HOME", dir.path())
        .env_remove("DB_HOST")
        .env_remove("DB_READ_ONLY_HOST")
        .env_remove("DB_NAME")
        .env_remove("DB_USERNAME")
        .env_remove("DB_PASSWORD")
        .env_remove("TENANTPOOL_TENANT")
        .arg("config")
        .arg("show");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("acme Master Data Source"))
        .stdout(predicate::str::contains("db.read-only-host"))
        .stdout(predicate::str::contains("hunter2").not());
}
