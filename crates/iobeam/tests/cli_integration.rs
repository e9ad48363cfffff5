//! CLI integration tests for the `iobeam` binary.
//!
//! Each test runs the real binary against its own config root, so profile
//! state never leaks between tests or into the user's home directory.

use assert_cmd::Command;
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

/// The iobeam binary with its config root in `dir`.
fn iobeam(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("iobeam").unwrap();
    cmd.env("IOBEAM_CONFIG_DIR", dir.path()).env_remove("IOBEAM_LOG");
    cmd
}

// ─────────────────────────────────────────────────────────────────────────────
// Usage
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    iobeam(&dir)
        .arg("--help")
        .assert()
        .success()
        .stderr(predicate::str::contains("Usage: iobeam COMMAND"))
        .stderr(predicate::str::contains("device"))
        .stderr(predicate::str::contains("project"))
        .stderr(predicate::str::contains("profile"));
}

#[test]
fn test_no_arguments_shows_usage() {
    let dir = TempDir::new().unwrap();
    iobeam(&dir)
        .assert()
        .success()
        .stderr(predicate::str::contains("Available Commands:"));
}

#[test]
fn test_leaf_help_lists_flags() {
    let dir = TempDir::new().unwrap();
    iobeam(&dir)
        .args(["device", "get", "-h"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Usage: iobeam device get [FLAGS]"))
        .stderr(predicate::str::contains("-id string"));
}

#[test]
fn test_unknown_subcommand_fails() {
    let dir = TempDir::new().unwrap();
    iobeam(&dir)
        .args(["device", "bogus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid command 'bogus'"));
}

#[test]
fn test_bad_option_value_fails() {
    let dir = TempDir::new().unwrap();
    iobeam(&dir)
        .args(["project", "get", "-id", "abc"])
        .assert()
        .failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Profiles
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_first_run_creates_default_profile() {
    let dir = TempDir::new().unwrap();
    iobeam(&dir)
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* default"));

    assert!(dir.path().join("default").join("profile.config").is_file());
}

#[test]
fn test_profile_create_and_switch() {
    let dir = TempDir::new().unwrap();
    iobeam(&dir)
        .args(["profile", "create", "-name", "staging", "-server", "http://localhost:1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Profile 'staging' successfully created."));

    iobeam(&dir)
        .args(["profile", "switch", "-name", "staging"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Active profile is now 'staging'"));

    iobeam(&dir)
        .args(["profile", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Profile name  : staging"))
        .stdout(predicate::str::contains("API server    : http://localhost:1"))
        .stdout(predicate::str::contains("Active project: [None]"));
}

#[test]
fn test_cannot_delete_active_profile() {
    let dir = TempDir::new().unwrap();
    iobeam(&dir)
        .args(["profile", "delete", "-name", "default"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot delete active profile"));
}

#[test]
fn test_delete_outside_config_root_is_refused() {
    let parent = TempDir::new().unwrap();
    let root = parent.path().join("cfg");
    std::fs::write(parent.path().join("keep.txt"), b"keep").unwrap();

    let mut cmd = Command::cargo_bin("iobeam").unwrap();
    cmd.env("IOBEAM_CONFIG_DIR", &root)
        .env_remove("IOBEAM_LOG")
        .args(["profile", "delete", "-name", ".."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid profile name '..'"));

    assert!(parent.path().join("keep.txt").is_file());
    assert!(root.join("default").join("profile.config").is_file());
}

#[test]
fn test_switch_to_missing_profile_fails() {
    let dir = TempDir::new().unwrap();
    iobeam(&dir)
        .args(["profile", "switch", "-name", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Profile 'nope' does not exist"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_device_get_against_server() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/v1/devices/abc");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"device_id": "abc", "device_name": "thermo", "project_id": 3}));
    });

    let dir = TempDir::new().unwrap();
    iobeam(&dir)
        .args(["profile", "create", "-name", "mock", "-server", &server.base_url(), "-active"])
        .assert()
        .success();

    iobeam(&dir)
        .args(["device", "get", "-id", "abc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Device name: thermo"));
    mock.assert();
}

#[test]
fn test_api_error_message_is_shown() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v1/devices/gone");
        then.status(404)
            .header("content-type", "application/json")
            .json_body(json!({"errors": [{"code": 404, "message": "device not found"}]}));
    });

    let dir = TempDir::new().unwrap();
    iobeam(&dir)
        .args(["profile", "create", "-name", "mock", "-server", &server.base_url(), "-active"])
        .assert()
        .success();

    iobeam(&dir)
        .args(["device", "get", "-id", "gone"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: device not found"));
}

#[test]
fn test_trigger_test_sends_repeated_params() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(PUT)
            .path("/v1/triggers/events/test")
            .header("authorization", "Bearer proj-six")
            .json_body(json!({"event_name": "hot", "data": {"temp": "40", "room": "lab"}}));
        then.status(204);
    });

    let dir = TempDir::new().unwrap();
    iobeam(&dir)
        .args(["profile", "create", "-name", "mock", "-server", &server.base_url(), "-active"])
        .assert()
        .success();
    std::fs::write(
        dir.path().join("mock").join("proj_6.json"),
        json!({"token": "proj-six", "expires": "2099-01-01 00:00:00 +0000", "project_id": 6})
            .to_string(),
    )
    .unwrap();

    iobeam(&dir)
        .args([
            "trigger", "test", "-projectId", "6", "-name", "hot", "-param", "temp,40", "-param",
            "room,lab",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Test event sent to trigger 'hot'."));
    mock.assert();
}
