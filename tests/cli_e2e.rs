//! End-to-end CLI tests for the autoattach binary.

mod support;

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Temp workspace with a config file, a versions file, and a database path.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(config: &str) -> Self {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("config.toml"), config).expect("write config");
        std::fs::write(dir.path().join("versions.json"), support::FEED).expect("write feed");
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("autoattach").unwrap();
        cmd.env("XDG_CONFIG_HOME", self.path())
            .env_remove("RUST_LOG")
            .arg("-q")
            .arg("--config")
            .arg(self.path().join("config.toml"))
            .arg("--db")
            .arg(self.path().join("portal.db"))
            .arg("--versions")
            .arg(self.path().join("versions.json"));
        cmd
    }

    fn create_account(&self, name: &str, auth: &str) -> i64 {
        let output = self
            .cmd()
            .args(["create-account", "--name", name, "--auth", auth])
            .output()
            .unwrap();
        assert!(output.status.success());
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        json["id"].as_i64().unwrap()
    }
}

const PROJECT_CONFIG: &str = r#"
project_name = "Proto@Home"
master_url = "https://proto.example.org/"
project_id = 17
"#;

#[test]
fn test_binary_help_displays_usage() {
    let mut cmd = Command::cargo_bin("autoattach").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("download authorization"));
}

#[test]
fn test_binary_version_displays_version() {
    let mut cmd = Command::cargo_bin("autoattach").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("autoattach"));
}

#[test]
fn test_binary_missing_subcommand_fails() {
    let mut cmd = Command::cargo_bin("autoattach").unwrap();
    cmd.assert().failure().stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_invalid_config_key_fails() {
    let ws = Workspace::new("colour = \"blue\"\n");
    ws.cmd()
        .arg("installed")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_rpc_issues_descriptor_for_account() {
    let ws = Workspace::new(PROJECT_CONFIG);
    let id = ws.create_account("alice", "auth-alice");

    let output = ws
        .cmd()
        .args(["rpc", "--auth", "auth-alice", "--user-agent", support::WINDOWS_UA])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["project_id"], 17);
    assert_eq!(json["user_id"], id);
    assert_eq!(json["package"]["filename"], "client_8.0.2_windows_x86_64.exe");
    assert_eq!(json["token"].as_str().map(str::len), Some(64));
}

#[test]
fn test_rpc_unknown_account_prints_error_reply() {
    let ws = Workspace::new(PROJECT_CONFIG);

    ws.cmd()
        .args(["rpc", "--auth", "nobody", "--user-agent", support::WINDOWS_UA])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"error\""))
        .stdout(predicate::str::contains("-1"));
}

#[test]
fn test_rpc_key_required_when_configured() {
    let ws = Workspace::new(&format!("{PROJECT_CONFIG}rpc_key = \"s3cret\"\n"));
    ws.create_account("alice", "auth-alice");

    ws.cmd()
        .args(["rpc", "--auth", "auth-alice", "--user-agent", support::WINDOWS_UA])
        .assert()
        .code(1);
    ws.cmd()
        .args([
            "rpc",
            "--auth",
            "auth-alice",
            "--user-agent",
            support::WINDOWS_UA,
            "--rpc-key",
            "s3cret",
        ])
        .assert()
        .success();
}

#[test]
fn test_offer_on_linux_is_manual_install() {
    let ws = Workspace::new(PROJECT_CONFIG);
    let id = ws.create_account("alice", "auth-alice");

    ws.cmd()
        .args([
            "offer",
            "--account-id",
            &id.to_string(),
            "--user-agent",
            support::LINUX_UA,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"kind\": \"manual\""));
}

#[test]
fn test_installed_notice_lists_steps() {
    let ws = Workspace::new(PROJECT_CONFIG);

    ws.cmd()
        .arg("installed")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"kind\": \"installed\""))
        .stdout(predicate::str::contains("Add Project"));
}

#[test]
fn test_consent_round_trip_through_cli() {
    let ws = Workspace::new(PROJECT_CONFIG);
    let id = ws.create_account("alice", "auth-alice").to_string();

    let output = ws
        .cmd()
        .args(["begin-consent", "--account-id", &id])
        .output()
        .unwrap();
    assert!(output.status.success());
    let pending: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let token = pending["cookies"]
        .as_array()
        .unwrap()
        .iter()
        .find(|cookie| cookie["name"] == "logintoken")
        .and_then(|cookie| cookie["value"].as_str())
        .unwrap()
        .to_string();

    // Without the checkbox nothing is consumed.
    ws.cmd()
        .args(["complete-consent", "--token", &token, "--account-id", &id])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Terms of use not accepted"));

    ws.cmd()
        .args([
            "complete-consent",
            "--token",
            &token,
            "--account-id",
            &id,
            "--agree",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"state\": \"consented\""))
        .stdout(predicate::str::contains("https://proto.example.org/home.php"));

    // Replay.
    ws.cmd()
        .args([
            "complete-consent",
            "--token",
            &token,
            "--account-id",
            &id,
            "--agree",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Authentication error"));
}

#[test]
fn test_sweep_reports_removed_count() {
    let ws = Workspace::new(PROJECT_CONFIG);

    ws.cmd()
        .arg("sweep")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"removed\": 0"));
}

#[test]
fn test_fetch_versions_without_url_fails() {
    let ws = Workspace::new(PROJECT_CONFIG);

    ws.cmd()
        .arg("fetch-versions")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No feed URL"));
}

#[test]
fn test_fetch_versions_does_not_open_database() {
    let ws = Workspace::new(PROJECT_CONFIG);

    ws.cmd().arg("fetch-versions").assert().code(1);

    assert!(!ws.path().join("portal.db").exists());
}

#[test]
fn test_portal_command_creates_database() {
    let ws = Workspace::new(PROJECT_CONFIG);

    ws.cmd().arg("sweep").assert().success();

    assert!(ws.path().join("portal.db").exists());
}
