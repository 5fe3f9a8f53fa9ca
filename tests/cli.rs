// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use std::process::Command as StdCommand;
use tempfile::TempDir;

fn playbook_ci(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("playbook-ci").unwrap();
    cmd.current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("PLAYBOOK_CI_WORKFLOW")
        .env_remove("PLAYBOOK_CI_SECRETS_FILE")
        .env_remove("PLAYBOOK_CI_HISTORY_DIR");
    cmd
}

fn write_workflow(dir: &Path, body: &str) {
    std::fs::write(dir.join(".playbook-ci.yaml"), body).unwrap();
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = StdCommand::new("git")
        .args(["-c", "user.name=ci", "-c", "user.email=ci@example.com"])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(output.status.success(), "git {:?} failed", args);
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn has_git() -> bool {
    StdCommand::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

/// python3.11 that can create virtual environments
fn has_python311() -> bool {
    StdCommand::new("python3.11")
        .args(["-c", "import ensurepip, venv"])
        .output()
        .is_ok_and(|o| o.status.success())
}

/// Commit every file in `dir`, initialising the repository on first use
fn commit_all(dir: &Path, message: &str) -> String {
    if !dir.join(".git").exists() {
        git(dir, &["init", "--quiet"]);
    }
    git(dir, &["add", "."]);
    git(dir, &["commit", "--quiet", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
}

const SHELL_WORKFLOW: &str = r#"
name: shell-checks
on:
  push:
    branches: [main, "release/*"]
env:
  TOKEN: ${{ secrets.TOKEN }}
steps:
  - name: first
    action:
      type: shell
      command: touch ran-first && echo "token is $TOKEN"
  - name: second
    action:
      type: shell
      command: echo second
"#;

const FAILING_WORKFLOW: &str = r#"
name: fails-early
on:
  push:
    branches: [main]
steps:
  - name: first
    action:
      type: shell
      command: touch ran-first && exit 2
  - name: second
    action:
      type: shell
      command: touch never-ran
"#;

#[test]
fn init_writes_a_valid_workflow() {
    let dir = TempDir::new().unwrap();

    playbook_ci(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created .playbook-ci.yaml"));

    assert!(dir.path().join(".playbook-ci.yaml").exists());

    // requirements and tests live in the checkout, so their absence only warns
    playbook_ci(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Missing files"));

    playbook_ci(dir.path()).arg("init").assert().failure();
    playbook_ci(dir.path()).args(["init", "--force"]).assert().success();
}

#[test]
fn plan_lists_steps_in_order() {
    let dir = TempDir::new().unwrap();
    playbook_ci(dir.path()).arg("init").assert().success();

    playbook_ci(dir.path())
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. checkout [fetching]"))
        .stdout(predicate::str::contains("4. run-tests [testing] pytest test_auth.py"));
}

#[test]
fn trigger_reports_matching_events() {
    let dir = TempDir::new().unwrap();
    playbook_ci(dir.path()).arg("init").assert().success();

    playbook_ci(dir.path())
        .args(["trigger", "--event", "pull-request", "--branch", "main"])
        .assert()
        .success()
        .stdout(predicate::str::contains("starts a run"));

    playbook_ci(dir.path())
        .args(["trigger", "--event", "pull-request", "--branch", "feature/x"])
        .assert()
        .success()
        .stdout(predicate::str::contains("does not start a run"));
}

#[test]
fn trigger_reads_webhook_payload() {
    let dir = TempDir::new().unwrap();
    playbook_ci(dir.path()).arg("init").assert().success();
    std::fs::write(
        dir.path().join("event.json"),
        r#"{"ref": "refs/heads/main", "after": "0123abcd"}"#,
    )
    .unwrap();

    playbook_ci(dir.path())
        .args(["-v", "trigger", "--event", "push", "--payload", "event.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Commit: 0123abcd"))
        .stdout(predicate::str::contains("starts a run"));
}

#[test]
fn run_succeeds_and_masks_secrets() {
    let dir = TempDir::new().unwrap();
    write_workflow(dir.path(), SHELL_WORKFLOW);
    std::fs::write(dir.path().join("secrets.env"), "TOKEN=hunter2\n").unwrap();

    playbook_ci(dir.path())
        .args([
            "-v",
            "run",
            "--event",
            "push",
            "--branch",
            "release/2.0",
            "--secrets-file",
            "secrets.env",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("token is ***"))
        .stdout(predicate::str::contains("succeeded"))
        .stdout(predicate::str::contains("hunter2").not());

    playbook_ci(dir.path())
        .args(["history", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("shell-checks"));
}

#[test]
fn run_stops_at_first_failure() {
    let dir = TempDir::new().unwrap();
    write_workflow(dir.path(), FAILING_WORKFLOW);
    let host = dir.path().join("host");

    playbook_ci(dir.path())
        .args(["run", "--branch", "main", "--no-history", "--workspace"])
        .arg(&host)
        .assert()
        .failure()
        .stdout(predicate::str::contains("first failed (exit code 2)"));

    assert!(host.join("workspace").join("ran-first").exists());
    assert!(!host.join("workspace").join("never-ran").exists());
}

#[test]
fn unmatched_event_starts_no_run() {
    let dir = TempDir::new().unwrap();
    write_workflow(dir.path(), FAILING_WORKFLOW);

    playbook_ci(dir.path())
        .args(["run", "--event", "pr", "--branch", "feature/x"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No run started"));

    assert!(!dir.path().join(".playbook-ci").exists());
}

#[test]
fn unmatched_event_needs_no_tools() {
    let dir = TempDir::new().unwrap();
    playbook_ci(dir.path()).arg("init").assert().success();

    playbook_ci(dir.path())
        .env("PATH", "/nonexistent")
        .args(["run", "--event", "pr", "--branch", "feature/x"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No run started"))
        .stderr(predicate::str::contains("Missing required tools").not());
}

const CHECKOUT_WORKFLOW: &str = r#"
name: checkout-marker
on:
  push:
    branches: [main]
steps:
  - name: checkout
    action:
      type: checkout
  - name: marker
    action:
      type: shell
      command: test -f marker.txt && echo "workspace=$PLAYBOOK_CI_WORKSPACE"
"#;

#[test]
fn relative_workspace_and_repository() {
    if !has_git() {
        return;
    }
    let dir = TempDir::new().unwrap();
    write_workflow(dir.path(), CHECKOUT_WORKFLOW);

    let repo = dir.path().join("repo");
    std::fs::create_dir(&repo).unwrap();
    std::fs::write(repo.join("marker.txt"), "here\n").unwrap();
    commit_all(&repo, "marker");

    playbook_ci(dir.path())
        .args([
            "-v",
            "run",
            "--branch",
            "main",
            "--repository",
            "repo",
            "--workspace",
            "host",
            "--no-history",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("workspace=/"))
        .stdout(predicate::str::contains("host/workspace"));

    assert!(dir.path().join("host/workspace/marker.txt").exists());
    assert!(!dir.path().join("host/host").exists());
}

const PYTHON_WORKFLOW: &str = r#"
name: playbook-utils-tests
on:
  push:
    branches: [main]
steps:
  - name: checkout
    action:
      type: checkout
  - name: setup-python
    action:
      type: setup-runtime
      version: "3.11"
  - name: install-dependencies
    action:
      type: install
      requirements: houdini/python3.11libs/playbook_utils/requirements.txt
      upgrade_installer: false
  - name: run-tests
    action:
      type: test
      working_directory: houdini/python3.11libs/playbook_utils
      target: test_auth.py
      runner: unittest
"#;

const PASSING_TEST: &str = r#"
import unittest

class AuthTest(unittest.TestCase):
    def test_token(self):
        self.assertEqual("abc".upper(), "ABC")
"#;

#[test]
fn python_workflow_passes_then_fails_on_assertion() {
    if !has_git() || !has_python311() {
        return;
    }
    let dir = TempDir::new().unwrap();
    write_workflow(dir.path(), PYTHON_WORKFLOW);

    let repo = dir.path().join("repo");
    let package = repo.join("houdini/python3.11libs/playbook_utils");
    std::fs::create_dir_all(&package).unwrap();
    std::fs::write(package.join("requirements.txt"), "").unwrap();
    std::fs::write(package.join("test_auth.py"), PASSING_TEST).unwrap();
    let passing = commit_all(&repo, "passing tests");

    std::fs::write(
        package.join("test_auth.py"),
        PASSING_TEST.replace("\"ABC\"", "\"XYZ\""),
    )
    .unwrap();
    commit_all(&repo, "broken assertion");

    playbook_ci(dir.path())
        .args(["run", "--branch", "main", "--no-history", "--repository", "repo"])
        .args(["--commit", &passing])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ran 1 test"))
        .stdout(predicate::str::contains("succeeded"));

    playbook_ci(dir.path())
        .args(["run", "--branch", "main", "--no-history", "--repository", "repo"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("run-tests failed (exit code 1)"))
        .stdout(predicate::str::contains("AssertionError"));
}

#[test]
fn dry_run_executes_nothing() {
    let dir = TempDir::new().unwrap();
    write_workflow(dir.path(), FAILING_WORKFLOW);

    playbook_ci(dir.path())
        .args(["run", "--branch", "main", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Execution plan (2 steps)"));
}

#[test]
fn history_records_failed_runs() {
    let dir = TempDir::new().unwrap();
    write_workflow(dir.path(), FAILING_WORKFLOW);
    let history = dir.path().join("runs");

    playbook_ci(dir.path())
        .args(["run", "--branch", "main", "--history-dir"])
        .arg(&history)
        .assert()
        .failure();

    playbook_ci(dir.path())
        .args(["history", "--history-dir"])
        .arg(&history)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Runs:      1"))
        .stdout(predicate::str::contains("Failed:    1"));

    playbook_ci(dir.path())
        .args(["history", "--history-dir"])
        .arg(&history)
        .args(["clear", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("History cleared."));
}

#[test]
fn missing_workflow_is_reported() {
    let dir = TempDir::new().unwrap();

    playbook_ci(dir.path())
        .args(["run", "--branch", "main"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Workflow file not found"));
}
