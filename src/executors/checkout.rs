// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Checkout executor
//!
//! Clones the repository into the run workspace and detaches at the
//! triggering commit.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{StepContext, StepExecutor, StepResult};
use crate::errors::CiError;
use crate::workflow::{Action, Step};

/// Checkout executor
pub struct CheckoutExecutor {
    /// Path to git binary
    git_bin: PathBuf,
}

impl CheckoutExecutor {
    /// Create a new checkout executor
    pub fn new() -> Result<Self, CiError> {
        let git_bin = which::which("git").map_err(|_| CiError::tool_not_found("git"))?;

        Ok(Self { git_bin })
    }

    /// Repository and reference for a checkout, falling back to the event
    fn resolve_source(
        repository: &Option<String>,
        reference: &Option<String>,
        ctx: &StepContext<'_>,
    ) -> Result<(String, Option<String>), CiError> {
        let cwd = std::env::current_dir()?;
        let repository = match repository.as_ref().or(ctx.event.repository.as_ref()) {
            // git runs inside the host, so local paths are anchored to the caller's cwd
            Some(repo) if Path::new(repo).is_relative() && Path::new(repo).exists() => {
                cwd.join(repo).display().to_string()
            }
            Some(repo) => repo.clone(),
            None => cwd.display().to_string(),
        };

        let reference = reference.clone().or_else(|| ctx.event.commit.clone());

        Ok((repository, reference))
    }
}

#[async_trait]
impl StepExecutor for CheckoutExecutor {
    async fn execute(&self, step: &Step, ctx: &mut StepContext<'_>) -> Result<StepResult, CiError> {
        let Action::Checkout {
            repository,
            reference,
        } = &step.action
        else {
            return Err(CiError::InvalidStep {
                step: step.name.clone(),
                reason: "Expected checkout action".to_string(),
            });
        };

        let (repository, reference) = Self::resolve_source(repository, reference, ctx)?;
        let workspace = ctx.host.workspace().to_path_buf();

        tracing::info!(
            repository = %repository,
            reference = reference.as_deref().unwrap_or("HEAD"),
            "fetching source"
        );

        let mut clone = ctx.command(&self.git_bin, ctx.host.root());
        clone
            .arg("clone")
            .arg("--quiet")
            .arg(&repository)
            .arg(&workspace);

        let result = ctx.run(clone, "git clone").await;
        let Some(reference) = reference else {
            return Ok(result);
        };
        if !result.success {
            return Ok(result);
        }

        let mut checkout = ctx.command(&self.git_bin, &workspace);
        checkout
            .arg("checkout")
            .arg("--quiet")
            .arg("--detach")
            .arg(&reference);

        Ok(result.then(ctx.run(checkout, "git checkout").await))
    }

    async fn check_available(&self) -> Result<bool, CiError> {
        Ok(self.git_bin.exists())
    }

    fn validate_step(&self, step: &Step) -> Result<(), CiError> {
        match &step.action {
            Action::Checkout {
                repository: Some(repo),
                ..
            } if repo.trim().is_empty() => Err(CiError::InvalidStep {
                step: step.name.clone(),
                reason: "Repository is empty".to_string(),
            }),
            Action::Checkout { .. } => Ok(()),
            _ => Err(CiError::InvalidStep {
                step: step.name.clone(),
                reason: "Not a checkout step".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::testing::Fixture;
    use std::process::Command as StdCommand;

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

    /// Repository with two commits; returns (dir, first commit)
    fn make_repo() -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        git(dir.path(), &["init", "--quiet"]);
        std::fs::write(dir.path().join("version.txt"), "one\n").unwrap();
        git(dir.path(), &["add", "."]);
        git(dir.path(), &["commit", "--quiet", "-m", "first"]);
        let first = git(dir.path(), &["rev-parse", "HEAD"]);
        std::fs::write(dir.path().join("version.txt"), "two\n").unwrap();
        git(dir.path(), &["commit", "--quiet", "-am", "second"]);
        (dir, first)
    }

    fn checkout_step(repository: Option<String>) -> Step {
        Step::new(
            "checkout",
            Action::Checkout {
                repository,
                reference: None,
            },
        )
    }

    #[tokio::test]
    async fn test_checkout_event_commit() {
        let Ok(executor) = CheckoutExecutor::new() else {
            return;
        };
        let (repo, first) = make_repo();

        let mut fixture = Fixture::new();
        fixture.event = fixture
            .event
            .clone()
            .with_repository(repo.path().display().to_string())
            .with_commit(first);

        let result = executor
            .execute(&checkout_step(None), &mut fixture.context())
            .await
            .unwrap();

        assert!(result.success, "{}", result.stderr);
        let content =
            std::fs::read_to_string(fixture.host.workspace().join("version.txt")).unwrap();
        assert_eq!(content, "one\n");
    }

    #[tokio::test]
    async fn test_checkout_unknown_repository_fails() {
        let Ok(executor) = CheckoutExecutor::new() else {
            return;
        };
        let mut fixture = Fixture::new();
        let step = checkout_step(Some("/nonexistent/repository.git".into()));

        let result = executor
            .execute(&step, &mut fixture.context())
            .await
            .unwrap();

        assert!(!result.success);
        assert_ne!(result.exit_code, 0);
    }

    #[test]
    fn test_validate_empty_repository() {
        let Ok(executor) = CheckoutExecutor::new() else {
            return;
        };
        assert!(executor
            .validate_step(&checkout_step(Some("  ".into())))
            .is_err());
        assert!(executor.validate_step(&checkout_step(None)).is_ok());
    }
}
