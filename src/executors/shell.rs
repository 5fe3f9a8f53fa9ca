// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Shell executor
//!
//! Executes arbitrary shell commands inside the run workspace.

use async_trait::async_trait;

use super::{StepContext, StepExecutor, StepResult};
use crate::errors::CiError;
use crate::workflow::{Action, Step};

/// Shell executor
pub struct ShellExecutor;

impl ShellExecutor {
    /// Create a new shell executor
    pub fn new() -> Self {
        Self
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StepExecutor for ShellExecutor {
    async fn execute(&self, step: &Step, ctx: &mut StepContext<'_>) -> Result<StepResult, CiError> {
        let Action::Shell {
            command,
            shell,
            working_directory,
        } = &step.action
        else {
            return Err(CiError::InvalidStep {
                step: step.name.clone(),
                reason: "Expected shell action".to_string(),
            });
        };

        let cwd = match working_directory {
            Some(dir) => ctx.host.workspace().join(dir),
            None => ctx.host.workspace().to_path_buf(),
        };

        let mut cmd = ctx.command(shell, &cwd);
        cmd.arg("-c").arg(command);

        Ok(ctx.run(cmd, shell).await)
    }

    async fn check_available(&self) -> Result<bool, CiError> {
        // Shell is always available (we assume basic shell exists)
        Ok(true)
    }

    fn validate_step(&self, step: &Step) -> Result<(), CiError> {
        let Action::Shell { command, .. } = &step.action else {
            return Err(CiError::InvalidStep {
                step: step.name.clone(),
                reason: "Not a shell step".to_string(),
            });
        };

        if command.is_empty() {
            return Err(CiError::InvalidStep {
                step: step.name.clone(),
                reason: "Shell command is empty".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::testing::Fixture;

    fn make_shell_step(name: &str, command: &str) -> Step {
        Step::new(
            name,
            Action::Shell {
                command: command.into(),
                shell: "bash".into(),
                working_directory: None,
            },
        )
    }

    #[test]
    fn test_validate_shell_step() {
        let executor = ShellExecutor::new();
        let step = make_shell_step("test", "echo hello");
        assert!(executor.validate_step(&step).is_ok());
    }

    #[test]
    fn test_validate_empty_command_fails() {
        let executor = ShellExecutor::new();
        let step = make_shell_step("test", "");
        assert!(executor.validate_step(&step).is_err());
    }

    #[tokio::test]
    async fn test_execute_simple_command() {
        let executor = ShellExecutor::new();
        let step = make_shell_step("test", "echo hello");
        let mut fixture = Fixture::new();

        let result = executor
            .execute(&step, &mut fixture.context())
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_runs_in_workspace_with_exit_code() {
        let executor = ShellExecutor::new();
        let step = make_shell_step("test", "touch marker && exit 4");
        let mut fixture = Fixture::new();

        let result = executor
            .execute(&step, &mut fixture.context())
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.exit_code, 4);
        assert!(fixture.host.workspace().join("marker").exists());
    }

    #[tokio::test]
    async fn test_wrong_action_rejected() {
        let executor = ShellExecutor::new();
        let step = Step::new(
            "checkout",
            Action::Checkout {
                repository: None,
                reference: None,
            },
        );
        let mut fixture = Fixture::new();

        assert!(executor.execute(&step, &mut fixture.context()).await.is_err());
    }
}
