// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Dependency executor
//!
//! Upgrades pip, then installs a requirements manifest. The install never
//! runs after a failed upgrade.

use async_trait::async_trait;
use std::time::Duration;

use super::{missing_interpreter, StepContext, StepExecutor, StepResult};
use crate::errors::CiError;
use crate::workflow::{Action, Step};

/// Dependency executor
pub struct DependencyExecutor;

impl DependencyExecutor {
    /// Create a new dependency executor
    pub fn new() -> Self {
        Self
    }
}

impl Default for DependencyExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StepExecutor for DependencyExecutor {
    async fn execute(&self, step: &Step, ctx: &mut StepContext<'_>) -> Result<StepResult, CiError> {
        let Action::Install {
            requirements,
            upgrade_installer,
        } = &step.action
        else {
            return Err(CiError::InvalidStep {
                step: step.name.clone(),
                reason: "Expected install action".to_string(),
            });
        };

        let Some(python) = ctx.host.interpreter().map(|p| p.to_path_buf()) else {
            return Ok(missing_interpreter(step));
        };

        let workspace = ctx.host.workspace().to_path_buf();
        let manifest = workspace.join(requirements);

        if !manifest.is_file() {
            return Ok(StepResult::failure(
                format!(
                    "Requirements manifest not found: {}\n",
                    requirements.display()
                ),
                1,
                Duration::ZERO,
            ));
        }

        let mut result = StepResult::success(String::new(), Duration::ZERO);

        if *upgrade_installer {
            let mut upgrade = ctx.command(&python, &workspace);
            upgrade
                .args(["-m", "pip", "install", "--upgrade", "pip"])
                .arg("--disable-pip-version-check");

            result = result.then(ctx.run(upgrade, "pip install --upgrade pip").await);
            if !result.success {
                return Ok(result);
            }
        }

        tracing::info!(manifest = %requirements.display(), "installing dependencies");

        let mut install = ctx.command(&python, &workspace);
        install
            .args(["-m", "pip", "install", "--disable-pip-version-check", "-r"])
            .arg(&manifest);

        Ok(result.then(ctx.run(install, "pip install -r").await))
    }

    async fn check_available(&self) -> Result<bool, CiError> {
        // pip comes with the provisioned runtime
        Ok(true)
    }

    fn validate_step(&self, step: &Step) -> Result<(), CiError> {
        match &step.action {
            Action::Install { requirements, .. } if requirements.as_os_str().is_empty() => {
                Err(CiError::InvalidStep {
                    step: step.name.clone(),
                    reason: "Requirements path is empty".to_string(),
                })
            }
            Action::Install { .. } => Ok(()),
            _ => Err(CiError::InvalidStep {
                step: step.name.clone(),
                reason: "Not an install step".to_string(),
            }),
        }
    }
}
