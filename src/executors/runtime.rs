// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Runtime executor
//!
//! Finds an interpreter of the pinned version and gives the run its own
//! virtual environment, so later installs never touch the system Python.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::process::Command;

use super::{StepContext, StepExecutor, StepResult, EXIT_NOT_FOUND};
use crate::errors::CiError;
use crate::workflow::{Action, Language, Step};

/// Runtime executor
pub struct RuntimeExecutor;

impl RuntimeExecutor {
    /// Create a new runtime executor
    pub fn new() -> Self {
        Self
    }

    /// Executable names to try for a version, most specific first
    fn candidates(language: Language, version: &str) -> Vec<String> {
        match language {
            Language::Python => {
                let major = version.split('.').next().unwrap_or(version);
                vec![
                    format!("python{}", version),
                    format!("python{}", major),
                    "python".to_string(),
                ]
            }
        }
    }

    /// First interpreter on PATH reporting the requested version
    async fn locate(language: Language, version: &str) -> Option<(PathBuf, String)> {
        for candidate in Self::candidates(language, version) {
            let Ok(path) = which::which(&candidate) else {
                continue;
            };

            let Ok(output) = Command::new(&path).arg("--version").output().await else {
                continue;
            };

            // Python 2 printed its version on stderr
            let reported = format!(
                "{}{}",
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );

            tracing::debug!(candidate = %path.display(), reported = reported.trim(), "probing interpreter");

            if version_matches(version, &reported) {
                return Some((path, reported.trim().to_string()));
            }
        }

        None
    }

    fn venv_bin(venv: &Path) -> PathBuf {
        if cfg!(windows) {
            venv.join("Scripts")
        } else {
            venv.join("bin")
        }
    }
}

impl Default for RuntimeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether `reported` (e.g. "Python 3.11.4") satisfies `requested` (e.g. "3.11")
pub fn version_matches(requested: &str, reported: &str) -> bool {
    let Some(found) = reported
        .split_whitespace()
        .find(|w| w.chars().next().is_some_and(|c| c.is_ascii_digit()))
    else {
        return false;
    };

    let found: Vec<&str> = found.split('.').collect();
    let wanted: Vec<&str> = requested.trim().split('.').collect();

    wanted.len() <= found.len() && wanted.iter().zip(found.iter()).all(|(w, f)| w == f)
}

#[async_trait]
impl StepExecutor for RuntimeExecutor {
    async fn execute(&self, step: &Step, ctx: &mut StepContext<'_>) -> Result<StepResult, CiError> {
        let Action::SetupRuntime { language, version } = &step.action else {
            return Err(CiError::InvalidStep {
                step: step.name.clone(),
                reason: "Expected setup-runtime action".to_string(),
            });
        };

        let start = Instant::now();

        let Some((interpreter, reported)) = Self::locate(*language, version).await else {
            return Ok(StepResult::failure(
                format!(
                    "{} {} is not available on this host (tried: {})\n",
                    language,
                    version,
                    Self::candidates(*language, version).join(", ")
                ),
                EXIT_NOT_FOUND,
                start.elapsed(),
            ));
        };

        tracing::info!(interpreter = %interpreter.display(), version = %reported, "provisioning runtime");

        let venv = ctx.host.tools_dir().join("venv");
        let mut cmd = ctx.command(&interpreter, ctx.host.root());
        cmd.arg("-m").arg("venv").arg(&venv);

        let mut result = ctx.run(cmd, "python -m venv").await;
        if !result.success {
            return Ok(result);
        }

        let bin = Self::venv_bin(&venv);
        let python = bin.join(if cfg!(windows) { "python.exe" } else { "python" });

        ctx.host.prepend_path(bin);
        ctx.host.export("VIRTUAL_ENV", venv.display().to_string());
        ctx.host.set_interpreter(python);

        result.stdout.push_str(&format!("Using {} ({})\n", reported, interpreter.display()));
        Ok(result)
    }

    async fn check_available(&self) -> Result<bool, CiError> {
        // availability depends on the requested version; checked when the step runs
        Ok(true)
    }

    fn validate_step(&self, step: &Step) -> Result<(), CiError> {
        let Action::SetupRuntime { version, .. } = &step.action else {
            return Err(CiError::InvalidStep {
                step: step.name.clone(),
                reason: "Not a setup-runtime step".to_string(),
            });
        };

        if version.trim().is_empty() {
            return Err(CiError::InvalidStep {
                step: step.name.clone(),
                reason: "Runtime version is empty".to_string(),
            });
        }

        Ok(())
    }
}
