// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Step executors
//!
//! This module provides the executor trait and one implementation per
//! step action (checkout, setup-runtime, install, test, shell).

mod checkout;
mod dependencies;
mod runtime;
mod shell;

pub use checkout::CheckoutExecutor;
pub use dependencies::DependencyExecutor;
pub use runtime::{version_matches, RuntimeExecutor};
pub use shell::ShellExecutor;
pub use test::TestExecutor;

use async_trait::async_trait;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::process::Command;

use crate::errors::CiError;
use crate::host::Host;
use crate::secrets::{ProvisionedEnv, Redactor};
use crate::workflow::{Event, Step};

/// Exit code reported when a program could not be started
pub const EXIT_NOT_FOUND: i32 = 127;

/// Result of step execution
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Step name (filled in when the result is recorded)
    pub step: String,

    /// Whether execution succeeded
    pub success: bool,

    /// Standard output, secrets masked
    pub stdout: String,

    /// Standard error, secrets masked
    pub stderr: String,

    /// Exit code
    pub exit_code: i32,

    /// Execution duration
    pub duration: Duration,
}

impl StepResult {
    /// Create a successful result
    pub fn success(stdout: String, duration: Duration) -> Self {
        Self {
            step: String::new(),
            success: true,
            stdout,
            stderr: String::new(),
            exit_code: 0,
            duration,
        }
    }

    /// Create a failed result
    pub fn failure(stderr: String, exit_code: i32, duration: Duration) -> Self {
        Self {
            step: String::new(),
            success: false,
            stdout: String::new(),
            stderr,
            exit_code,
            duration,
        }
    }

    /// Append the result of a follow-up command run by the same step
    pub fn then(mut self, next: StepResult) -> Self {
        self.stdout.push_str(&next.stdout);
        self.stderr.push_str(&next.stderr);
        self.success = next.success;
        self.exit_code = next.exit_code;
        self.duration += next.duration;
        self
    }
}

/// Everything a step needs while it runs
pub struct StepContext<'a> {
    /// Host the run executes on
    pub host: &'a mut Host,
    /// Resolved environment for this step
    pub env: ProvisionedEnv,
    /// Event that started the run
    pub event: &'a Event,
    /// Masks secrets in captured output
    pub redactor: Redactor,
}

impl StepContext<'_> {
    /// Build a command that runs in `cwd` with the step environment
    pub fn command(&self, program: impl AsRef<OsStr>, cwd: &Path) -> Command {
        let mut cmd = Command::new(program);
        cmd.current_dir(cwd);
        cmd.envs(self.host.exports());
        cmd.envs(&self.env.vars);
        if let Some(path) = self.host.search_path() {
            cmd.env("PATH", path);
        }
        cmd.kill_on_drop(true);
        cmd
    }

    /// Run a command to completion and turn its exit status into a result
    pub async fn run(&self, mut cmd: Command, label: &str) -> StepResult {
        let start = Instant::now();
        tracing::debug!(command = label, "spawning");

        let output = match cmd.output().await {
            Ok(output) => output,
            Err(e) => {
                return StepResult::failure(
                    format!("Failed to start '{}': {}\n", label, e),
                    EXIT_NOT_FOUND,
                    start.elapsed(),
                );
            }
        };

        let duration = start.elapsed();
        let stdout = self.redactor.redact(&String::from_utf8_lossy(&output.stdout));
        let stderr = self.redactor.redact(&String::from_utf8_lossy(&output.stderr));

        // killed by a signal: no exit code
        let exit_code = output.status.code().unwrap_or(-1);

        StepResult {
            step: String::new(),
            success: output.status.success(),
            stdout,
            stderr,
            exit_code,
            duration,
        }
    }
}

/// Trait for step executors
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Execute a step
    ///
    /// A step that runs and fails is an `Ok` result with `success == false`;
    /// `Err` is reserved for steps the executor cannot handle at all.
    async fn execute(&self, step: &Step, ctx: &mut StepContext<'_>) -> Result<StepResult, CiError>;

    /// Check if the tools this executor drives are available
    async fn check_available(&self) -> Result<bool, CiError>;

    /// Validate step configuration
    fn validate_step(&self, step: &Step) -> Result<(), CiError>;
}

/// Create the standard executor set, keyed by action kind
pub fn create_default_executors() -> HashMap<String, Box<dyn StepExecutor>> {
    let mut executors: HashMap<String, Box<dyn StepExecutor>> = HashMap::new();

    // checkout needs git; a missing git shows up in the pre-flight tool check
    if let Ok(checkout) = CheckoutExecutor::new() {
        executors.insert("checkout".to_string(), Box::new(checkout));
    }

    executors.insert("setup-runtime".to_string(), Box::new(RuntimeExecutor::new()));
    executors.insert("install".to_string(), Box::new(DependencyExecutor::new()));
    executors.insert("test".to_string(), Box::new(TestExecutor::new()));
    executors.insert("shell".to_string(), Box::new(ShellExecutor::new()));

    executors
}

/// Failure reported by install and test steps that run before a runtime exists
pub(crate) fn missing_interpreter(step: &Step) -> StepResult {
    StepResult::failure(
        format!(
            "Step '{}' needs an interpreter but no runtime has been set up\n",
            step.name
        ),
        EXIT_NOT_FOUND,
        Duration::ZERO,
    )
}
