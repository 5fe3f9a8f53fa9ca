// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Error recovery suggestions
//!
//! Provides actionable suggestions after a run fails.

use std::path::Path;

use crate::workflow::StepPhase;

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
}

impl RecoverySuggestion {
    /// Suggestion for the phase a run failed in
    pub fn for_phase(phase: StepPhase, step: &str) -> Self {
        match phase {
            StepPhase::Fetching => Self::fix_checkout(step),
            StepPhase::ProvisioningRuntime => Self::install_runtime(step),
            StepPhase::InstallingDeps => Self::fix_dependencies(step),
            StepPhase::Testing => Self::fix_tests(step),
            StepPhase::RunningCommand => Self {
                action: format!("Fix command in step '{}'", step),
                steps: vec![
                    "The command exited with a non-zero status".into(),
                    "Re-run with --verbose to see its full output".into(),
                ],
                commands: vec![],
            },
        }
    }

    /// Suggest fixing a source checkout
    pub fn fix_checkout(step: &str) -> Self {
        Self {
            action: "Fix source checkout".into(),
            steps: vec![
                format!("Step '{}' could not fetch the repository snapshot", step),
                "Check the repository URL, your network and credentials".into(),
                "Make sure the commit reference exists on the remote".into(),
            ],
            commands: vec![
                "# Verify the remote is reachable:".into(),
                "git ls-remote <repository>".into(),
            ],
        }
    }

    /// Suggest installing the pinned interpreter
    pub fn install_runtime(step: &str) -> Self {
        Self {
            action: "Install the pinned Python version".into(),
            steps: vec![
                format!("Step '{}' could not find the requested interpreter", step),
                "The interpreter must be on PATH as python3.11, python3 or python".into(),
            ],
            commands: vec![
                "# Using pyenv:".into(),
                "pyenv install 3.11".into(),
                "".into(),
                "# Using apt (Debian/Ubuntu):".into(),
                "sudo apt install python3.11 python3.11-venv".into(),
            ],
        }
    }

    /// Suggest fixing the requirements manifest
    pub fn fix_dependencies(step: &str) -> Self {
        Self {
            action: "Fix the requirements manifest".into(),
            steps: vec![
                format!("Step '{}' failed to install dependencies", step),
                "Check for misspelled or nonexistent packages".into(),
                "Check version pins are available for this Python version".into(),
            ],
            commands: vec![
                "# Reproduce locally:".into(),
                "python -m pip install -r <requirements>".into(),
            ],
        }
    }

    /// Suggest fixing failing tests
    pub fn fix_tests(step: &str) -> Self {
        Self {
            action: "Fix failing tests".into(),
            steps: vec![
                format!("Step '{}' reported test failures", step),
                "Review the captured test output above".into(),
            ],
            commands: vec![
                "# Reproduce locally:".into(),
                "python -m pytest -x <test file>".into(),
            ],
        }
    }

    /// Suggest creating a workflow file
    pub fn create_workflow(path: &Path) -> Self {
        Self {
            action: "Create a workflow file".into(),
            steps: vec![
                format!("No workflow found at {}", path.display()),
                "Initialize the default workflow or write one manually".into(),
            ],
            commands: vec!["playbook-ci init".into()],
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestion_per_phase() {
        let s = RecoverySuggestion::for_phase(StepPhase::InstallingDeps, "deps");
        assert!(s.action.contains("requirements"));
        assert!(s.steps[0].contains("'deps'"));

        let s = RecoverySuggestion::for_phase(StepPhase::ProvisioningRuntime, "python");
        assert!(s.commands.iter().any(|c| c.contains("3.11")));
    }

    #[test]
    fn test_display_includes_commands() {
        let rendered = RecoverySuggestion::fix_tests("tests").to_string();
        assert!(rendered.starts_with("→ Fix failing tests"));
        assert!(rendered.contains("pytest"));
    }
}
