// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Workflow validation
//!
//! Validates workflow configuration before any run starts.

use std::collections::HashSet;
use std::path::Path;

use crate::errors::CiError;
use crate::secrets::EnvironmentProvisioner;
use crate::workflow::{Action, TriggerEvaluator, Workflow};

/// Workflow validator
pub struct WorkflowValidator;

impl WorkflowValidator {
    /// Validate a workflow configuration
    pub fn validate(workflow: &Workflow) -> Result<ValidationResult, CiError> {
        let mut result = ValidationResult::new();

        if workflow.steps.is_empty() {
            result.add_error("Workflow has no steps defined");
        }

        if workflow.on.is_empty() {
            result.add_warning("Workflow has no triggers - no event will ever start a run");
        }

        for (pattern, error) in TriggerEvaluator::invalid_patterns(&workflow.on) {
            result.add_error(&format!("Invalid branch pattern '{}': {}", pattern, error));
        }

        let mut seen_names = HashSet::new();
        for step in &workflow.steps {
            if step.name.trim().is_empty() {
                result.add_error("Step with an empty name");
            } else if !seen_names.insert(&step.name) {
                result.add_error(&format!("Duplicate step name: '{}'", step.name));
            }
        }

        Self::validate_runtime_order(workflow, &mut result);
        Self::validate_checkout(workflow, &mut result);

        for step in &workflow.steps {
            Self::validate_action(&step.name, &step.action, &mut result);
        }

        let provisioner = EnvironmentProvisioner::new();
        let step_envs = workflow.steps.iter().flat_map(|s| s.env.iter());
        for (key, value) in workflow.env.iter().chain(step_envs) {
            for expr in provisioner.unsupported_expressions(value) {
                result.add_warning(&format!(
                    "env '{}': expression '{}' is not supported and will be kept verbatim",
                    key, expr
                ));
            }
        }

        Ok(result)
    }

    /// At most one runtime setup; install and test steps need it to come first
    fn validate_runtime_order(workflow: &Workflow, result: &mut ValidationResult) {
        let runtime_steps: Vec<usize> = workflow
            .steps
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s.action, Action::SetupRuntime { .. }))
            .map(|(i, _)| i)
            .collect();

        if runtime_steps.len() > 1 {
            result.add_error(&format!(
                "Workflow sets up a runtime {} times; at most one setup-runtime step is allowed",
                runtime_steps.len()
            ));
        }

        let first_runtime = runtime_steps.first().copied();

        for (idx, step) in workflow.steps.iter().enumerate() {
            if !matches!(step.action, Action::Install { .. } | Action::Test { .. }) {
                continue;
            }

            match first_runtime {
                None => result.add_error(&format!(
                    "Step '{}' ({}) needs an interpreter but the workflow has no setup-runtime step",
                    step.name,
                    step.action.kind()
                )),
                Some(rt) if idx < rt => result.add_error(&format!(
                    "Step '{}' ({}) runs before the runtime is set up in step '{}'",
                    step.name,
                    step.action.kind(),
                    workflow.steps[rt].name
                )),
                Some(_) => {}
            }
        }
    }

    fn validate_checkout(workflow: &Workflow, result: &mut ValidationResult) {
        let checkout = workflow
            .steps
            .iter()
            .position(|s| matches!(s.action, Action::Checkout { .. }));

        match checkout {
            None if !workflow.steps.is_empty() => result.add_warning(
                "Workflow has no checkout step - steps will run in an empty workspace",
            ),
            Some(idx) if idx > 0 => result.add_warning(&format!(
                "Checkout step '{}' is not the first step",
                workflow.steps[idx].name
            )),
            _ => {}
        }
    }

    fn validate_action(name: &str, action: &Action, result: &mut ValidationResult) {
        match action {
            Action::Checkout { .. } => {}
            Action::SetupRuntime { version, .. } => {
                if version.trim().is_empty() {
                    result.add_error(&format!("Step '{}': Runtime version is empty", name));
                }
            }
            Action::Install { requirements, .. } => {
                if requirements.as_os_str().is_empty() {
                    result.add_error(&format!("Step '{}': Requirements path is empty", name));
                }
            }
            Action::Test {
                target,
                working_directory,
                ..
            } => {
                if target.trim().is_empty() {
                    result.add_error(&format!("Step '{}': Test target is empty", name));
                }
                if working_directory.is_absolute() {
                    result.add_warning(&format!(
                        "Step '{}': Absolute working directory escapes the run workspace",
                        name
                    ));
                }
            }
            Action::Shell { command, shell, .. } => {
                if command.trim().is_empty() {
                    result.add_error(&format!("Step '{}': Shell command is empty", name));
                }
                if shell.trim().is_empty() {
                    result.add_error(&format!("Step '{}': Shell is empty", name));
                }
            }
        }
    }

    /// Check the files the workflow expects inside a source tree
    pub fn validate_files(workflow: &Workflow, source_root: &Path) -> Vec<String> {
        let mut missing = Vec::new();

        for step in &workflow.steps {
            match &step.action {
                Action::Install { requirements, .. } => {
                    if !source_root.join(requirements).exists() {
                        missing.push(format!(
                            "Step '{}': Requirements manifest not found: {}",
                            step.name,
                            requirements.display()
                        ));
                    }
                }
                Action::Test {
                    working_directory,
                    target,
                    ..
                } => {
                    let test_file = working_directory.join(target);
                    if !source_root.join(&test_file).exists() {
                        missing.push(format!(
                            "Step '{}': Test file not found: {}",
                            step.name,
                            test_file.display()
                        ));
                    }
                }
                _ => {}
            }
        }

        missing
    }
}

/// Result of workflow validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
