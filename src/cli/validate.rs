// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Validate command - check workflow configuration

use colored::Colorize;
use miette::Result;
use std::path::Path;

use super::load_workflow;
use crate::workflow::WorkflowValidator;

/// Run the validate command
pub async fn run(workflow_path: &Path, verbose: bool) -> Result<()> {
    println!("{}", "Validating workflow...".bold());
    println!();

    let workflow = match load_workflow(workflow_path) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("  {} Failed to load workflow", "✗".red());
            eprintln!();
            return Err(e.into());
        }
    };

    println!("  {} Workflow file parses", "✓".green());

    let validation = WorkflowValidator::validate(&workflow)?;

    // the checkout may be a different tree, so missing files only warn
    let cwd = std::env::current_dir()
        .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;
    let missing_files = WorkflowValidator::validate_files(&workflow, &cwd);

    if !validation.errors.is_empty() {
        println!();
        println!("{}:", "Errors".red().bold());
        for error in &validation.errors {
            println!("  {} {}", "✗".red(), error);
        }
    }

    if !missing_files.is_empty() {
        println!();
        println!("{}:", "Missing files".yellow().bold());
        for missing in &missing_files {
            println!("  {} {}", "⚠".yellow(), missing);
        }
    }

    if !validation.warnings.is_empty() {
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &validation.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    if verbose {
        println!();
        println!("{}:", "Workflow summary".bold());
        println!("  Name: {}", workflow.name);
        println!("  Steps: {}", workflow.steps.len());
        for step in &workflow.steps {
            println!(
                "    - {} ({}) {}",
                step.name,
                step.action.kind(),
                step.action.summary().dimmed()
            );
        }
    }

    println!();

    if !validation.is_valid() {
        return Err(miette::miette!("Workflow validation failed"));
    }

    if validation.has_warnings() || !missing_files.is_empty() {
        println!("{}", "Workflow is valid but has warnings.".yellow().bold());
    } else {
        println!("{}", "Workflow is valid!".green().bold());
    }

    Ok(())
}
