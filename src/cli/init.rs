// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Init command - write the default workflow

use colored::Colorize;
use miette::Result;
use std::path::Path;

use crate::errors::CiError;
use crate::workflow::{Workflow, REQUIRED_SECRETS};

/// Run the init command
pub async fn run(workflow_path: &Path, force: bool, verbose: bool) -> Result<()> {
    println!("{}", "Initializing playbook-ci...".bold());
    println!();

    if workflow_path.exists() && !force {
        return Err(miette::miette!(
            help = "Pass --force to overwrite it",
            "{} already exists",
            workflow_path.display()
        ));
    }

    let content = render(workflow_path)?;

    std::fs::write(workflow_path, &content).map_err(|e| CiError::FileWriteError {
        path: workflow_path.to_path_buf(),
        error: e.to_string(),
    })?;

    println!("  {} Created {}", "✓".green(), workflow_path.display());

    println!();
    println!("{}", "Workflow initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!(
        "  1. Provide the secrets {} in the environment or a --secrets-file",
        REQUIRED_SECRETS.join(", ").cyan()
    );
    println!("  2. Run {} to check the workflow", "playbook-ci validate".cyan());
    println!(
        "  3. Run {} to test it",
        "playbook-ci run --event push --branch main".cyan()
    );
    println!();

    if verbose {
        println!("{}", "Generated workflow:".dimmed());
        println!("{}", "─".repeat(50).dimmed());
        println!("{}", content.dimmed());
    }

    Ok(())
}

/// Default workflow in the format implied by the file extension
fn render(path: &Path) -> Result<String, CiError> {
    let workflow = Workflow::playbook_default();

    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(serde_json::to_string_pretty(&workflow)? + "\n"),
        Some("toml") => toml::to_string_pretty(&workflow).map_err(|e| CiError::Toml {
            message: e.to_string(),
        }),
        None | Some("yaml") | Some("yml") => Ok(format!(
            "# playbook-ci workflow\n\
             # Runs the playbook_utils tests on pushes and pull requests to main.\n\n\
             {}\n\
             # Add more steps as needed:\n\
             # - name: lint\n\
             #   action:\n\
             #     type: shell\n\
             #     command: python -m flake8 .\n",
            workflow.to_yaml()?
        )),
        Some(other) => Err(CiError::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}
