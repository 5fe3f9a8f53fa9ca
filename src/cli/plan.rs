// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Plan command - show the ordered steps of a workflow

use colored::Colorize;
use miette::Result;
use std::path::Path;

use super::load_workflow;

/// Run the plan command
pub async fn run(workflow_path: &Path, verbose: bool) -> Result<()> {
    let workflow = load_workflow(workflow_path)?;

    println!("{}: {}", "Workflow".bold(), workflow.name);
    if let Some(ref description) = workflow.description {
        println!("{}", description.dimmed());
    }
    println!("{}", "═".repeat(50));

    let triggers: Vec<String> = [
        ("push", &workflow.on.push),
        ("pull_request", &workflow.on.pull_request),
    ]
    .into_iter()
    .filter_map(|(kind, filter)| {
        filter.as_ref().map(|f| {
            if f.branches.is_empty() {
                format!("{} (any branch)", kind)
            } else {
                format!("{} ({})", kind, f.branches.join(", "))
            }
        })
    })
    .collect();

    if triggers.is_empty() {
        println!("Triggers: {}", "none".yellow());
    } else {
        println!("Triggers: {}", triggers.join(", "));
    }
    println!();

    print!("{}", workflow.render_plan());

    if verbose && !workflow.env.is_empty() {
        println!();
        println!("{}:", "Environment".bold());
        for (key, value) in &workflow.env {
            println!("  {}={}", key, value.dimmed());
        }
    }

    Ok(())
}
