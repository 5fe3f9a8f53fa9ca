// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Trigger command - check whether an event starts a run

use colored::Colorize;
use miette::Result;
use std::path::Path;

use super::{load_workflow, EventArgs};
use crate::workflow::TriggerEvaluator;

/// Run the trigger command
pub async fn run(workflow_path: &Path, event: &EventArgs, verbose: bool) -> Result<()> {
    let workflow = load_workflow(workflow_path)?;
    let event = event.resolve()?;

    if verbose {
        println!("Event: {} on '{}'", event.kind, event.branch);
        if let Some(ref commit) = event.commit {
            println!("Commit: {}", commit);
        }
    }

    if TriggerEvaluator::should_run(&workflow.on, &event) {
        println!(
            "  {} {} on '{}' starts a run of '{}'",
            "✓".green(),
            event.kind,
            event.branch,
            workflow.name
        );
    } else {
        println!(
            "  {} {} on '{}' does not start a run of '{}'",
            "○".dimmed(),
            event.kind,
            event.branch,
            workflow.name
        );
    }

    Ok(())
}
