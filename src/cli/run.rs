// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Run command - execute the workflow for an event

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::{load_workflow, secret_store, EventArgs, HistoryArgs};
use crate::errors::CiError;
use crate::executors::create_default_executors;
use crate::workflow::{
    ExecutionOptions, RunOutcome, TriggerEvaluator, WorkflowExecutor, WorkflowValidator,
};

/// Options of the run command
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub workflow: PathBuf,
    pub event: EventArgs,
    pub secrets_file: Option<PathBuf>,
    pub dry_run: bool,
    pub workspace: Option<PathBuf>,
    pub keep_workspace: bool,
    pub no_history: bool,
    pub history: HistoryArgs,
}

/// Run the workflow
pub async fn run(args: RunArgs, verbose: bool) -> Result<()> {
    let workflow = load_workflow(&args.workflow)?;
    let event = args.event.resolve()?;

    let validation = WorkflowValidator::validate(&workflow)?;

    if !validation.is_valid() {
        eprintln!("{}", "Workflow validation failed:".red().bold());
        for error in &validation.errors {
            eprintln!("  {} {}", "✗".red(), error);
        }
        return Err(miette::miette!("Workflow configuration is invalid"));
    }

    if validation.has_warnings() && verbose {
        eprintln!("{}", "Workflow warnings:".yellow().bold());
        for warning in &validation.warnings {
            eprintln!("  {} {}", "⚠".yellow(), warning);
        }
        eprintln!();
    }

    let mut executor = WorkflowExecutor::new(secret_store(args.secrets_file.as_deref())?);

    for (kind, exec) in create_default_executors() {
        executor.register_executor(&kind, exec);
    }

    // a mismatched event starts no run, so no tool is needed
    let starts_run = TriggerEvaluator::should_run(&workflow.on, &event);

    // Check required tools are available
    let missing_tools = if starts_run {
        executor.check_tools(&workflow).await?
    } else {
        Vec::new()
    };
    if !missing_tools.is_empty() {
        eprintln!("{}", "Missing required tools:".red().bold());
        for kind in &missing_tools {
            eprintln!("  {} {}", "✗".red(), kind);
        }
        if missing_tools.iter().any(|k| k == "checkout") {
            return Err(CiError::tool_not_found("git").into());
        }
        return Err(miette::miette!("Required tools are not installed"));
    }

    // skipped events and dry runs leave no record
    if starts_run && !args.no_history && !args.dry_run {
        executor = executor.with_history(Box::new(args.history.open()?));
    }

    let options = ExecutionOptions {
        dry_run: args.dry_run,
        verbose,
        keep_workspace: args.keep_workspace,
        workspace: args.workspace,
    };

    match executor.execute(&workflow, &event, &options).await? {
        RunOutcome::Skipped => {
            println!("{}", "No run started.".dimmed());
            Ok(())
        }
        RunOutcome::Planned => {
            println!("{}", "Dry run: no steps executed.".dimmed());
            Ok(())
        }
        RunOutcome::Completed(run) => match run.failure() {
            None => Ok(()),
            Some((result, phase)) => Err(miette::miette!(
                "Run {} failed at step '{}' ({})",
                run.id,
                result.step,
                phase
            )),
        },
    }
}
