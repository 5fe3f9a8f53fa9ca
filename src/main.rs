// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! playbook-ci - Fail-fast CI runner

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use playbook_ci::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playbook_ci=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Init { workflow, force } => {
            playbook_ci::cli::init::run(&workflow, force, cli.verbose).await
        }
        Commands::Run {
            workflow,
            event,
            secrets_file,
            dry_run,
            workspace,
            keep_workspace,
            no_history,
            history,
        } => {
            let args = playbook_ci::cli::run::RunArgs {
                workflow,
                event,
                secrets_file,
                dry_run,
                workspace,
                keep_workspace,
                no_history,
                history,
            };
            playbook_ci::cli::run::run(args, cli.verbose).await
        }
        Commands::Validate { workflow } => {
            playbook_ci::cli::validate::run(&workflow, cli.verbose).await
        }
        Commands::Plan { workflow } => playbook_ci::cli::plan::run(&workflow, cli.verbose).await,
        Commands::Trigger { workflow, event } => {
            playbook_ci::cli::trigger::run(&workflow, &event, cli.verbose).await
        }
        Commands::History { action, history } => {
            playbook_ci::cli::history::run(action, &history, cli.verbose).await
        }
    }
}
