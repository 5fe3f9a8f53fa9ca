// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for playbook-ci.

pub mod history;
pub mod init;
pub mod plan;
pub mod run;
pub mod trigger;
pub mod validate;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::errors::{CiError, RecoverySuggestion};
use crate::history::FilesystemRunStore;
use crate::secrets::{EnvSecretStore, LayeredSecretStore, MapSecretStore, SecretStore};
use crate::workflow::{Event, EventKind, Workflow, DEFAULT_WORKFLOW_FILE};

/// Fail-fast CI runner
///
/// Runs a repository's test workflow on push and pull request events.
#[derive(Parser, Debug)]
#[clap(
    name = "playbook-ci",
    version,
    about = "Fail-fast CI runner for push and pull request events",
    long_about = None,
    after_help = "Examples:\n\
        playbook-ci init                                  Write the default workflow\n\
        playbook-ci run --event push --branch main        Run for a push to main\n\
        playbook-ci run --event pr --payload event.json   Run for a webhook payload\n\
        playbook-ci history list                          Show recorded runs\n\n\
        See 'playbook-ci <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the default workflow file
    Init {
        /// Workflow file to create
        #[clap(short, long, env = "PLAYBOOK_CI_WORKFLOW", default_value = DEFAULT_WORKFLOW_FILE)]
        workflow: PathBuf,

        /// Overwrite an existing file
        #[clap(short, long)]
        force: bool,
    },

    /// Run the workflow for an event
    Run {
        /// Workflow file
        #[clap(short, long, env = "PLAYBOOK_CI_WORKFLOW", default_value = DEFAULT_WORKFLOW_FILE)]
        workflow: PathBuf,

        #[clap(flatten)]
        event: EventArgs,

        /// Dotenv file with secret values (takes precedence over the environment)
        #[clap(long, env = "PLAYBOOK_CI_SECRETS_FILE", value_name = "FILE")]
        secrets_file: Option<PathBuf>,

        /// Dry run (show what would be done)
        #[clap(long)]
        dry_run: bool,

        /// Run in this directory instead of a temporary one
        #[clap(long, value_name = "DIR")]
        workspace: Option<PathBuf>,

        /// Keep the run directory after the run
        #[clap(long)]
        keep_workspace: bool,

        /// Do not record the run
        #[clap(long)]
        no_history: bool,

        #[clap(flatten)]
        history: HistoryArgs,
    },

    /// Validate workflow configuration
    Validate {
        /// Workflow file to validate
        #[clap(env = "PLAYBOOK_CI_WORKFLOW", default_value = DEFAULT_WORKFLOW_FILE)]
        workflow: PathBuf,
    },

    /// Show the steps a run would execute
    Plan {
        /// Workflow file
        #[clap(env = "PLAYBOOK_CI_WORKFLOW", default_value = DEFAULT_WORKFLOW_FILE)]
        workflow: PathBuf,
    },

    /// Check whether an event would start a run
    Trigger {
        /// Workflow file
        #[clap(short, long, env = "PLAYBOOK_CI_WORKFLOW", default_value = DEFAULT_WORKFLOW_FILE)]
        workflow: PathBuf,

        #[clap(flatten)]
        event: EventArgs,
    },

    /// Run history management
    History {
        #[clap(subcommand)]
        action: HistoryAction,

        #[clap(flatten)]
        history: HistoryArgs,
    },
}

/// Run history actions
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryAction {
    /// List recorded runs, newest first
    List {
        /// Show at most this many runs
        #[clap(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Show one run with its step output
    Show {
        /// Run id or unique prefix
        id: String,
    },

    /// Show history statistics
    Stats,

    /// Delete all recorded runs
    Clear {
        /// Skip confirmation
        #[clap(short, long)]
        yes: bool,
    },
}

/// Describes the event a command evaluates
#[derive(Args, Debug, Clone)]
pub struct EventArgs {
    /// Event kind (push, pull-request)
    #[clap(short, long, default_value = "push")]
    pub event: EventKind,

    /// Pushed branch, or target branch of a pull request
    #[clap(short, long)]
    pub branch: Option<String>,

    /// Commit to check out
    #[clap(long)]
    pub commit: Option<String>,

    /// Repository URL or path to clone
    #[clap(long)]
    pub repository: Option<String>,

    /// Webhook-style JSON payload describing the event
    #[clap(long, value_name = "FILE", conflicts_with = "branch")]
    pub payload: Option<PathBuf>,
}

impl EventArgs {
    /// Build the event from a payload file or the individual flags
    pub fn resolve(&self) -> Result<Event, CiError> {
        let mut event = match (&self.payload, &self.branch) {
            (Some(path), _) => Event::from_payload_file(self.event, path)?,
            (None, Some(branch)) => Event::new(self.event, branch),
            (None, None) => {
                return Err(CiError::InvalidEvent {
                    reason: "no branch given".to_string(),
                })
            }
        };

        if let Some(ref commit) = self.commit {
            event = event.with_commit(commit.clone());
        }
        if let Some(ref repository) = self.repository {
            event = event.with_repository(repository.clone());
        }

        Ok(event)
    }
}

/// Where run records are kept
#[derive(Args, Debug, Clone)]
pub struct HistoryArgs {
    /// History directory (default: .playbook-ci/runs)
    #[clap(long, env = "PLAYBOOK_CI_HISTORY_DIR", value_name = "DIR")]
    pub history_dir: Option<PathBuf>,

    /// Use the per-user history directory
    #[clap(long, conflicts_with = "history_dir")]
    pub global_history: bool,
}

impl HistoryArgs {
    /// Open the selected history store
    pub fn open(&self) -> Result<FilesystemRunStore, CiError> {
        if self.global_history {
            return FilesystemRunStore::global_history();
        }

        match &self.history_dir {
            Some(dir) => FilesystemRunStore::new(dir.clone()),
            None => FilesystemRunStore::project_history(&std::env::current_dir()?),
        }
    }
}

/// Load a workflow file
pub(crate) fn load_workflow(path: &std::path::Path) -> Result<Workflow, CiError> {
    let workflow = Workflow::from_file(path).inspect_err(|e| {
        if matches!(e, CiError::WorkflowNotFound { .. }) {
            eprintln!("{}", RecoverySuggestion::create_workflow(path));
        }
    })?;
    tracing::debug!(workflow = %workflow.name, path = %path.display(), "loaded workflow");
    Ok(workflow)
}

/// Secrets from an optional dotenv file layered over the process environment
pub(crate) fn secret_store(
    secrets_file: Option<&std::path::Path>,
) -> Result<Box<dyn SecretStore>, CiError> {
    let mut store = LayeredSecretStore::new();

    if let Some(path) = secrets_file {
        let file = MapSecretStore::from_dotenv(path)?;
        tracing::info!(path = %path.display(), count = file.len(), "loaded secrets file");
        store = store.with_layer(Box::new(file));
    }

    let store = store.with_layer(Box::new(EnvSecretStore));
    tracing::debug!(sources = %store.describe(), "secret stores");
    Ok(Box::new(store))
}
