// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! # playbook-ci - Fail-fast CI runner
//!
//! `playbook-ci` runs a repository's test workflow when a push or pull
//! request event matches its triggers.
//!
//! ## Features
//!
//! - **Branch triggers** - glob patterns for push and pull request events
//! - **Isolated hosts** - every run gets a fresh workspace and virtual environment
//! - **Secret injection** - `${{ secrets.NAME }}` resolved from the environment or a dotenv file, masked in all output
//! - **Fail fast** - the first failing step ends the run
//! - **Run history** - every run is recorded with its step output
//!
//! ## Quick Start
//!
//! ```bash
//! # Write the default workflow
//! playbook-ci init
//!
//! # Would a pull request into main start a run?
//! playbook-ci trigger --event pull-request --branch main
//!
//! # Run it
//! playbook-ci run --event push --branch main --secrets-file .env
//! ```

pub mod cli;
pub mod errors;
pub mod executors;
pub mod history;
pub mod host;
pub mod secrets;
pub mod utils;
pub mod workflow;

// Re-export commonly used types
pub use errors::{CiError, CiResult};
pub use workflow::{Event, EventKind, Run, RunOutcome, RunStatus, Step, Workflow};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
