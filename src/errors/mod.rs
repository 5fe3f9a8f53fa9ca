// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Error types
//!
//! Configuration and infrastructure errors are `CiError`s and stop the
//! runner before (or instead of) a run. Step failures are not errors: they
//! are recorded in the run and decide its status.

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for playbook-ci operations
pub type CiResult<T> = Result<T, CiError>;

/// Main error type for playbook-ci
#[derive(Error, Debug, Diagnostic)]
pub enum CiError {
    // ─────────────────────────────────────────────────────────────────────────
    // Tool Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Tool '{tool}' not found")]
    #[diagnostic(code(playbook_ci::tool_not_found), help("{suggestion}"))]
    ToolNotFound { tool: String, suggestion: String },

    #[error("No executor registered for '{action}' steps")]
    #[diagnostic(
        code(playbook_ci::executor_not_found),
        help("Available step actions: checkout, setup-runtime, install, test, shell")
    )]
    ExecutorNotFound { action: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Workflow Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Workflow file not found: {path}")]
    #[diagnostic(
        code(playbook_ci::workflow_not_found),
        help("Create one with 'playbook-ci init' or write .playbook-ci.yaml manually")
    )]
    WorkflowNotFound { path: PathBuf },

    #[error("Invalid workflow: {reason}")]
    #[diagnostic(code(playbook_ci::invalid_workflow))]
    InvalidWorkflow {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Step '{step}' is invalid: {reason}")]
    #[diagnostic(code(playbook_ci::invalid_step))]
    InvalidStep { step: String, reason: String },

    #[error("Unsupported workflow format: {extension}")]
    #[diagnostic(
        code(playbook_ci::unsupported_format),
        help("Workflow files may be .yaml, .yml, .json or .toml")
    )]
    UnsupportedFormat { extension: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Event Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid event: {reason}")]
    #[diagnostic(
        code(playbook_ci::invalid_event),
        help("Pass --event push|pull-request with --branch, or --payload <file>")
    )]
    InvalidEvent { reason: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Host Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to provision run host: {message}")]
    #[diagnostic(code(playbook_ci::host_provisioning))]
    HostProvisioning { message: String },

    #[error("Invalid run state transition: {from} → {to}")]
    #[diagnostic(code(playbook_ci::invalid_transition))]
    InvalidTransition { from: String, to: String },

    // ─────────────────────────────────────────────────────────────────────────
    // File Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(playbook_ci::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(playbook_ci::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    #[error("Failed to load secrets from '{path}': {error}")]
    #[diagnostic(
        code(playbook_ci::secrets_file),
        help("Secrets files use dotenv syntax: NAME=value, one per line")
    )]
    SecretsFile { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // History Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("History error: {message}")]
    #[diagnostic(code(playbook_ci::history_error))]
    HistoryError { message: String },

    #[error("Run '{id}' not found in history")]
    #[diagnostic(
        code(playbook_ci::run_not_found),
        help("List recorded runs with 'playbook-ci history list'")
    )]
    RunNotFound { id: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(playbook_ci::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(playbook_ci::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(playbook_ci::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(playbook_ci::toml_error))]
    Toml { message: String },

    #[error("Branch pattern error: {message}")]
    #[diagnostic(code(playbook_ci::pattern_error))]
    BranchPattern { message: String },
}

impl From<std::io::Error> for CiError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for CiError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for CiError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for CiError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<glob::PatternError> for CiError {
    fn from(e: glob::PatternError) -> Self {
        Self::BranchPattern { message: e.to_string() }
    }
}

impl CiError {
    /// Create a tool not found error with installation suggestion
    pub fn tool_not_found(tool: &str) -> Self {
        let suggestion = match tool {
            "git" => "Install git: https://git-scm.com/downloads".to_string(),
            t if t.starts_with("python") => {
                "Install Python: https://www.python.org/downloads/".to_string()
            }
            _ => format!("Install {} and ensure it's in your PATH", tool),
        };

        Self::ToolNotFound {
            tool: tool.to_string(),
            suggestion,
        }
    }
}
