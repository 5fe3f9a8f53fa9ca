// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Workflow definition structures
//!
//! Defines the schema for .playbook-ci.yaml files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::CiError;
use crate::workflow::StepPhase;

/// Default workflow file name
pub const DEFAULT_WORKFLOW_FILE: &str = ".playbook-ci.yaml";

/// Directory holding the playbook_utils package inside the repository
pub const PLAYBOOK_UTILS_DIR: &str = "houdini/python3.11libs/playbook_utils";

/// Interpreter version the playbook_utils package targets
pub const PINNED_PYTHON_VERSION: &str = "3.11";

/// Secrets the playbook_utils tests read from their environment
pub const REQUIRED_SECRETS: [&str; 3] = ["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY", "SECRET_NAME"];

/// Workflow definition from .playbook-ci.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Workflow version (for future compatibility)
    #[serde(default = "default_version")]
    pub version: String,

    /// Workflow name
    pub name: String,

    /// Workflow description
    #[serde(default)]
    pub description: Option<String>,

    /// Events that start a run
    #[serde(default)]
    pub on: Triggers,

    /// Environment for every step; values may reference `${{ secrets.NAME }}`
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Steps in execution order
    pub steps: Vec<Step>,
}

fn default_version() -> String {
    "1".to_string()
}

impl Workflow {
    /// Load a workflow, choosing the parser from the file extension
    pub fn from_file(path: &Path) -> Result<Self, CiError> {
        if !path.exists() {
            return Err(CiError::WorkflowNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CiError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            None | Some("yaml") | Some("yml") => Self::from_yaml(&content),
            Some("json") => Self::from_json(&content),
            Some("toml") => Self::from_toml(&content),
            Some(other) => Err(CiError::UnsupportedFormat {
                extension: other.to_string(),
            }),
        }
    }

    /// Parse workflow from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, CiError> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Parse workflow from JSON string
    pub fn from_json(json: &str) -> Result<Self, CiError> {
        serde_json::from_str(json).map_err(Into::into)
    }

    /// Parse workflow from TOML string
    pub fn from_toml(source: &str) -> Result<Self, CiError> {
        toml::from_str(source).map_err(Into::into)
    }

    /// Serialize workflow to YAML
    pub fn to_yaml(&self) -> Result<String, CiError> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Get a step by name
    pub fn get_step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Get all step names
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    /// The workflow that tests playbook_utils on pushes and pull requests to main
    pub fn playbook_default() -> Self {
        let env = REQUIRED_SECRETS
            .iter()
            .map(|name| (name.to_string(), format!("${{{{ secrets.{} }}}}", name)))
            .collect();

        Self {
            version: default_version(),
            name: "playbook-utils-tests".into(),
            description: Some("Run the playbook_utils authentication tests".into()),
            on: Triggers {
                push: Some(BranchFilter::only("main")),
                pull_request: Some(BranchFilter::only("main")),
            },
            env,
            steps: vec![
                Step::new(
                    "checkout",
                    Action::Checkout {
                        repository: None,
                        reference: None,
                    },
                ),
                Step::new(
                    "setup-python",
                    Action::SetupRuntime {
                        language: Language::Python,
                        version: PINNED_PYTHON_VERSION.into(),
                    },
                ),
                Step::new(
                    "install-dependencies",
                    Action::Install {
                        requirements: Path::new(PLAYBOOK_UTILS_DIR).join("requirements.txt"),
                        upgrade_installer: true,
                    },
                ),
                Step::new(
                    "run-tests",
                    Action::Test {
                        working_directory: PathBuf::from(PLAYBOOK_UTILS_DIR),
                        target: "test_auth.py".into(),
                        runner: TestRunner::Pytest,
                    },
                ),
            ],
        }
    }

    /// Plain-text execution plan, one line per step
    pub fn render_plan(&self) -> String {
        let mut out = String::new();
        for (i, step) in self.steps.iter().enumerate() {
            out.push_str(&format!(
                "{}. {} [{}] {}\n",
                i + 1,
                step.name,
                step.action.phase(),
                step.action.summary()
            ));
        }
        out
    }
}

/// Trigger configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Triggers {
    /// Start on pushes to matching branches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push: Option<BranchFilter>,

    /// Start on pull requests targeting matching branches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<BranchFilter>,
}

impl Triggers {
    /// Whether no trigger is configured at all
    pub fn is_empty(&self) -> bool {
        self.push.is_none() && self.pull_request.is_none()
    }
}

/// Branch filter for a trigger. An empty list matches every branch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchFilter {
    #[serde(default)]
    pub branches: Vec<String>,
}

impl BranchFilter {
    /// Filter matching exactly one branch
    pub fn only(branch: &str) -> Self {
        Self {
            branches: vec![branch.to_string()],
        }
    }
}

/// A single workflow step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Step name (must be unique within the workflow)
    pub name: String,

    /// Step description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// What the step does
    pub action: Action,

    /// Environment variables for this step (override workflow env)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl Step {
    /// Create a step with no description or extra environment
    pub fn new(name: &str, action: Action) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            action,
            env: BTreeMap::new(),
        }
    }
}

/// Step action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    /// Fetch the repository snapshot into the workspace
    Checkout {
        /// Repository URL or path (defaults to the event's repository)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        repository: Option<String>,

        /// Commit or ref to check out (defaults to the event's commit)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reference: Option<String>,
    },

    /// Provide an interpreter of a pinned version
    SetupRuntime {
        #[serde(default)]
        language: Language,

        version: String,
    },

    /// Upgrade the package manager, then install a requirements manifest
    Install {
        requirements: PathBuf,

        #[serde(default = "default_true")]
        upgrade_installer: bool,
    },

    /// Run a single test file
    Test {
        working_directory: PathBuf,

        target: String,

        #[serde(default)]
        runner: TestRunner,
    },

    /// Shell command
    Shell {
        command: String,

        #[serde(default = "default_shell")]
        shell: String,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        working_directory: Option<PathBuf>,
    },
}

fn default_true() -> bool {
    true
}

fn default_shell() -> String {
    "bash".to_string()
}

impl Action {
    /// Executor key for this action
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Checkout { .. } => "checkout",
            Self::SetupRuntime { .. } => "setup-runtime",
            Self::Install { .. } => "install",
            Self::Test { .. } => "test",
            Self::Shell { .. } => "shell",
        }
    }

    /// Run phase entered while this action executes
    pub fn phase(&self) -> StepPhase {
        match self {
            Self::Checkout { .. } => StepPhase::Fetching,
            Self::SetupRuntime { .. } => StepPhase::ProvisioningRuntime,
            Self::Install { .. } => StepPhase::InstallingDeps,
            Self::Test { .. } => StepPhase::Testing,
            Self::Shell { .. } => StepPhase::RunningCommand,
        }
    }

    /// Short human-readable description
    pub fn summary(&self) -> String {
        match self {
            Self::Checkout { repository, reference } => format!(
                "checkout {}@{}",
                repository.as_deref().unwrap_or("<event repository>"),
                reference.as_deref().unwrap_or("<event commit>")
            ),
            Self::SetupRuntime { language, version } => format!("setup {} {}", language, version),
            Self::Install { requirements, .. } => {
                format!("pip install -r {}", requirements.display())
            }
            Self::Test {
                working_directory,
                target,
                runner,
            } => format!("{} {} in {}", runner, target, working_directory.display()),
            Self::Shell { command, shell, .. } => format!("{} -c {:?}", shell, command),
        }
    }
}

/// Interpreter language
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Python,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Python => write!(f, "python"),
        }
    }
}

/// Test runner invoked by a test step
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TestRunner {
    #[default]
    Pytest,
    Unittest,
}

impl TestRunner {
    /// Python module implementing the runner
    pub fn module(&self) -> &'static str {
        match self {
            Self::Pytest => "pytest",
            Self::Unittest => "unittest",
        }
    }
}

impl std::fmt::Display for TestRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.module())
    }
}
