// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Trigger evaluation
//!
//! Decides whether a repository event starts a run.

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::CiError;
use crate::workflow::{BranchFilter, Triggers};

const BRANCH_REF_PREFIX: &str = "refs/heads/";

// `*` stays within one path segment, `**` crosses them
const BRANCH_MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Kind of repository event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Push,
    PullRequest,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Push => write!(f, "push"),
            Self::PullRequest => write!(f, "pull_request"),
        }
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "push" => Ok(Self::Push),
            "pull-request" | "pull_request" | "pr" => Ok(Self::PullRequest),
            _ => Err(format!("Unknown event kind: {}", s)),
        }
    }
}

/// A repository event
///
/// For pushes `branch` is the pushed branch; for pull requests it is the
/// target branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

impl Event {
    /// Create an event; `refs/heads/` prefixes are stripped from the branch
    pub fn new(kind: EventKind, branch: &str) -> Self {
        Self {
            kind,
            branch: normalize_branch(branch),
            commit: None,
            repository: None,
        }
    }

    pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = Some(commit.into());
        self
    }

    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    /// Build an event from a webhook-style JSON payload
    pub fn from_payload(kind: EventKind, payload: &serde_json::Value) -> Result<Self, CiError> {
        let (branch_ptr, commit_ptr) = match kind {
            EventKind::Push => ("/ref", "/after"),
            EventKind::PullRequest => ("/pull_request/base/ref", "/pull_request/head/sha"),
        };

        let branch = payload
            .pointer(branch_ptr)
            .and_then(|v| v.as_str())
            .ok_or_else(|| CiError::InvalidEvent {
                reason: format!("{} payload has no '{}' field", kind, branch_ptr),
            })?;

        let mut event = Self::new(kind, branch);

        if let Some(commit) = payload.pointer(commit_ptr).and_then(|v| v.as_str()) {
            event = event.with_commit(commit);
        }

        if let Some(repo) = payload
            .pointer("/repository/clone_url")
            .and_then(|v| v.as_str())
        {
            event = event.with_repository(repo);
        }

        Ok(event)
    }

    /// Read a JSON payload file and build an event from it
    pub fn from_payload_file(kind: EventKind, path: &Path) -> Result<Self, CiError> {
        let content = std::fs::read_to_string(path).map_err(|e| CiError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        let payload: serde_json::Value = serde_json::from_str(&content)?;
        Self::from_payload(kind, &payload)
    }
}

fn normalize_branch(branch: &str) -> String {
    branch
        .strip_prefix(BRANCH_REF_PREFIX)
        .unwrap_or(branch)
        .to_string()
}

/// Trigger evaluator
pub struct TriggerEvaluator;

impl TriggerEvaluator {
    /// Whether `event` starts a run under `triggers`
    pub fn should_run(triggers: &Triggers, event: &Event) -> bool {
        let filter = match event.kind {
            EventKind::Push => triggers.push.as_ref(),
            EventKind::PullRequest => triggers.pull_request.as_ref(),
        };

        match filter {
            Some(filter) => Self::branch_matches(filter, &event.branch),
            None => false,
        }
    }

    /// Whether `branch` passes the filter; an empty filter matches all branches
    pub fn branch_matches(filter: &BranchFilter, branch: &str) -> bool {
        if filter.branches.is_empty() {
            return true;
        }

        filter.branches.iter().any(|pattern| match Pattern::new(pattern) {
            Ok(p) => p.matches_with(branch, BRANCH_MATCH),
            Err(_) => pattern == branch,
        })
    }

    /// Collect branch patterns that fail to compile
    pub fn invalid_patterns(triggers: &Triggers) -> Vec<(String, CiError)> {
        [triggers.push.as_ref(), triggers.pull_request.as_ref()]
            .into_iter()
            .flatten()
            .flat_map(|f| f.branches.iter())
            .filter_map(|p| Pattern::new(p).err().map(|e| (p.clone(), CiError::from(e))))
            .collect()
    }
}
