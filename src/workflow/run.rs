// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Run state machine
//!
//! A run moves `pending → <phase of each step> → succeeded | failed`.
//! The first failing step moves it to `failed`; nothing leaves a terminal state.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

use crate::errors::CiError;
use crate::executors::StepResult;
use crate::workflow::{Event, Step};

/// What a run is doing while a step executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepPhase {
    Fetching,
    ProvisioningRuntime,
    InstallingDeps,
    Testing,
    RunningCommand,
}

impl std::fmt::Display for StepPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetching => write!(f, "fetching"),
            Self::ProvisioningRuntime => write!(f, "provisioning-runtime"),
            Self::InstallingDeps => write!(f, "installing-deps"),
            Self::Testing => write!(f, "testing"),
            Self::RunningCommand => write!(f, "running-command"),
        }
    }
}

/// Run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunState {
    Pending,
    Active(StepPhase),
    Succeeded,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Whether the state machine allows moving to `next`
    pub fn can_transition_to(&self, next: RunState) -> bool {
        match (self, next) {
            (Self::Succeeded | Self::Failed, _) => false,
            (_, Self::Pending) => false,
            (_, Self::Failed) => true,
            // a run with steps always passes through at least one phase
            (Self::Pending, Self::Succeeded) => false,
            _ => true,
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Active(phase) => write!(f, "{}", phase),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Terminal outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Succeeded,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One end-to-end execution of a workflow
#[derive(Debug, Clone)]
pub struct Run {
    /// Run identifier
    pub id: String,
    /// Workflow name
    pub workflow: String,
    /// Event that started the run
    pub event: Event,
    /// Current state
    pub state: RunState,
    /// Names of the environment variables provisioned for the run
    pub env_keys: Vec<String>,
    /// Results in execution order
    pub results: Vec<StepResult>,
    /// Phase of each recorded result, parallel to `results`
    pub phases: Vec<StepPhase>,
    /// When the run was created
    pub started_at: SystemTime,
}

impl Run {
    /// Create a pending run
    pub fn new(id: String, workflow: &str, event: Event, env_keys: Vec<String>) -> Self {
        Self {
            id,
            workflow: workflow.to_string(),
            event,
            state: RunState::Pending,
            env_keys,
            results: Vec::new(),
            phases: Vec::new(),
            started_at: SystemTime::now(),
        }
    }

    /// Move to a new state
    pub fn transition(&mut self, next: RunState) -> Result<(), CiError> {
        if !self.state.can_transition_to(next) {
            return Err(CiError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!(run = %self.id, from = %self.state, to = %next, "run state change");
        self.state = next;
        Ok(())
    }

    /// Enter the phase of the step about to execute
    pub fn begin_step(&mut self, step: &Step) -> Result<(), CiError> {
        self.transition(RunState::Active(step.action.phase()))
    }

    /// Append a step result; a failure moves the run to `failed`.
    /// Returns whether the run may continue.
    pub fn record(&mut self, step: &Step, mut result: StepResult) -> Result<bool, CiError> {
        result.step = step.name.clone();
        let success = result.success;
        self.results.push(result);
        self.phases.push(step.action.phase());

        if !success {
            self.transition(RunState::Failed)?;
        }
        Ok(success)
    }

    /// Close the run; a run that never failed succeeds
    pub fn finish(&mut self) -> Result<RunStatus, CiError> {
        if self.state != RunState::Failed {
            self.transition(RunState::Succeeded)?;
        }
        Ok(self.status().unwrap_or(RunStatus::Failed))
    }

    /// Terminal status, if the run has finished
    pub fn status(&self) -> Option<RunStatus> {
        match self.state {
            RunState::Succeeded => Some(RunStatus::Succeeded),
            RunState::Failed => Some(RunStatus::Failed),
            _ => None,
        }
    }

    /// The failing step's result and phase
    pub fn failure(&self) -> Option<(&StepResult, StepPhase)> {
        self.results
            .iter()
            .zip(self.phases.iter())
            .find(|(r, _)| !r.success)
            .map(|(r, p)| (r, *p))
    }

    /// Total time spent in steps
    pub fn duration(&self) -> Duration {
        self.results.iter().map(|r| r.duration).sum()
    }
}
