// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Run history
//!
//! Every finished run is stored as a record holding its outcome and the
//! (already redacted) output of each step.

mod filesystem;
mod id;

pub use filesystem::FilesystemRunStore;
pub use id::{is_run_id_prefix, run_id, RUN_ID_LEN};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

use crate::errors::CiError;
use crate::executors::StepResult;
use crate::workflow::{Event, Run, RunStatus, StepPhase};

/// Trait for run history backends
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Persist a finished run
    async fn save(&self, record: &RunRecord) -> Result<(), CiError>;

    /// Look up a run by full id
    async fn get(&self, id: &str) -> Result<Option<RunRecord>, CiError>;

    /// All runs, newest first
    async fn list(&self) -> Result<Vec<RunRecord>, CiError>;

    /// Remove every record
    async fn clear(&self) -> Result<(), CiError>;

    /// Aggregate statistics
    async fn stats(&self) -> Result<HistoryStats, CiError>;
}

/// Stored form of a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub workflow: String,
    pub event: Event,
    pub status: RunStatus,
    pub started_at: SystemTime,
    pub duration_ms: u64,
    /// Names only; values are never stored
    pub env_keys: Vec<String>,
    pub steps: Vec<StepRecord>,
}

impl RunRecord {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// The step that failed the run
    pub fn failed_step(&self) -> Option<&StepRecord> {
        self.steps.iter().find(|s| !s.success)
    }
}

impl From<&Run> for RunRecord {
    fn from(run: &Run) -> Self {
        Self {
            id: run.id.clone(),
            workflow: run.workflow.clone(),
            event: run.event.clone(),
            // unfinished runs are never saved; treat one as failed if it is
            status: run.status().unwrap_or(RunStatus::Failed),
            started_at: run.started_at,
            duration_ms: run.duration().as_millis() as u64,
            env_keys: run.env_keys.clone(),
            steps: run
                .results
                .iter()
                .zip(run.phases.iter())
                .map(|(result, phase)| StepRecord::new(result, *phase))
                .collect(),
        }
    }
}

/// Stored form of one step result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub phase: StepPhase,
    pub success: bool,
    pub exit_code: i32,
    pub duration_ms: u64,
    pub stdout: String,
    pub stderr: String,
}

impl StepRecord {
    fn new(result: &StepResult, phase: StepPhase) -> Self {
        Self {
            name: result.step.clone(),
            phase,
            success: result.success,
            exit_code: result.exit_code,
            duration_ms: result.duration.as_millis() as u64,
            stdout: result.stdout.clone(),
            stderr: result.stderr.clone(),
        }
    }
}

/// History statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Number of recorded runs
    pub runs: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Total size in bytes
    pub size_bytes: u64,
    pub oldest_run: Option<SystemTime>,
    pub newest_run: Option<SystemTime>,
}

impl HistoryStats {
    /// Format size for display
    pub fn formatted_size(&self) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;

        if self.size_bytes >= MB {
            format!("{:.2} MB", self.size_bytes as f64 / MB as f64)
        } else if self.size_bytes >= KB {
            format!("{:.2} KB", self.size_bytes as f64 / KB as f64)
        } else {
            format!("{} bytes", self.size_bytes)
        }
    }
}
