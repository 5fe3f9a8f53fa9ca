// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Filesystem-based run history
//!
//! Stores one JSON file per run in a history directory.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{is_run_id_prefix, HistoryStats, RunRecord, RunStore};
use crate::errors::CiError;
use crate::workflow::RunStatus;

/// Filesystem-based run history
pub struct FilesystemRunStore {
    /// History directory
    history_dir: PathBuf,
}

impl FilesystemRunStore {
    /// Create a store, creating the directory if needed
    pub fn new(history_dir: PathBuf) -> Result<Self, CiError> {
        if !history_dir.exists() {
            std::fs::create_dir_all(&history_dir).map_err(|e| CiError::HistoryError {
                message: format!("Failed to create history directory: {}", e),
            })?;
        }

        Ok(Self { history_dir })
    }

    /// History kept next to the workflow, under `.playbook-ci/runs`
    pub fn project_history(base_dir: &Path) -> Result<Self, CiError> {
        Self::new(base_dir.join(".playbook-ci").join("runs"))
    }

    /// History in the per-user data directory
    pub fn global_history() -> Result<Self, CiError> {
        let dirs = directories::ProjectDirs::from("", "", "playbook-ci").ok_or_else(|| {
            CiError::HistoryError {
                message: "Could not determine a home directory".to_string(),
            }
        })?;

        Self::new(dirs.data_dir().join("runs"))
    }

    pub fn dir(&self) -> &Path {
        &self.history_dir
    }

    /// Get path for a run record
    fn record_path(&self, id: &str) -> PathBuf {
        // first 2 chars as directory
        let (prefix, rest) = id.split_at(2.min(id.len()));
        self.history_dir.join(prefix).join(format!("{}.json", rest))
    }

    /// Read every record, skipping files that don't parse
    fn read_all(&self) -> Result<Vec<(RunRecord, u64)>, CiError> {
        let mut records = Vec::new();

        if !self.history_dir.exists() {
            return Ok(records);
        }

        for prefix_dir in std::fs::read_dir(&self.history_dir).map_err(|e| {
            CiError::HistoryError {
                message: format!("Failed to read history directory: {}", e),
            }
        })? {
            let prefix_dir = prefix_dir
                .map_err(|e| CiError::HistoryError {
                    message: format!("Failed to read history entry: {}", e),
                })?
                .path();

            if !prefix_dir.is_dir() {
                continue;
            }

            for record_file in std::fs::read_dir(&prefix_dir).map_err(|e| {
                CiError::HistoryError {
                    message: format!("Failed to read history subdirectory: {}", e),
                }
            })? {
                let record_file = record_file
                    .map_err(|e| CiError::HistoryError {
                        message: format!("Failed to read history file: {}", e),
                    })?
                    .path();

                if record_file.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }

                let Ok(content) = std::fs::read_to_string(&record_file) else {
                    continue;
                };
                match serde_json::from_str::<RunRecord>(&content) {
                    Ok(record) => records.push((record, content.len() as u64)),
                    Err(e) => {
                        tracing::debug!(file = %record_file.display(), error = %e, "skipping unreadable run record")
                    }
                }
            }
        }

        Ok(records)
    }

    /// Resolve a unique id prefix to a record
    pub async fn find(&self, prefix: &str) -> Result<RunRecord, CiError> {
        if !is_run_id_prefix(prefix) {
            return Err(CiError::RunNotFound {
                id: prefix.to_string(),
            });
        }

        if let Some(record) = self.get(prefix).await? {
            return Ok(record);
        }

        let mut matches: Vec<RunRecord> = self
            .list()
            .await?
            .into_iter()
            .filter(|r| r.id.starts_with(prefix))
            .collect();

        match matches.len() {
            1 => Ok(matches.remove(0)),
            0 => Err(CiError::RunNotFound {
                id: prefix.to_string(),
            }),
            n => Err(CiError::HistoryError {
                message: format!("Run id prefix '{}' is ambiguous ({} runs match)", prefix, n),
            }),
        }
    }
}

#[async_trait]
impl RunStore for FilesystemRunStore {
    async fn save(&self, record: &RunRecord) -> Result<(), CiError> {
        let path = self.record_path(&record.id);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CiError::HistoryError {
                    message: format!("Failed to create history directory: {}", e),
                })?;
        }

        let json = serde_json::to_string_pretty(record).map_err(|e| CiError::HistoryError {
            message: format!("Failed to serialize run record: {}", e),
        })?;

        tokio::fs::write(&path, json)
            .await
            .map_err(|e| CiError::HistoryError {
                message: format!("Failed to write run record: {}", e),
            })?;

        tracing::debug!(run = %record.id, path = %path.display(), "saved run record");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<RunRecord>, CiError> {
        if !is_run_id_prefix(id) {
            return Ok(None);
        }

        let path = self.record_path(id);
        if !path.exists() {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| CiError::HistoryError {
                message: format!("Failed to read run record: {}", e),
            })?;

        let record = serde_json::from_str(&content).map_err(|e| CiError::HistoryError {
            message: format!("Failed to parse run record: {}", e),
        })?;

        Ok(Some(record))
    }

    async fn list(&self) -> Result<Vec<RunRecord>, CiError> {
        let mut records: Vec<RunRecord> =
            self.read_all()?.into_iter().map(|(record, _)| record).collect();
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(records)
    }

    async fn clear(&self) -> Result<(), CiError> {
        if self.history_dir.exists() {
            tokio::fs::remove_dir_all(&self.history_dir)
                .await
                .map_err(|e| CiError::HistoryError {
                    message: format!("Failed to clear history: {}", e),
                })?;

            tokio::fs::create_dir_all(&self.history_dir)
                .await
                .map_err(|e| CiError::HistoryError {
                    message: format!("Failed to recreate history directory: {}", e),
                })?;
        }

        Ok(())
    }

    async fn stats(&self) -> Result<HistoryStats, CiError> {
        let mut stats = HistoryStats::default();

        for (record, size) in self.read_all()? {
            stats.runs += 1;
            stats.size_bytes += size;
            match record.status {
                RunStatus::Succeeded => stats.succeeded += 1,
                RunStatus::Failed => stats.failed += 1,
            }

            let at = record.started_at;
            if stats.oldest_run.map_or(true, |oldest| at < oldest) {
                stats.oldest_run = Some(at);
            }
            if stats.newest_run.map_or(true, |newest| at > newest) {
                stats.newest_run = Some(at);
            }
        }

        Ok(stats)
    }
}
