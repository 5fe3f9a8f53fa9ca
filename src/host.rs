// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Run hosts
//!
//! Every run gets a clean host directory:
//!
//! ```text
//! <root>/
//! ├── workspace/   checkout target, working directory of every step
//! └── tools/       provisioned runtimes (virtual environments)
//! ```
//!
//! Ephemeral hosts live in a temporary directory that is removed when the
//! host is dropped.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::errors::CiError;

/// Isolated execution host for one run
#[derive(Debug)]
pub struct Host {
    root: PathBuf,
    workspace: PathBuf,
    tools: PathBuf,
    path_prepend: Vec<PathBuf>,
    exports: BTreeMap<String, String>,
    interpreter: Option<PathBuf>,
    temp: Option<TempDir>,
}

impl Host {
    /// Host in a fresh temporary directory
    pub fn ephemeral() -> Result<Self, CiError> {
        let temp = tempfile::Builder::new()
            .prefix("playbook-ci-")
            .tempdir()
            .map_err(|e| CiError::HostProvisioning {
                message: format!("Failed to create temporary directory: {}", e),
            })?;

        let mut host = Self::layout(temp.path().to_path_buf())?;
        host.temp = Some(temp);
        Ok(host)
    }

    /// Host rooted at a caller-chosen directory; its workspace must be empty
    pub fn at(root: PathBuf) -> Result<Self, CiError> {
        // steps spawn with the host as cwd, so relative paths would resolve twice
        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()?.join(root)
        };

        let workspace = root.join("workspace");
        if workspace.exists() {
            let occupied = std::fs::read_dir(&workspace)
                .map_err(|e| CiError::HostProvisioning {
                    message: format!("Failed to read {}: {}", workspace.display(), e),
                })?
                .next()
                .is_some();

            if occupied {
                return Err(CiError::HostProvisioning {
                    message: format!("Workspace {} is not empty", workspace.display()),
                });
            }
        }

        Self::layout(root)
    }

    fn layout(root: PathBuf) -> Result<Self, CiError> {
        let workspace = root.join("workspace");
        let tools = root.join("tools");

        for dir in [&workspace, &tools] {
            std::fs::create_dir_all(dir).map_err(|e| CiError::HostProvisioning {
                message: format!("Failed to create {}: {}", dir.display(), e),
            })?;
        }

        tracing::debug!(root = %root.display(), "provisioned run host");

        Ok(Self {
            root,
            workspace,
            tools,
            path_prepend: Vec::new(),
            exports: BTreeMap::new(),
            interpreter: None,
            temp: None,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the source snapshot
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Directory for provisioned runtimes
    pub fn tools_dir(&self) -> &Path {
        &self.tools
    }

    /// Put a directory in front of `PATH` for every later step
    pub fn prepend_path(&mut self, dir: PathBuf) {
        self.path_prepend.insert(0, dir);
    }

    /// Export a variable to every later step
    pub fn export(&mut self, key: &str, value: impl Into<String>) {
        self.exports.insert(key.to_string(), value.into());
    }

    pub fn exports(&self) -> &BTreeMap<String, String> {
        &self.exports
    }

    pub fn set_interpreter(&mut self, interpreter: PathBuf) {
        self.interpreter = Some(interpreter);
    }

    /// Interpreter provisioned by the runtime step, if any
    pub fn interpreter(&self) -> Option<&Path> {
        self.interpreter.as_deref()
    }

    /// `PATH` value for step processes, or `None` when nothing was prepended
    pub fn search_path(&self) -> Option<OsString> {
        if self.path_prepend.is_empty() {
            return None;
        }

        let inherited = std::env::var_os("PATH").unwrap_or_default();
        let dirs = self
            .path_prepend
            .iter()
            .cloned()
            .chain(std::env::split_paths(&inherited));

        std::env::join_paths(dirs).ok()
    }

    /// Keep the host directory after the run; returns its path
    pub fn keep(mut self) -> PathBuf {
        if let Some(temp) = self.temp.take() {
            return temp.into_path();
        }
        self.root.clone()
    }

    pub fn is_ephemeral(&self) -> bool {
        self.temp.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ephemeral_host_removed_on_drop() {
        let host = Host::ephemeral().unwrap();
        let root = host.root().to_path_buf();

        assert!(host.workspace().is_dir());
        assert!(host.tools_dir().is_dir());
        assert!(host.is_ephemeral());

        drop(host);
        assert!(!root.exists());
    }

    #[test]
    fn test_kept_host_survives() {
        let host = Host::ephemeral().unwrap();
        let root = host.keep();
        assert!(root.join("workspace").is_dir());
        std::fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_explicit_host_requires_empty_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("host");

        let host = Host::at(root.clone()).unwrap();
        std::fs::write(host.workspace().join("leftover"), "x").unwrap();
        drop(host);

        assert!(matches!(
            Host::at(root),
            Err(CiError::HostProvisioning { .. })
        ));
    }

    #[test]
    fn test_explicit_host_paths_are_absolute() {
        let relative = PathBuf::from(format!(
            "target/playbook-ci-host-{}",
            std::process::id()
        ));

        let host = Host::at(relative.clone()).unwrap();
        assert!(host.root().is_absolute());
        assert!(host.workspace().is_absolute());
        assert!(host.tools_dir().is_absolute());
        assert!(host.root().ends_with(&relative));

        let root = host.keep();
        std::fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_search_path_prepends() {
        let mut host = Host::ephemeral().unwrap();
        assert!(host.search_path().is_none());

        let bin = host.tools_dir().join("venv").join("bin");
        host.prepend_path(bin.clone());

        let path = host.search_path().unwrap();
        let first = std::env::split_paths(&path).next().unwrap();
        assert_eq!(first, bin);
    }
}
