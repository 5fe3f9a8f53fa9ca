// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Secret stores and run environment provisioning
//!
//! Secrets are read-only for the whole run. They are resolved into the
//! step environment and masked in every piece of captured output.

mod provisioner;
mod redact;

pub use provisioner::{EnvironmentProvisioner, ProvisionedEnv};
pub use redact::Redactor;

use std::collections::HashMap;
use std::path::Path;

use crate::errors::CiError;

/// Source of secret values
pub trait SecretStore: Send + Sync {
    /// Look up a secret by name
    fn get(&self, name: &str) -> Option<String>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Secrets taken from the runner's own process environment
#[derive(Debug, Default)]
pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn describe(&self) -> String {
        "process environment".to_string()
    }
}

/// In-memory secrets, e.g. loaded from a dotenv file
#[derive(Debug, Default)]
pub struct MapSecretStore {
    secrets: HashMap<String, String>,
    origin: String,
}

impl MapSecretStore {
    pub fn new(secrets: HashMap<String, String>) -> Self {
        Self {
            secrets,
            origin: "inline".to_string(),
        }
    }

    /// Load `NAME=value` pairs from a dotenv file
    pub fn from_dotenv(path: &Path) -> Result<Self, CiError> {
        let to_error = |e: dotenvy::Error| CiError::SecretsFile {
            path: path.to_path_buf(),
            error: e.to_string(),
        };

        let mut secrets = HashMap::new();
        for item in dotenvy::from_path_iter(path).map_err(to_error)? {
            let (key, value) = item.map_err(to_error)?;
            secrets.insert(key, value);
        }

        tracing::debug!(path = %path.display(), count = secrets.len(), "loaded secrets file");

        Ok(Self {
            secrets,
            origin: path.display().to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

impl SecretStore for MapSecretStore {
    fn get(&self, name: &str) -> Option<String> {
        self.secrets.get(name).cloned()
    }

    fn describe(&self) -> String {
        self.origin.clone()
    }
}

/// Stores consulted in order; the first one defining a secret wins
#[derive(Default)]
pub struct LayeredSecretStore {
    layers: Vec<Box<dyn SecretStore>>,
}

impl LayeredSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layer(mut self, store: Box<dyn SecretStore>) -> Self {
        self.layers.push(store);
        self
    }
}

impl SecretStore for LayeredSecretStore {
    fn get(&self, name: &str) -> Option<String> {
        self.layers.iter().find_map(|s| s.get(name))
    }

    fn describe(&self) -> String {
        self.layers
            .iter()
            .map(|s| s.describe())
            .collect::<Vec<_>>()
            .join(" > ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dotenv_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.env");
        std::fs::write(
            &path,
            "AWS_ACCESS_KEY_ID=AKIAEXAMPLE\n# comment\nSECRET_NAME=\"playbook/prod\"\n",
        )
        .unwrap();

        let store = MapSecretStore::from_dotenv(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("AWS_ACCESS_KEY_ID").as_deref(), Some("AKIAEXAMPLE"));
        assert_eq!(store.get("SECRET_NAME").as_deref(), Some("playbook/prod"));
        assert!(store.get("AWS_SECRET_ACCESS_KEY").is_none());
    }

    #[test]
    fn test_missing_dotenv_file() {
        let err = MapSecretStore::from_dotenv(Path::new("/nonexistent/secrets.env")).unwrap_err();
        assert!(matches!(err, CiError::SecretsFile { .. }));
    }

    #[test]
    fn test_layered_store_precedence() {
        let first = MapSecretStore::new(HashMap::from([("A".to_string(), "1".to_string())]));
        let second = MapSecretStore::new(HashMap::from([
            ("A".to_string(), "2".to_string()),
            ("B".to_string(), "3".to_string()),
        ]));

        let store = LayeredSecretStore::new()
            .with_layer(Box::new(first))
            .with_layer(Box::new(second));

        assert_eq!(store.get("A").as_deref(), Some("1"));
        assert_eq!(store.get("B").as_deref(), Some("3"));
        assert!(store.get("C").is_none());
    }
}
