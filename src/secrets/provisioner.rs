// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Environment provisioning
//!
//! Resolves `${{ secrets.NAME }}` references in workflow and step
//! environments. An undefined secret becomes an empty value; whichever step
//! needs it will fail on its own.

use regex::{Captures, Regex};
use std::collections::BTreeMap;

use super::{Redactor, SecretStore};

/// Environment materialized for a run
#[derive(Debug, Clone, Default)]
pub struct ProvisionedEnv {
    /// Variables passed to step processes
    pub vars: BTreeMap<String, String>,
    /// Secrets referenced but not defined in the store
    pub missing: Vec<String>,
    secret_values: Vec<String>,
}

impl ProvisionedEnv {
    /// Redactor masking every secret resolved so far
    pub fn redactor(&self) -> Redactor {
        Redactor::new(self.secret_values.iter().cloned())
    }

    /// Names of the provisioned variables
    pub fn keys(&self) -> Vec<String> {
        self.vars.keys().cloned().collect()
    }

    /// Add a plain (non-secret) variable
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.vars.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

/// Environment provisioner
pub struct EnvironmentProvisioner {
    secret_ref: Regex,
    expression: Regex,
}

impl EnvironmentProvisioner {
    pub fn new() -> Self {
        Self {
            secret_ref: Regex::new(r"\$\{\{\s*secrets\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}")
                .expect("Invalid secret reference pattern"),
            expression: Regex::new(r"\$\{\{\s*(.*?)\s*\}\}").expect("Invalid expression pattern"),
        }
    }

    /// Resolve an environment map against a secret store
    pub fn provision(
        &self,
        env: &BTreeMap<String, String>,
        store: &dyn SecretStore,
    ) -> ProvisionedEnv {
        let mut provisioned = ProvisionedEnv::default();
        self.resolve_into(&mut provisioned, env, store);
        provisioned
    }

    /// Layer a step's environment over an already provisioned one
    pub fn extend(
        &self,
        base: &ProvisionedEnv,
        env: &BTreeMap<String, String>,
        store: &dyn SecretStore,
    ) -> ProvisionedEnv {
        let mut provisioned = base.clone();
        self.resolve_into(&mut provisioned, env, store);
        provisioned
    }

    fn resolve_into(
        &self,
        provisioned: &mut ProvisionedEnv,
        env: &BTreeMap<String, String>,
        store: &dyn SecretStore,
    ) {
        for (key, template) in env {
            let value = self
                .secret_ref
                .replace_all(template, |caps: &Captures| {
                    let name = &caps[1];
                    match store.get(name) {
                        Some(secret) => {
                            if !secret.is_empty() {
                                provisioned.secret_values.push(secret.clone());
                            }
                            secret
                        }
                        None => {
                            tracing::warn!(secret = name, variable = %key, "secret is not defined, using empty value");
                            if !provisioned.missing.iter().any(|m| m == name) {
                                provisioned.missing.push(name.to_string());
                            }
                            String::new()
                        }
                    }
                })
                .into_owned();

            provisioned.vars.insert(key.clone(), value);
        }
    }

    /// `${{ ... }}` expressions that are not secret references
    pub fn unsupported_expressions(&self, value: &str) -> Vec<String> {
        self.expression
            .captures_iter(value)
            .filter(|c| !self.secret_ref.is_match(&c[0]))
            .map(|c| c[1].to_string())
            .collect()
    }
}

impl Default for EnvironmentProvisioner {
    fn default() -> Self {
        Self::new()
    }
}
