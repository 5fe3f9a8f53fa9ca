// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Masking of secret values in captured output

const MASK: &str = "***";

/// Replaces every known secret value with `***`
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    // longest first, so a secret containing another is masked whole
    values: Vec<String>,
}

impl Redactor {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut values: Vec<String> = values
            .into_iter()
            .map(Into::into)
            .filter(|v| !v.is_empty())
            .collect();
        values.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        values.dedup();
        Self { values }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut out = text.to_string();
        for value in &self.values {
            if out.contains(value.as_str()) {
                out = out.replace(value.as_str(), MASK);
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
