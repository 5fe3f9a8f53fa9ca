// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Run identifiers
//!
//! Uses BLAKE3 over the event and start time.

use blake3::Hasher;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::workflow::Event;

/// Hex characters kept from the digest
pub const RUN_ID_LEN: usize = 16;

/// Identifier for a run of `event` starting at `started_at`
pub fn run_id(workflow: &str, event: &Event, started_at: SystemTime) -> String {
    let mut hasher = Hasher::new();
    hasher.update(workflow.as_bytes());
    hasher.update(event.kind.to_string().as_bytes());
    hasher.update(event.branch.as_bytes());
    if let Some(ref commit) = event.commit {
        hasher.update(commit.as_bytes());
    }
    if let Some(ref repository) = event.repository {
        hasher.update(repository.as_bytes());
    }

    let nanos = started_at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    hasher.update(&nanos.to_le_bytes());

    let mut id = hasher.finalize().to_hex().to_string();
    id.truncate(RUN_ID_LEN);
    id
}

/// Whether `s` has the shape of a run id (or a prefix of one)
pub fn is_run_id_prefix(s: &str) -> bool {
    !s.is_empty() && s.len() <= RUN_ID_LEN && s.chars().all(|c| c.is_ascii_hexdigit())
}
