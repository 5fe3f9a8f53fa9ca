// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Utility modules
//!
//! Console helpers shared by the executor and the CLI.

pub mod spinner;

pub use spinner::*;
