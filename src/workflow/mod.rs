// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Workflow definitions and types
//!
//! This module defines the workflow schema, trigger evaluation, the run
//! state machine and the executor that drives a run.

mod definition;
mod executor;
mod run;
mod trigger;
mod validation;

pub use definition::*;
pub use executor::{ExecutionOptions, RunOutcome, WorkflowExecutor};
pub use run::{Run, RunState, RunStatus, StepPhase};
pub use trigger::{Event, EventKind, TriggerEvaluator};
pub use validation::{ValidationResult, WorkflowValidator};
