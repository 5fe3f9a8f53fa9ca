// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! Workflow executor
//!
//! Evaluates the trigger, provisions a host and runs the steps in order,
//! stopping at the first failure.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::{Instant, SystemTime};

use colored::Colorize;

use crate::errors::{CiError, RecoverySuggestion};
use crate::executors::{StepContext, StepExecutor, StepResult, EXIT_NOT_FOUND};
use crate::history::{run_id, RunRecord, RunStore};
use crate::host::Host;
use crate::secrets::{EnvironmentProvisioner, ProvisionedEnv, Redactor, SecretStore};
use crate::utils::create_spinner;
use crate::workflow::{
    Action, Event, Run, RunStatus, Step, TriggerEvaluator, Workflow, WorkflowValidator,
};

/// Workflow execution options
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Only show what would be done
    pub dry_run: bool,
    /// Echo the output of every step, not only tests and failures
    pub verbose: bool,
    /// Leave the host directory in place after the run
    pub keep_workspace: bool,
    /// Run in this directory instead of a temporary one
    pub workspace: Option<PathBuf>,
}

/// What happened when an event was handed to a workflow
#[derive(Debug)]
pub enum RunOutcome {
    /// The trigger did not match; nothing ran
    Skipped,
    /// Dry run: the plan was printed
    Planned,
    /// A run executed to a terminal state
    Completed(Run),
}

impl RunOutcome {
    /// Whether the CLI should exit successfully
    pub fn is_success(&self) -> bool {
        match self {
            Self::Skipped | Self::Planned => true,
            Self::Completed(run) => run.status() == Some(RunStatus::Succeeded),
        }
    }
}

/// Workflow executor
pub struct WorkflowExecutor {
    /// Registered executors by action kind
    executors: HashMap<String, Box<dyn StepExecutor>>,
    /// Where `${{ secrets.NAME }}` values come from
    secrets: Box<dyn SecretStore>,
    /// Run history
    history: Option<Box<dyn RunStore>>,
    provisioner: EnvironmentProvisioner,
}

impl WorkflowExecutor {
    /// Create an executor with no step executors registered
    pub fn new(secrets: Box<dyn SecretStore>) -> Self {
        Self {
            executors: HashMap::new(),
            secrets,
            history: None,
            provisioner: EnvironmentProvisioner::new(),
        }
    }

    /// Register an executor for an action kind
    pub fn register_executor(&mut self, kind: &str, executor: Box<dyn StepExecutor>) {
        self.executors.insert(kind.to_string(), executor);
    }

    /// Record finished runs in a history store
    pub fn with_history(mut self, history: Box<dyn RunStore>) -> Self {
        self.history = Some(history);
        self
    }

    /// Execute a workflow for an event
    pub async fn execute(
        &self,
        workflow: &Workflow,
        event: &Event,
        options: &ExecutionOptions,
    ) -> Result<RunOutcome, CiError> {
        if !TriggerEvaluator::should_run(&workflow.on, event) {
            tracing::info!(event = %event.kind, branch = %event.branch, "event does not match workflow triggers");
            println!(
                "{} {} on '{}' does not trigger '{}'",
                "○".dimmed(),
                event.kind,
                event.branch,
                workflow.name
            );
            return Ok(RunOutcome::Skipped);
        }

        self.check_workflow(workflow)?;
        self.print_execution_plan(workflow, event);

        if options.dry_run {
            return Ok(RunOutcome::Planned);
        }

        let mut host = match &options.workspace {
            Some(root) => Host::at(root.clone())?,
            None => Host::ephemeral()?,
        };

        let started_at = SystemTime::now();
        let id = run_id(&workflow.name, event, started_at);

        let mut base_env = self.provisioner.provision(&workflow.env, self.secrets.as_ref());
        Self::export_run_variables(&mut base_env, &id, event, &host);

        let mut run = Run::new(id, &workflow.name, event.clone(), base_env.keys());
        run.started_at = started_at;

        tracing::info!(run = %run.id, workflow = %workflow.name, host = %host.root().display(), "run started");

        for step in &workflow.steps {
            run.begin_step(step)?;

            let result = self.execute_step(step, &mut host, &base_env, event).await;
            let success = result.success;

            if success {
                println!(
                    "\r  {} {} ({:.2}s)",
                    "✓".green(),
                    step.name.bold(),
                    result.duration.as_secs_f64()
                );
            } else {
                println!(
                    "\r  {} {} failed (exit code {})",
                    "✗".red(),
                    step.name.bold(),
                    result.exit_code
                );
            }

            let echo = options.verbose || !success || matches!(step.action, Action::Test { .. });
            if echo {
                Self::print_output(&result);
            }

            if !run.record(step, result)? {
                tracing::warn!(run = %run.id, step = %step.name, "step failed, halting run");
                break;
            }
        }

        let status = run.finish()?;
        self.print_summary(&run, status);

        if let Some(ref history) = self.history {
            if let Err(e) = history.save(&RunRecord::from(&run)).await {
                tracing::warn!(run = %run.id, error = %e, "failed to record run history");
            }
        }

        if options.keep_workspace {
            let kept = host.keep();
            println!("{} {}", "Workspace kept at".dimmed(), kept.display());
        }

        Ok(RunOutcome::Completed(run))
    }

    /// Refuse workflows that cannot run before touching the host
    fn check_workflow(&self, workflow: &Workflow) -> Result<(), CiError> {
        let validation = WorkflowValidator::validate(workflow)?;
        if !validation.is_valid() {
            return Err(CiError::InvalidWorkflow {
                reason: validation.errors.join("; "),
                help: Some("Run 'playbook-ci validate' for details".to_string()),
            });
        }

        for step in &workflow.steps {
            let executor = self.executor_for(step)?;
            executor.validate_step(step)?;
        }

        Ok(())
    }

    fn executor_for(&self, step: &Step) -> Result<&dyn StepExecutor, CiError> {
        let kind = step.action.kind();
        self.executors
            .get(kind)
            .map(|e| e.as_ref())
            .ok_or_else(|| CiError::ExecutorNotFound {
                action: kind.to_string(),
            })
    }

    /// Execute a single step
    ///
    /// Executor errors become a failed result, so a started run always
    /// reaches a terminal state.
    async fn execute_step(
        &self,
        step: &Step,
        host: &mut Host,
        base_env: &ProvisionedEnv,
        event: &Event,
    ) -> StepResult {
        let start = Instant::now();

        // step env overrides workflow env
        let env = self.provisioner.extend(base_env, &step.env, self.secrets.as_ref());
        let redactor = env.redactor();

        let executor = match self.executor_for(step) {
            Ok(executor) => executor,
            Err(e) => return Self::error_result(step, &e, &redactor, start),
        };

        tracing::debug!(step = %step.name, phase = %step.action.phase(), "step started");

        let mut ctx = StepContext {
            host,
            env,
            event,
            redactor,
        };

        let spinner = create_spinner(&format!("{}...", step.name));
        let result = executor.execute(step, &mut ctx).await;
        spinner.finish_and_clear();

        match result {
            Ok(result) => result,
            Err(e) => Self::error_result(step, &e, &ctx.redactor, start),
        }
    }

    fn error_result(
        step: &Step,
        error: &CiError,
        redactor: &Redactor,
        start: Instant,
    ) -> StepResult {
        tracing::error!(step = %step.name, error = %error, "step could not be executed");
        StepResult::failure(
            redactor.redact(&format!("{}\n", error)),
            EXIT_NOT_FOUND,
            start.elapsed(),
        )
    }

    fn export_run_variables(env: &mut ProvisionedEnv, id: &str, event: &Event, host: &Host) {
        env.set("CI", "true");
        env.set("PLAYBOOK_CI_RUN_ID", id);
        env.set("PLAYBOOK_CI_EVENT", event.kind.to_string());
        env.set("PLAYBOOK_CI_BRANCH", event.branch.as_str());
        if let Some(ref commit) = event.commit {
            env.set("PLAYBOOK_CI_COMMIT", commit.as_str());
        }
        env.set(
            "PLAYBOOK_CI_WORKSPACE",
            host.workspace().display().to_string(),
        );
    }

    fn print_output(result: &StepResult) {
        for line in result.stdout.lines() {
            println!("    {}", line.dimmed());
        }
        for line in result.stderr.lines() {
            println!("    {}", line.red().dimmed());
        }
    }

    /// Print the execution plan
    fn print_execution_plan(&self, workflow: &Workflow, event: &Event) {
        println!();
        println!("{}: {}", "Workflow".bold(), workflow.name);
        println!("{}", "═".repeat(50));
        println!(
            "Triggered by {} on '{}'{}",
            event.kind,
            event.branch,
            event
                .commit
                .as_deref()
                .map(|c| format!(" at {}", c))
                .unwrap_or_default()
        );
        println!(
            "Execution plan ({} step{}):",
            workflow.steps.len(),
            if workflow.steps.len() == 1 { "" } else { "s" }
        );
        println!();

        for (i, step) in workflow.steps.iter().enumerate() {
            println!(
                "  {}. {} {}",
                i + 1,
                step.name.bold(),
                format!("[{}] {}", step.action.phase(), step.action.summary()).dimmed()
            );
        }

        println!();
    }

    fn print_summary(&self, run: &Run, status: RunStatus) {
        println!();
        match status {
            RunStatus::Succeeded => println!(
                "{}",
                format!(
                    "Run {} succeeded in {:.2}s",
                    run.id,
                    run.duration().as_secs_f64()
                )
                .green()
            ),
            RunStatus::Failed => {
                println!(
                    "{}",
                    format!("Run {} failed after {:.2}s", run.id, run.duration().as_secs_f64())
                        .red()
                );
                if let Some((result, phase)) = run.failure() {
                    println!();
                    println!("{}", RecoverySuggestion::for_phase(phase, &result.step));
                }
            }
        }
    }

    /// Action kinds with no usable executor
    pub async fn check_tools(&self, workflow: &Workflow) -> Result<Vec<String>, CiError> {
        let mut missing = Vec::new();

        let kinds: HashSet<_> = workflow.steps.iter().map(|s| s.action.kind()).collect();

        for kind in kinds {
            match self.executors.get(kind) {
                Some(executor) => {
                    if !matches!(executor.check_available().await, Ok(true)) {
                        missing.push(kind.to_string());
                    }
                }
                None => missing.push(kind.to_string()),
            }
        }

        missing.sort();
        Ok(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::ShellExecutor;
    use crate::history::FilesystemRunStore;
    use crate::secrets::MapSecretStore;
    use crate::workflow::{EventKind, RunState, StepPhase};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Records the steps it runs and fails the configured one
    struct FakeExecutor {
        calls: Arc<Mutex<Vec<String>>>,
        fail_step: Option<&'static str>,
        output: &'static str,
    }

    #[async_trait]
    impl StepExecutor for FakeExecutor {
        async fn execute(
            &self,
            step: &Step,
            ctx: &mut StepContext<'_>,
        ) -> Result<StepResult, CiError> {
            self.calls.lock().unwrap().push(step.name.clone());

            let secret = ctx.env.get("SECRET_NAME").unwrap_or_default().to_string();
            let stdout = ctx.redactor.redact(&format!("{} {}", self.output, secret));

            if self.fail_step == Some(step.name.as_str()) {
                return Ok(StepResult::failure(stdout, 1, Duration::from_millis(1)));
            }
            Ok(StepResult::success(stdout, Duration::from_millis(1)))
        }

        async fn check_available(&self) -> Result<bool, CiError> {
            Ok(true)
        }

        fn validate_step(&self, _step: &Step) -> Result<(), CiError> {
            Ok(())
        }
    }

    /// Cannot handle any step it is given
    struct BrokenExecutor;

    #[async_trait]
    impl StepExecutor for BrokenExecutor {
        async fn execute(
            &self,
            step: &Step,
            _ctx: &mut StepContext<'_>,
        ) -> Result<StepResult, CiError> {
            Err(CiError::InvalidStep {
                step: step.name.clone(),
                reason: "source location unavailable".to_string(),
            })
        }

        async fn check_available(&self) -> Result<bool, CiError> {
            Ok(true)
        }

        fn validate_step(&self, _step: &Step) -> Result<(), CiError> {
            Ok(())
        }
    }

    struct Harness {
        executor: WorkflowExecutor,
        calls: Arc<Mutex<Vec<String>>>,
    }

    fn harness(fail_step: Option<&'static str>) -> Harness {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let secrets = MapSecretStore::new(HashMap::from([
            ("AWS_ACCESS_KEY_ID".to_string(), "AKIAEXAMPLE".to_string()),
            ("AWS_SECRET_ACCESS_KEY".to_string(), "wJalrXUtnFEMI".to_string()),
            ("SECRET_NAME".to_string(), "prod/playbook".to_string()),
        ]));

        let mut executor = WorkflowExecutor::new(Box::new(secrets));
        for kind in ["checkout", "setup-runtime", "install", "test"] {
            executor.register_executor(
                kind,
                Box::new(FakeExecutor {
                    calls: calls.clone(),
                    fail_step,
                    output: "ok",
                }),
            );
        }

        Harness { executor, calls }
    }

    fn completed(outcome: RunOutcome) -> Run {
        match outcome {
            RunOutcome::Completed(run) => run,
            other => panic!("Expected a completed run, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_push_to_main_succeeds() {
        let h = harness(None);
        let workflow = Workflow::playbook_default();
        let event = Event::new(EventKind::Push, "main");

        let outcome = h
            .executor
            .execute(&workflow, &event, &ExecutionOptions::default())
            .await
            .unwrap();
        assert!(outcome.is_success());

        let run = completed(outcome);
        assert_eq!(run.state, RunState::Succeeded);
        assert_eq!(
            *h.calls.lock().unwrap(),
            vec!["checkout", "setup-python", "install-dependencies", "run-tests"]
        );
    }

    #[tokio::test]
    async fn test_pull_request_to_feature_branch_skipped() {
        let h = harness(None);
        let workflow = Workflow::playbook_default();
        let event = Event::new(EventKind::PullRequest, "feature/x");

        let outcome = h
            .executor
            .execute(&workflow, &event, &ExecutionOptions::default())
            .await
            .unwrap();

        assert!(matches!(outcome, RunOutcome::Skipped));
        assert!(outcome.is_success());
        assert!(h.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dependency_failure_halts_before_tests() {
        let h = harness(Some("install-dependencies"));
        let workflow = Workflow::playbook_default();
        let event = Event::new(EventKind::Push, "main");

        let outcome = h
            .executor
            .execute(&workflow, &event, &ExecutionOptions::default())
            .await
            .unwrap();
        assert!(!outcome.is_success());

        let run = completed(outcome);
        assert_eq!(run.state, RunState::Failed);
        assert_eq!(run.results.len(), 3);
        assert!(!h.calls.lock().unwrap().contains(&"run-tests".to_string()));

        let (failed, phase) = run.failure().unwrap();
        assert_eq!(failed.step, "install-dependencies");
        assert_eq!(phase, StepPhase::InstallingDeps);
    }

    #[tokio::test]
    async fn test_failing_assertion_fails_at_test_step() {
        let h = harness(Some("run-tests"));
        let workflow = Workflow::playbook_default();
        let event = Event::new(EventKind::Push, "main").with_commit("abc123");

        let run = completed(
            h.executor
                .execute(&workflow, &event, &ExecutionOptions::default())
                .await
                .unwrap(),
        );

        assert_eq!(run.state, RunState::Failed);
        assert_eq!(run.results.len(), 4);
        assert_eq!(run.failure().unwrap().1, StepPhase::Testing);
    }

    #[tokio::test]
    async fn test_executor_error_fails_run_and_is_recorded() {
        let history_dir = tempfile::tempdir().unwrap();
        let mut h = harness(None);
        h.executor.register_executor("install", Box::new(BrokenExecutor));
        let executor = h.executor.with_history(Box::new(
            FilesystemRunStore::new(history_dir.path().to_path_buf()).unwrap(),
        ));

        let workflow = Workflow::playbook_default();
        let event = Event::new(EventKind::Push, "main");

        let run = completed(
            executor
                .execute(&workflow, &event, &ExecutionOptions::default())
                .await
                .unwrap(),
        );

        assert_eq!(run.state, RunState::Failed);
        assert_eq!(run.results.len(), 3);
        let (failed, phase) = run.failure().unwrap();
        assert_eq!(failed.step, "install-dependencies");
        assert_eq!(failed.exit_code, 127);
        assert!(failed.stderr.contains("source location unavailable"));
        assert_eq!(phase, StepPhase::InstallingDeps);
        assert!(!h.calls.lock().unwrap().contains(&"run-tests".to_string()));

        let store = FilesystemRunStore::new(history_dir.path().to_path_buf()).unwrap();
        let record = store.get(&run.id).await.unwrap().unwrap();
        assert_eq!(record.status, RunStatus::Failed);
        assert_eq!(record.steps.len(), 3);
    }

    #[tokio::test]
    async fn test_dry_run_executes_nothing() {
        let h = harness(None);
        let workflow = Workflow::playbook_default();
        let event = Event::new(EventKind::Push, "main");
        let options = ExecutionOptions {
            dry_run: true,
            ..Default::default()
        };

        let outcome = h.executor.execute(&workflow, &event, &options).await.unwrap();
        assert!(matches!(outcome, RunOutcome::Planned));
        assert!(h.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_secrets_masked_in_results() {
        let h = harness(None);
        let workflow = Workflow::playbook_default();
        let event = Event::new(EventKind::Push, "main");

        let run = completed(
            h.executor
                .execute(&workflow, &event, &ExecutionOptions::default())
                .await
                .unwrap(),
        );

        assert!(run.env_keys.contains(&"SECRET_NAME".to_string()));
        assert!(run.env_keys.contains(&"PLAYBOOK_CI_RUN_ID".to_string()));
        for result in &run.results {
            assert!(!result.stdout.contains("prod/playbook"));
            assert_eq!(result.stdout, "ok ***");
        }
    }

    #[tokio::test]
    async fn test_missing_executor_is_error() {
        let executor = WorkflowExecutor::new(Box::new(MapSecretStore::new(HashMap::new())));
        let workflow = Workflow::playbook_default();
        let event = Event::new(EventKind::Push, "main");

        let err = executor
            .execute(&workflow, &event, &ExecutionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CiError::ExecutorNotFound { .. }));

        let missing = executor.check_tools(&workflow).await.unwrap();
        assert_eq!(missing, vec!["checkout", "install", "setup-runtime", "test"]);
    }

    #[tokio::test]
    async fn test_invalid_workflow_rejected() {
        let h = harness(None);
        let mut workflow = Workflow::playbook_default();
        workflow.steps.swap(1, 2);
        let event = Event::new(EventKind::Push, "main");

        let err = h
            .executor
            .execute(&workflow, &event, &ExecutionOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, CiError::InvalidWorkflow { .. }));
        assert!(h.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shell_steps_see_run_variables_and_history_saved() {
        let history_dir = tempfile::tempdir().unwrap();
        let mut executor = WorkflowExecutor::new(Box::new(MapSecretStore::new(HashMap::new())))
            .with_history(Box::new(
                FilesystemRunStore::new(history_dir.path().to_path_buf()).unwrap(),
            ));
        executor.register_executor("shell", Box::new(ShellExecutor::new()));

        let workflow = Workflow::from_yaml(
            r#"
name: vars
on:
  push: {}
steps:
  - name: show
    action:
      type: shell
      command: 'echo "$CI $PLAYBOOK_CI_EVENT $PLAYBOOK_CI_BRANCH"'
  - name: fail
    action:
      type: shell
      command: exit 3
  - name: never
    action:
      type: shell
      command: echo unreachable
"#,
        )
        .unwrap();
        let event = Event::new(EventKind::Push, "refs/heads/release/1.0");

        let run = completed(
            executor
                .execute(&workflow, &event, &ExecutionOptions::default())
                .await
                .unwrap(),
        );

        assert_eq!(run.results[0].stdout.trim(), "true push release/1.0");
        assert_eq!(run.results.len(), 2);
        assert_eq!(run.results[1].exit_code, 3);

        let store = FilesystemRunStore::new(history_dir.path().to_path_buf()).unwrap();
        let record = store.get(&run.id).await.unwrap().unwrap();
        assert_eq!(record.status, RunStatus::Failed);
        assert_eq!(record.steps.len(), 2);
    }
}
