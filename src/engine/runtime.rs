// src/engine/runtime.rs

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::dag::scheduler::{ScheduledTask, Scheduler};
use crate::engine::queue::PendingTriggers;
use crate::errors::GraphExecutionError;
use crate::report;

/// Task names as used throughout the engine.
pub type TaskName = String;

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    FileWatch,
    Manual,
}

/// Result of a task action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed { message: String },
}

/// Events sent into the runtime by the watcher, the executor, and the
/// Ctrl-C handler.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// One or more tasks were triggered together. A batch that arrives
    /// while the scheduler is idle becomes one run; mid-run batches are
    /// coalesced for the next run.
    TasksTriggered {
        tasks: Vec<TaskName>,
        reason: TriggerReason,
    },
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    ShutdownRequested,
}

/// Options influencing runtime behaviour.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Exit once nothing is left to run and no triggers are pending.
    /// In watch mode this is `false`.
    pub exit_when_idle: bool,
    /// Treat a failure in the first (full-build) run as fatal: the runtime
    /// returns the error and the process exits non-zero before settling
    /// into watch mode.
    pub initial_run_fatal: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            exit_when_idle: false,
            initial_run_fatal: true,
        }
    }
}

/// The orchestration runtime.
///
/// Consumes [`RuntimeEvent`]s, drives the scheduler, coalesces triggers
/// that arrive mid-run, dispatches ready tasks to the executor, and routes
/// failures through the reporting boundary.
pub struct Runtime {
    scheduler: Scheduler,
    pending: PendingTriggers,
    options: RuntimeOptions,

    events_rx: mpsc::Receiver<RuntimeEvent>,
    exec_tx: mpsc::Sender<ScheduledTask>,
}

impl Runtime {
    pub fn new(
        scheduler: Scheduler,
        options: RuntimeOptions,
        events_rx: mpsc::Receiver<RuntimeEvent>,
        exec_tx: mpsc::Sender<ScheduledTask>,
    ) -> Self {
        Self {
            scheduler,
            pending: PendingTriggers::new(),
            options,
            events_rx,
            exec_tx,
        }
    }

    /// Main event loop. Returns when shutdown is requested, when idle in
    /// `--once` mode, or with an error when the initial build fails.
    pub async fn run(mut self) -> Result<()> {
        info!("runtime started");

        while let Some(event) = self.events_rx.recv().await {
            debug!(?event, "runtime received event");

            let keep_running = match event {
                RuntimeEvent::TasksTriggered { tasks, reason } => {
                    self.handle_tasks_triggered(tasks, reason).await?;
                    true
                }
                RuntimeEvent::TaskCompleted { task, outcome } => {
                    self.handle_task_completion(task, outcome).await?
                }
                RuntimeEvent::ShutdownRequested => {
                    info!("shutdown requested, stopping runtime");
                    false
                }
            };

            if !keep_running {
                break;
            }
        }

        info!("runtime exiting");
        Ok(())
    }

    async fn handle_tasks_triggered(
        &mut self,
        tasks: Vec<TaskName>,
        reason: TriggerReason,
    ) -> Result<()> {
        info!(?tasks, ?reason, "tasks triggered");

        if self.scheduler.is_idle() {
            let mut triggers = self.pending.drain();
            for task in tasks {
                if !triggers.contains(&task) {
                    triggers.push(task);
                }
            }
            self.start_new_run(triggers).await?;
        } else {
            // A run is active; coalesce for the next one.
            for task in &tasks {
                self.pending.record(task);
            }
        }

        Ok(())
    }

    /// Returns `false` when the runtime should stop.
    async fn handle_task_completion(
        &mut self,
        task: TaskName,
        outcome: TaskOutcome,
    ) -> Result<bool> {
        match &outcome {
            TaskOutcome::Success => info!(task = %task, "task completed"),
            TaskOutcome::Failed { message } => {
                report::task_failed(&task, self.scheduler.soft_fail_of(&task), message);
            }
        }

        let newly_ready = self.scheduler.handle_completion(&task, outcome);
        self.dispatch_ready_tasks(newly_ready).await?;

        if self.scheduler.is_idle() {
            let first_run = self.scheduler.runs_started() == 1;
            let failure = self.scheduler.take_first_failure();

            if let Some(failed_task) = failure {
                if first_run && self.options.initial_run_fatal {
                    return Err(GraphExecutionError { task: failed_task }.into());
                }
                // Watch mode: keep the loop alive so the developer can fix
                // and retrigger.
                warn!(task = %failed_task, "run failed; watching for changes");
            }

            if !self.pending.is_empty() {
                let triggers = self.pending.drain();
                self.start_new_run(triggers).await?;
            } else if self.options.exit_when_idle {
                info!("runtime idle and exit_when_idle=true, stopping");
                return Ok(false);
            }
        }

        Ok(true)
    }

    async fn start_new_run(&mut self, triggers: Vec<TaskName>) -> Result<()> {
        if triggers.is_empty() {
            debug!("start_new_run with empty trigger set; nothing to do");
            return Ok(());
        }

        info!(triggers = ?triggers, "starting new run");
        self.scheduler.start_new_run();

        for task in triggers {
            let newly_ready = self.scheduler.handle_trigger(&task);
            self.dispatch_ready_tasks(newly_ready).await?;
        }

        Ok(())
    }

    async fn dispatch_ready_tasks(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        for task in tasks {
            debug!(task = %task.name, "dispatching task to executor");
            if let Err(err) = self.exec_tx.send(task).await {
                error!(error = %err, "failed to send task to executor");
                return Err(err.into());
            }
        }
        Ok(())
    }
}
