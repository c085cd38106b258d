// src/dag/scheduler.rs

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::config::model::ConfigFile;
use crate::dag::graph::TaskGraph;
use crate::engine::{TaskName, TaskOutcome};

/// Per-run state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Triggered for this run, waiting on dependencies.
    Pending,
    /// Dispatched to the executor.
    Running,
    /// Reached a successful terminal state in this run.
    Succeeded,
    /// Failed in this run.
    Failed,
    /// Never run because an upstream task failed in this run.
    Skipped,
}

/// Static task information derived from config, plus per-run state.
#[derive(Debug, Clone)]
struct TaskInfo {
    name: TaskName,
    /// Failure of this task does not skip dependents or fail the graph.
    soft_fail: bool,
    /// Direct dependencies (names in `after = [...]`).
    deps: Vec<TaskName>,

    /// Per-run state (`None` if not participating in the current run).
    run_state: Option<TaskState>,

    /// Last run ID in which this task succeeded. Lets a watch-triggered
    /// partial run treat previously-built dependencies as satisfied, so a
    /// stylesheet save re-runs only the style task.
    last_successful_run: Option<u64>,
}

/// A task the scheduler wants the executor to run now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub soft_fail: bool,
}

/// Scheduler: the immutable DAG plus mutable per-run state.
///
/// Responsibilities:
/// - remember which tasks participate in the current run
/// - decide when a triggered task is ready (dependencies terminal)
/// - mark tasks Succeeded/Failed and skip dependents of hard failures
/// - surface the first hard failure of a run
pub struct Scheduler {
    graph: TaskGraph,
    tasks: HashMap<TaskName, TaskInfo>,

    /// Monotonically increasing run ID.
    run_counter: u64,
    /// Active run ID, or `None` when idle.
    current_run_id: Option<u64>,
    /// First hard-failing task of the current (or just-finished) run.
    first_failure: Option<TaskName>,
}

impl Scheduler {
    /// Construct a scheduler from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let graph = TaskGraph::from_config(cfg);

        let mut tasks = HashMap::new();
        for (name, tc) in cfg.task.iter() {
            let deps = graph.dependencies_of(name).to_vec();
            tasks.insert(
                name.clone(),
                TaskInfo {
                    name: name.clone(),
                    soft_fail: tc.effective_soft_fail(),
                    deps,
                    run_state: None,
                    last_successful_run: None,
                },
            );
        }

        Self {
            graph,
            tasks,
            run_counter: 0,
            current_run_id: None,
            first_failure: None,
        }
    }

    /// True when no run is active.
    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    /// Number of runs started so far.
    pub fn runs_started(&self) -> u64 {
        self.run_counter
    }

    /// First hard failure of the most recent run, if any.
    pub fn take_first_failure(&mut self) -> Option<TaskName> {
        self.first_failure.take()
    }

    /// Per-run state of a task, if it participates in the current run.
    pub fn state_of(&self, task: &str) -> Option<TaskState> {
        self.tasks.get(task).and_then(|t| t.run_state)
    }

    /// Whether a task is configured soft-fail (unknown tasks are not).
    pub fn soft_fail_of(&self, task: &str) -> bool {
        self.tasks.get(task).map(|t| t.soft_fail).unwrap_or(false)
    }

    /// Start a new run, resetting per-run state but keeping the success
    /// history used for dependency satisfaction in partial runs.
    pub fn start_new_run(&mut self) {
        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);
        self.first_failure = None;

        for info in self.tasks.values_mut() {
            info.run_state = None;
        }

        debug!(run_id = self.run_counter, "scheduler: starting new run");
    }

    /// Mark a task as participating in the current run.
    ///
    /// Returns the tasks that became ready to execute.
    pub fn handle_trigger(&mut self, task: &str) -> Vec<ScheduledTask> {
        if self.current_run_id.is_none() {
            warn!("handle_trigger with no active run; implicitly starting one");
            self.start_new_run();
        }

        match self.tasks.get_mut(task) {
            Some(info) => {
                if info.run_state.is_none() {
                    info.run_state = Some(TaskState::Pending);
                    debug!(task = %info.name, "task marked Pending in this run");
                } else {
                    debug!(
                        task = %info.name,
                        "task already participating in current run; ignoring trigger"
                    );
                }
            }
            None => {
                warn!(task = %task, "trigger for unknown task; ignoring");
            }
        }

        let ready = self.collect_new_ready_tasks();
        self.maybe_finish_run();
        ready
    }

    /// Record completion of a task.
    ///
    /// On success dependents may become ready. On hard failure all pending
    /// dependents (transitively) are marked Skipped and the failure is
    /// remembered as the run's first failure. Soft failures count as
    /// satisfied for dependency purposes.
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> Vec<ScheduledTask> {
        let run_id = match self.current_run_id {
            Some(id) => id,
            None => {
                warn!(task = %task, "completion with no active run; ignoring");
                return Vec::new();
            }
        };

        let mut newly_ready = Vec::new();

        match self.tasks.get_mut(task) {
            Some(info) => match outcome {
                TaskOutcome::Success => {
                    info.run_state = Some(TaskState::Succeeded);
                    info.last_successful_run = Some(run_id);
                    debug!(task = %info.name, "task completed successfully");
                    newly_ready.extend(self.collect_new_ready_tasks());
                }
                TaskOutcome::Failed { .. } => {
                    let soft = info.soft_fail;
                    info.run_state = Some(TaskState::Failed);
                    if soft {
                        // Dependents proceed; the run is not failed by this.
                        info.last_successful_run = Some(run_id);
                        debug!(task = %info.name, "soft task failure; dependents proceed");
                        newly_ready.extend(self.collect_new_ready_tasks());
                    } else {
                        warn!(task = %info.name, "task failed; skipping dependents");
                        if self.first_failure.is_none() {
                            self.first_failure = Some(task.to_string());
                        }
                        self.mark_dependents_skipped(task);
                    }
                }
            },
            None => {
                warn!(task = %task, "completion for unknown task; ignoring");
            }
        }

        self.maybe_finish_run();
        newly_ready
    }

    /// Clear the active run once every participating task is terminal.
    fn maybe_finish_run(&mut self) {
        if self.current_run_id.is_none() {
            return;
        }

        let any_active = self.tasks.values().any(|info| {
            matches!(
                info.run_state,
                Some(TaskState::Pending) | Some(TaskState::Running)
            )
        });

        if !any_active {
            info!(
                run_id = self.current_run_id,
                "scheduler: all tasks terminal; run finished"
            );
            self.current_run_id = None;
        }
    }

    /// Pending tasks whose dependencies are satisfied become Running and
    /// are returned for dispatch.
    fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        let mut ready = Vec::new();

        let candidates: Vec<TaskName> = self
            .tasks
            .values()
            .filter_map(|info| {
                if matches!(info.run_state, Some(TaskState::Pending))
                    && self.deps_satisfied(info)
                {
                    Some(info.name.clone())
                } else {
                    None
                }
            })
            .collect();

        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                debug!(task = %info.name, "dependencies satisfied; marking Running");
                info.run_state = Some(TaskState::Running);
                ready.push(ScheduledTask {
                    name: info.name.clone(),
                    soft_fail: info.soft_fail,
                });
            }
        }

        ready
    }

    /// A dependency is satisfied when it succeeded (or soft-failed) in this
    /// run, or is not participating but succeeded in an earlier run.
    fn deps_satisfied(&self, info: &TaskInfo) -> bool {
        for dep_name in &info.deps {
            let dep = match self.tasks.get(dep_name) {
                Some(d) => d,
                None => {
                    warn!(task = %info.name, dep = %dep_name, "dependency missing from task map");
                    return false;
                }
            };

            match dep.run_state {
                Some(TaskState::Succeeded) => {}
                Some(TaskState::Failed) if dep.soft_fail => {}
                Some(TaskState::Failed) | Some(TaskState::Skipped) => return false,
                Some(TaskState::Pending) | Some(TaskState::Running) => return false,
                None => {
                    if dep.last_successful_run.is_none() {
                        return false;
                    }
                }
            }
        }

        true
    }

    /// Transitively mark pending dependents of a hard-failed task Skipped.
    fn mark_dependents_skipped(&mut self, failed_task: &str) {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed_task).to_vec();

        while let Some(name) = stack.pop() {
            if let Some(info) = self.tasks.get_mut(&name) {
                if matches!(info.run_state, Some(TaskState::Pending)) {
                    info.run_state = Some(TaskState::Skipped);
                    debug!(task = %info.name, "skipped due to upstream failure");
                    stack.extend(self.graph.dependents_of(&name).iter().cloned());
                }
            }
        }
    }
}
