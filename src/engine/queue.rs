// src/engine/queue.rs

use std::collections::BTreeSet;

use tracing::debug;

use super::runtime::TaskName;

/// Triggers that arrived while a run was already executing.
///
/// Triggers for the same task coalesce into a single pending entry, so a
/// burst of file-change events during a build schedules at most one
/// follow-up execution per task rather than queuing unboundedly. The set is
/// drained in one batch when the scheduler goes idle, letting the next run
/// start from everything that accumulated.
#[derive(Debug, Default)]
pub struct PendingTriggers {
    tasks: BTreeSet<TaskName>,
}

impl PendingTriggers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Record a trigger for a task; duplicates coalesce.
    pub fn record(&mut self, task: &str) {
        let inserted = self.tasks.insert(task.to_string());
        debug!(task = %task, inserted, "recorded pending trigger");
    }

    /// Drain all pending triggers for the next run.
    pub fn drain(&mut self) -> Vec<TaskName> {
        let tasks: Vec<TaskName> = std::mem::take(&mut self.tasks).into_iter().collect();
        if !tasks.is_empty() {
            debug!(drained = tasks.len(), "drained pending triggers into new run");
        }
        tasks
    }
}
