// src/exec/mod.rs

//! Task execution layer.
//!
//! Consumes [`ScheduledTask`]s from the runtime and runs the corresponding
//! action. Each dispatched task gets its own tokio task, so independent
//! graph branches execute in parallel; the action body itself (filesystem
//! and CPU-bound transform work, image recompression included) runs under
//! `spawn_blocking` so it never stalls the event loop.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::dag::scheduler::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::tasks::{ActionMap, TaskAction};

/// Spawn the background executor loop.
///
/// The returned sender is what the runtime uses to dispatch ready tasks.
pub fn spawn_executor(
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    actions: ActionMap,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);
    let actions = Arc::new(actions);

    tokio::spawn(async move {
        info!("executor loop started");
        while let Some(task) = rx.recv().await {
            let runtime_tx = runtime_tx.clone();
            let action = actions.get(&task.name).cloned();
            tokio::spawn(async move {
                run_task(task, action, runtime_tx).await;
            });
        }
        info!("executor loop finished (channel closed)");
    });

    tx
}

async fn run_task(
    task: ScheduledTask,
    action: Option<Arc<TaskAction>>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let outcome = match action {
        Some(action) => execute_action(&task.name, action).await,
        None => {
            error!(task = %task.name, "no action registered for task");
            TaskOutcome::Failed {
                message: "no action registered".to_string(),
            }
        }
    };

    let _ = runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name,
            outcome,
        })
        .await;
}

async fn execute_action(name: &str, action: Arc<TaskAction>) -> TaskOutcome {
    info!(task = %name, "starting task");

    let result = tokio::task::spawn_blocking(move || action.run()).await;

    match result {
        Ok(Ok(())) => TaskOutcome::Success,
        Ok(Err(e)) => TaskOutcome::Failed {
            message: e.to_string(),
        },
        Err(join_err) => TaskOutcome::Failed {
            message: format!("task panicked: {join_err}"),
        },
    }
}
