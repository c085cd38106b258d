// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TaskName, TriggerReason};
use crate::watch::patterns::WatchProfile;

/// Window within which rapid change events coalesce into one trigger batch.
const DEBOUNCE_WINDOW: Duration = Duration::from_millis(200);

/// Handle keeping the underlying `notify` watcher alive. Dropping it stops
/// file watching; subscriptions otherwise persist until process shutdown.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher observing `root` recursively.
///
/// Changed paths are relativised against `root` and matched against every
/// task's compiled watch profile. Matching tasks are collected for a
/// debounce window and emitted as one trigger batch, so a burst of saves
/// produces a single trigger per task.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    profiles: Vec<WatchProfile>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    let profiles = Arc::new(profiles);

    // Channel from the blocking notify callback into the async world.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        {
            let event_tx = event_tx.clone();
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Err(err) = event_tx.send(event) {
                        // tracing is not reliably usable from the notify
                        // callback thread; fall back to stderr.
                        eprintln!("sitegear: failed to forward notify event: {err}");
                    }
                }
                Err(err) => {
                    eprintln!("sitegear: file watch error: {err}");
                }
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!("file watcher started on {:?}", root);

    tokio::spawn(forward_triggers(root, profiles, event_rx, runtime_tx));

    Ok(WatcherHandle { _inner: watcher })
}

/// Consume notify events, debounce, and forward task triggers.
async fn forward_triggers(
    root: PathBuf,
    profiles: Arc<Vec<WatchProfile>>,
    mut event_rx: mpsc::UnboundedReceiver<Event>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    while let Some(event) = event_rx.recv().await {
        debug!("received notify event: {:?}", event);

        let mut pending = matching_tasks(&root, &profiles, &event);
        if pending.is_empty() {
            continue;
        }

        // Collect everything else arriving inside the debounce window.
        let deadline = Instant::now() + DEBOUNCE_WINDOW;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => break,
                next = event_rx.recv() => match next {
                    Some(event) => {
                        pending.extend(matching_tasks(&root, &profiles, &event));
                    }
                    None => break,
                },
            }
        }

        let tasks: Vec<TaskName> = pending.into_iter().collect();
        debug!(?tasks, "watch match -> triggering tasks");
        if runtime_tx
            .send(RuntimeEvent::TasksTriggered {
                tasks,
                reason: TriggerReason::FileWatch,
            })
            .await
            .is_err()
        {
            // Runtime channel closed; nothing left to trigger.
            warn!("runtime channel closed; stopping watch forwarding");
            return;
        }
    }

    debug!("file watcher loop ended");
}

/// Tasks whose profiles match any path in the event.
fn matching_tasks(
    root: &Path,
    profiles: &[WatchProfile],
    event: &Event,
) -> BTreeSet<TaskName> {
    let mut tasks = BTreeSet::new();

    for path in &event.paths {
        let Some(rel) = relative_str(root, path) else {
            warn!("could not relativize path {:?} against root {:?}", path, root);
            continue;
        };
        for profile in profiles {
            if profile.matches(&rel) {
                tasks.insert(profile.name().to_string());
            }
        }
    }

    tasks
}

/// Path relative to `root`, with forward slashes.
fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}
