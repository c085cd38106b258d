// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::model::ConfigFile;
use crate::engine::TaskName;

/// Compiled watch/exclude glob sets for a single task.
///
/// Patterns are relative to the source root; the watcher passes relative
/// paths (e.g. `"css/main.css"`) into [`WatchProfile::matches`].
#[derive(Clone)]
pub struct WatchProfile {
    name: TaskName,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for WatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchProfile")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl WatchProfile {
    /// Name of the task this profile triggers.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when the task is interested in the given source-relative path.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Build a compiled watch profile for every task that watches anything.
///
/// Pattern precedence per task:
/// - `append_default_watch = true`: effective list is
///   `task.watch + default.watch`.
/// - else, a task-local list replaces the default.
/// - a task with neither task-local nor default patterns gets no profile
///   and is never watch-triggered (clean, lint).
///
/// Same rules apply to `exclude`.
pub fn build_watch_profiles(cfg: &ConfigFile) -> Result<Vec<WatchProfile>> {
    let mut profiles = Vec::new();

    for (name, task) in cfg.task.iter() {
        let watch_patterns = effective_patterns(
            task.watch.as_ref(),
            &cfg.default.watch,
            task.append_default_watch,
        );
        if watch_patterns.is_empty() {
            continue;
        }

        let exclude_patterns = effective_patterns(
            task.exclude.as_ref(),
            &cfg.default.exclude,
            task.append_default_exclude,
        );

        let watch_set = build_globset(&watch_patterns)
            .with_context(|| format!("building watch globset for task {name}"))?;

        let exclude_set = if exclude_patterns.is_empty() {
            None
        } else {
            Some(
                build_globset(&exclude_patterns)
                    .with_context(|| format!("building exclude globset for task {name}"))?,
            )
        };

        profiles.push(WatchProfile {
            name: name.clone(),
            watch_set,
            exclude_set,
        });
    }

    Ok(profiles)
}

/// Effective pattern list for one dimension (watch or exclude).
fn effective_patterns(
    task_list: Option<&Vec<String>>,
    default_list: &[String],
    append_default: bool,
) -> Vec<String> {
    match (task_list, append_default) {
        (Some(list), true) => {
            let mut combined = list.clone();
            combined.extend(default_list.iter().cloned());
            combined
        }
        (Some(list), false) => list.clone(),
        (None, _) => default_list.to_vec(),
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
