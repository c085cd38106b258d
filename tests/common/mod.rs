// tests/common/mod.rs

#![allow(dead_code)]

use std::collections::BTreeMap;

use sitegear::config::model::{ActionConfig, ConfigFile, DefaultSection, TaskConfig};

/// Build a task with the given action and `after` list; everything else
/// defaulted.
pub fn task(action: ActionConfig, after: &[&str]) -> TaskConfig {
    TaskConfig {
        action,
        after: after.iter().map(|s| s.to_string()).collect(),
        parallel_with: Vec::new(),
        watch: None,
        exclude: None,
        append_default_watch: false,
        append_default_exclude: false,
        soft_fail: None,
    }
}

/// A `clean`-action task, the simplest runnable unit for graph-level tests.
pub fn clean_task(after: &[&str]) -> TaskConfig {
    task(ActionConfig::Clean, after)
}

pub fn config_with_tasks(tasks: BTreeMap<String, TaskConfig>) -> ConfigFile {
    ConfigFile {
        project: Default::default(),
        server: Default::default(),
        default: DefaultSection::default(),
        task: tasks,
    }
}
