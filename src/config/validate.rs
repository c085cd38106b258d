// src/config/validate.rs

use anyhow::{anyhow, Context, Result};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ActionConfig, ConfigFile};
use crate::errors::GraphError;

/// Run semantic validation against a loaded configuration.
///
/// Checks:
/// - there is at least one task
/// - `after` / `parallel_with` refer to existing, distinct tasks
/// - no task lists the same peer in both relations
/// - the ordering relation is acyclic
/// - per-action sanity: pattern lists are non-empty, browser targets parse
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    validate_ordering(cfg)?;
    validate_actions(cfg)?;
    Ok(())
}

/// Ordering-relation validation: reference integrity and acyclicity.
///
/// Kept separately typed so construction-time graph errors surface as
/// [`GraphError`] rather than as opaque strings.
pub fn validate_ordering(cfg: &ConfigFile) -> Result<(), GraphError> {
    if cfg.task.is_empty() {
        return Err(GraphError::NoTasks);
    }

    for (name, task) in cfg.task.iter() {
        for (field, refs) in [("after", &task.after), ("parallel_with", &task.parallel_with)] {
            for reference in refs {
                if reference == name {
                    return Err(GraphError::SelfReference {
                        task: name.clone(),
                        field,
                    });
                }
                if !cfg.task.contains_key(reference) {
                    return Err(GraphError::UnknownReference {
                        task: name.clone(),
                        reference: reference.clone(),
                        field,
                    });
                }
            }
        }

        for peer in &task.parallel_with {
            if task.after.contains(peer) {
                return Err(GraphError::ConflictingOrdering {
                    task: name.clone(),
                    other: peer.clone(),
                });
            }
        }
    }

    // Edge direction: dependency -> dependent, so a topological sort fails
    // exactly when the declared ordering contains a cycle.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(GraphError::CyclicDependency {
            task: cycle.node_id().to_string(),
        }),
    }
}

fn validate_actions(cfg: &ConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        let check_nonempty = |field: &str, list: &Vec<String>| -> Result<()> {
            if list.is_empty() {
                Err(anyhow!("task '{name}': `{field}` must not be empty"))
            } else {
                Ok(())
            }
        };

        match &task.action {
            ActionConfig::Clean => {}
            ActionConfig::Stylelint { source, .. } => {
                check_nonempty("source", source)?;
            }
            ActionConfig::Template { pages, dest, .. } => {
                check_nonempty("pages", pages)?;
                check_nonempty("dest", dest)?;
            }
            ActionConfig::Styles {
                entry,
                targets,
                dest,
                compat,
                ..
            } => {
                check_nonempty("entry", entry)?;
                check_nonempty("dest", dest)?;
                targets
                    .to_browsers()
                    .map_err(|e| anyhow!(e))
                    .with_context(|| format!("task '{name}': invalid [targets]"))?;
                validate_compat(name, compat)?;
            }
            ActionConfig::Scripts {
                source,
                dest,
                compat,
                ..
            } => {
                check_nonempty("source", source)?;
                check_nonempty("dest", dest)?;
                validate_compat(name, compat)?;
            }
            ActionConfig::Images { source, dest, quality, .. } => {
                check_nonempty("source", source)?;
                check_nonempty("dest", dest)?;
                if !(1..=100).contains(quality) {
                    return Err(anyhow!(
                        "task '{name}': `quality` must be 1-100 (got {quality})"
                    ));
                }
            }
            ActionConfig::Copy { source, dest, .. } => {
                check_nonempty("source", source)?;
                check_nonempty("dest", dest)?;
            }
        }
    }

    Ok(())
}

fn validate_compat(task: &str, compat: &str) -> Result<()> {
    crate::transform::minify::CompatMode::parse(compat)
        .map(|_| ())
        .ok_or_else(|| {
            anyhow!("task '{task}': invalid `compat` '{compat}' (expected \"*\", \"broad\" or \"modern\")")
        })
}
