// src/tasks.rs

//! Task assembly: turning validated configuration into runnable actions.
//!
//! Pipelines and their transform chains are constructed once at startup;
//! every run re-resolves sources and recreates file sets from scratch, but
//! the actions themselves are immutable for the process lifetime.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::info;

use crate::config::model::{ActionConfig, ConfigFile};
use crate::errors::TaskError;
use crate::fileset::resolve::pattern_base;
use crate::fileset::SourceSpec;
use crate::lint::Linter;
use crate::pipeline::Pipeline;
use crate::serve::Notifier;
use crate::transform::image::{ImageOptimize, ImageOptions};
use crate::transform::minify::{CompatMode, MinifyVariant};
use crate::transform::script::ScriptBundle;
use crate::transform::style::{PurgeCorpus, SourceMapEmit, StyleCompile};
use crate::transform::template::TemplateCompile;
use crate::transform::Transform;

/// A runnable task action.
pub enum TaskAction {
    Clean { dest_root: PathBuf },
    Stylelint(Linter),
    Pipeline(Pipeline),
}

impl TaskAction {
    pub fn run(&self) -> Result<(), TaskError> {
        match self {
            TaskAction::Clean { dest_root } => clean(dest_root),
            TaskAction::Stylelint(linter) => linter.run().map_err(TaskError::from),
            TaskAction::Pipeline(pipeline) => {
                pipeline.run()?;
                Ok(())
            }
        }
    }
}

/// All assembled actions, keyed by task name.
pub type ActionMap = HashMap<String, Arc<TaskAction>>;

/// Build every task's action from the configuration.
///
/// `root_dir` is the directory the config file lives in; source and
/// destination roots are resolved against it.
pub fn build_actions(cfg: &ConfigFile, root_dir: &Path, notifier: Notifier) -> Result<ActionMap> {
    let source_root = root_dir.join(&cfg.project.source);
    let dest_root = root_dir.join(&cfg.project.dest);
    let packages_root = cfg.project.packages.as_ref().map(|p| root_dir.join(p));

    let mut actions = ActionMap::new();

    for (name, task) in cfg.task.iter() {
        let action = match &task.action {
            ActionConfig::Clean => TaskAction::Clean {
                dest_root: dest_root.clone(),
            },

            ActionConfig::Stylelint { source, report_dir } => TaskAction::Stylelint(Linter::new(
                &source_root,
                SourceSpec::new(source.clone(), false),
                root_dir.join(report_dir),
            )),

            ActionConfig::Template {
                pages,
                partials,
                data,
                dest,
                required,
            } => {
                let transform = TemplateCompile::new(
                    source_root.join(partials),
                    source_root.join(data),
                );
                let transforms: Vec<Box<dyn Transform>> = vec![Box::new(transform)];
                pipeline_action(
                    name,
                    &source_root,
                    &dest_root,
                    SourceSpec::new(pages.clone(), *required),
                    transforms,
                    dest,
                    &notifier,
                )
            }

            ActionConfig::Styles {
                entry,
                purge_content,
                targets,
                dest,
                compat,
                required,
            } => {
                let browsers = targets
                    .to_browsers()
                    .map_err(|e| anyhow!(e))
                    .with_context(|| format!("task '{name}'"))?;

                let styles_dir = entry
                    .first()
                    .map(|p| source_root.join(pattern_base(p)))
                    .unwrap_or_else(|| source_root.clone());

                let purge = if purge_content.is_empty() {
                    None
                } else {
                    Some(PurgeCorpus {
                        root: source_root.clone(),
                        patterns: purge_content.clone(),
                    })
                };

                let compat_mode = parse_compat(name, compat)?;
                let style = StyleCompile::new(
                    styles_dir,
                    packages_root.clone(),
                    purge,
                    browsers.clone(),
                );

                let transforms: Vec<Box<dyn Transform>> = vec![
                    Box::new(style),
                    Box::new(SourceMapEmit),
                    Box::new(MinifyVariant::new(compat_mode, browsers)),
                ];
                pipeline_action(
                    name,
                    &source_root,
                    &dest_root,
                    SourceSpec::new(entry.clone(), *required),
                    transforms,
                    dest,
                    &notifier,
                )
            }

            ActionConfig::Scripts {
                source,
                bundle,
                dest,
                compat,
                required,
            } => {
                let compat_mode = parse_compat(name, compat)?;
                let transforms: Vec<Box<dyn Transform>> = vec![
                    Box::new(ScriptBundle::new(bundle.clone())),
                    Box::new(MinifyVariant::new(compat_mode, Default::default())),
                ];
                pipeline_action(
                    name,
                    &source_root,
                    &dest_root,
                    SourceSpec::new(source.clone(), *required),
                    transforms,
                    dest,
                    &notifier,
                )
            }

            ActionConfig::Images {
                source,
                dest,
                quality,
                interlace,
            } => {
                let transforms: Vec<Box<dyn Transform>> =
                    vec![Box::new(ImageOptimize::new(ImageOptions {
                        quality: *quality,
                        interlace: *interlace,
                    }))];
                pipeline_action(
                    name,
                    &source_root,
                    &dest_root,
                    SourceSpec::new(source.clone(), false),
                    transforms,
                    dest,
                    &notifier,
                )
            }

            ActionConfig::Copy {
                source,
                dest,
                required,
            } => pipeline_action(
                name,
                &source_root,
                &dest_root,
                SourceSpec::new(source.clone(), *required),
                Vec::new(),
                dest,
                &notifier,
            ),
        };

        actions.insert(name.clone(), Arc::new(action));
    }

    Ok(actions)
}

fn pipeline_action(
    name: &str,
    source_root: &Path,
    dest_root: &Path,
    source: SourceSpec,
    transforms: Vec<Box<dyn Transform>>,
    dests: &[String],
    notifier: &Notifier,
) -> TaskAction {
    let dests = dests.iter().map(|d| dest_root.join(d)).collect();
    TaskAction::Pipeline(Pipeline::new(
        name,
        source_root,
        source,
        transforms,
        dests,
        notifier.clone(),
    ))
}

fn parse_compat(task: &str, compat: &str) -> Result<CompatMode> {
    CompatMode::parse(compat)
        .ok_or_else(|| anyhow!("task '{task}': invalid `compat` '{compat}'"))
}

fn clean(dest_root: &Path) -> Result<(), TaskError> {
    match fs::remove_dir_all(dest_root) {
        Ok(()) => {
            info!(dest = %dest_root.display(), "removed destination root");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(TaskError::Clean {
            path: dest_root.to_path_buf(),
            source,
        }),
    }
}
