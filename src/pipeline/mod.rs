// src/pipeline/mod.rs

//! Pipeline execution.
//!
//! A pipeline resolves its source pattern into a file set, applies its
//! transforms in declared order, and only then writes the final file set to
//! every destination directory. Because writes happen strictly after the
//! last transform has succeeded, a failing transform aborts the invocation
//! with zero writes for that destination (all-or-nothing per run). A
//! pipeline with no transforms is a pure copy.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::errors::PipelineError;
use crate::fileset::{resolve, FileSet, SourceSpec};
use crate::serve::Notifier;
use crate::transform::Transform;

/// Outcome of a successful pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteResult {
    pub files: usize,
    pub destinations: usize,
}

/// An ordered transform chain from a source pattern to destination dirs.
pub struct Pipeline {
    name: String,
    source_root: PathBuf,
    source: SourceSpec,
    transforms: Vec<Box<dyn Transform>>,
    dests: Vec<PathBuf>,
    notifier: Notifier,
}

impl Pipeline {
    pub fn new(
        name: impl Into<String>,
        source_root: impl Into<PathBuf>,
        source: SourceSpec,
        transforms: Vec<Box<dyn Transform>>,
        dests: Vec<PathBuf>,
        notifier: Notifier,
    ) -> Self {
        Self {
            name: name.into(),
            source_root: source_root.into(),
            source,
            transforms,
            dests,
            notifier,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve, transform, write, notify.
    pub fn run(&self) -> Result<WriteResult, PipelineError> {
        let mut files =
            resolve(&self.source_root, &self.source).map_err(|source| PipelineError::Resolve {
                pipeline: self.name.clone(),
                source,
            })?;

        for transform in &self.transforms {
            debug!(
                pipeline = %self.name,
                transform = transform.name(),
                files = files.len(),
                "applying transform"
            );
            files = transform
                .apply(files)
                .map_err(|source| PipelineError::Transform {
                    pipeline: self.name.clone(),
                    source,
                })?;
        }

        let result = self.write(&files)?;

        info!(
            pipeline = %self.name,
            files = result.files,
            destinations = result.destinations,
            "pipeline wrote destination files"
        );

        // Fire-and-forget; the pipeline never waits on the dev server.
        self.notifier.notify(&self.name);

        Ok(result)
    }

    fn write(&self, files: &FileSet) -> Result<WriteResult, PipelineError> {
        let mut written = 0;

        for dest in &self.dests {
            for entry in files.iter() {
                let target = dest.join(&entry.path);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(|source| PipelineError::Write {
                        pipeline: self.name.clone(),
                        path: parent.to_path_buf(),
                        source,
                    })?;
                }
                fs::write(&target, &entry.contents).map_err(|source| PipelineError::Write {
                    pipeline: self.name.clone(),
                    path: target.clone(),
                    source,
                })?;
                written += 1;
            }
        }

        Ok(WriteResult {
            files: written,
            destinations: self.dests.len(),
        })
    }
}
