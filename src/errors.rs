// src/errors.rs

//! Structured error taxonomy for the build pipeline.
//!
//! Transform and pipeline errors propagate up to the task graph, which marks
//! the owning task as failed; the graph itself never retries. `anyhow` is
//! used only at the application boundary (`lib.rs` / `main.rs`).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure while expanding a source pattern into a file set.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The pattern was declared required-non-empty but matched nothing.
    #[error("no files match required pattern '{pattern}'")]
    NoMatch { pattern: String },

    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Template reference resolution failures.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unresolved partial '{name}'")]
    UnresolvedPartial { name: String },

    #[error("unresolved helper '{name}'")]
    UnresolvedHelper { name: String },

    #[error("unresolved data reference '{reference}'")]
    UnresolvedData { reference: String },

    #[error("partial expansion exceeded depth limit at '{name}'")]
    RecursionLimit { name: String },
}

/// A named transform failed on a specific file.
#[derive(Debug, Error)]
#[error("transform '{transform}' failed on {}: {cause}", path.display())]
pub struct TransformError {
    pub transform: &'static str,
    pub path: PathBuf,
    #[source]
    pub cause: TransformCause,
}

impl TransformError {
    pub fn new(
        transform: &'static str,
        path: impl Into<PathBuf>,
        cause: impl Into<TransformCause>,
    ) -> Self {
        Self {
            transform,
            path: path.into(),
            cause: cause.into(),
        }
    }
}

/// Underlying cause of a [`TransformError`].
#[derive(Debug, Error)]
pub enum TransformCause {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("{0}")]
    Style(String),

    #[error("{0}")]
    Image(String),

    #[error("{0}")]
    Data(String),
}

/// A pipeline invocation failed; no destination writes were performed for it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline '{pipeline}': {source}")]
    Resolve {
        pipeline: String,
        #[source]
        source: ResolveError,
    },

    #[error("pipeline '{pipeline}': {source}")]
    Transform {
        pipeline: String,
        #[source]
        source: TransformError,
    },

    #[error("pipeline '{pipeline}': writing {}: {source}", path.display())]
    Write {
        pipeline: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    /// Name of the pipeline that failed.
    pub fn pipeline(&self) -> &str {
        match self {
            PipelineError::Resolve { pipeline, .. }
            | PipelineError::Transform { pipeline, .. }
            | PipelineError::Write { pipeline, .. } => pipeline,
        }
    }
}

/// Style-lint pass failures.
#[derive(Debug, Error)]
pub enum LintError {
    #[error("{count} lint violation(s), report at {}", report.display())]
    Violations { count: usize, report: PathBuf },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("writing lint report to {}: {source}", path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Construction-time task graph errors.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("cycle detected in task ordering involving '{task}'")]
    CyclicDependency { task: String },

    #[error("task '{task}' references unknown task '{reference}' in `{field}`")]
    UnknownReference {
        task: String,
        reference: String,
        field: &'static str,
    },

    #[error("task '{task}' references itself in `{field}`")]
    SelfReference { task: String, field: &'static str },

    #[error("task '{task}' lists '{other}' in both `after` and `parallel_with`")]
    ConflictingOrdering { task: String, other: String },

    #[error("configuration must declare at least one [task.<name>]")]
    NoTasks,
}

/// The first fatal task failure observed while executing the graph.
#[derive(Debug, Error)]
#[error("task '{task}' failed during graph execution")]
pub struct GraphExecutionError {
    pub task: String,
}

/// Failure of a single runnable task action.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Lint(#[from] LintError),

    #[error("cleaning {}: {source}", path.display())]
    Clean {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
