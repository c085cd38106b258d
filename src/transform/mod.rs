// src/transform/mod.rs

//! Pipeline transforms.
//!
//! A transform is a named, referentially transparent stage mapping one
//! [`FileSet`](crate::fileset::FileSet) to another. All configuration is
//! captured immutably at construction; nothing reads shared mutable state.
//!
//! Built-in kinds:
//! - [`template::TemplateCompile`] — page templates against partials,
//!   helpers and data records
//! - [`style::StyleCompile`] — import expansion, unused-rule removal,
//!   browser-target compilation
//! - [`script::ScriptBundle`] — per-file downleveling plus ordered
//!   concatenation
//! - [`minify::MinifyVariant`] — size-reduced `.min` siblings for text
//!   artifacts
//! - [`image::ImageOptimize`] — quality-parameterized recompression

pub mod image;
pub mod minify;
pub mod script;
pub mod style;
pub mod template;

use crate::errors::TransformError;
use crate::fileset::FileSet;

/// A single pipeline stage.
///
/// Implementations must produce identical output for identical input and
/// construction-time configuration.
pub trait Transform: Send + Sync {
    /// Stable name used in error annotations and logs.
    fn name(&self) -> &'static str;

    fn apply(&self, input: FileSet) -> Result<FileSet, TransformError>;
}
