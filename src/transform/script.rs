// src/transform/script.rs

//! Script bundling.
//!
//! Applies a per-file downleveling pass, then concatenates the file set —
//! in entry order — into a single named bundle artifact. Bundle content is
//! always `downlevel(first)` followed by `downlevel(second)` and so on.

use regex::Regex;
use tracing::debug;

use crate::errors::{TransformCause, TransformError};
use crate::fileset::{FileEntry, FileSet};
use crate::transform::Transform;

const NAME: &str = "script";

/// Concatenates downleveled scripts into one bundle entry.
pub struct ScriptBundle {
    bundle_name: String,
    declaration_re: Regex,
}

impl ScriptBundle {
    pub fn new(bundle_name: impl Into<String>) -> Self {
        Self {
            bundle_name: bundle_name.into(),
            declaration_re: Regex::new(r"(?m)^(\s*)(?:const|let)\b").unwrap(),
        }
    }

    /// Minimal language downleveling: block-scoped declarations become
    /// `var`. Anything further (arrows, classes) is out of scope for this
    /// transform and passes through unchanged.
    fn downlevel(&self, source: &str) -> String {
        self.declaration_re
            .replace_all(source, "${1}var")
            .into_owned()
    }
}

impl Transform for ScriptBundle {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply(&self, input: FileSet) -> Result<FileSet, TransformError> {
        let mut bundle = String::new();

        for entry in input.iter() {
            let source = entry.text().ok_or_else(|| {
                TransformError::new(
                    NAME,
                    &entry.path,
                    TransformCause::Data("script is not valid UTF-8".into()),
                )
            })?;

            debug!(script = %entry.path.display(), "downleveling script");
            bundle.push_str(&self.downlevel(source));
            if !bundle.ends_with('\n') {
                bundle.push('\n');
            }
        }

        Ok(FileSet::new(vec![FileEntry::new(
            self.bundle_name.clone(),
            bundle.into_bytes(),
        )]))
    }
}
