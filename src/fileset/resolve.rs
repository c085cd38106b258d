// src/fileset/resolve.rs

//! Glob resolution of source patterns into file sets.
//!
//! Patterns are evaluated beneath a fixed source root. Matches are sorted
//! per pattern so resolution order is deterministic, which downstream
//! concatenating transforms depend on. Nothing is excluded implicitly;
//! exclusions must be part of the pattern itself.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use glob::glob;
use tracing::{debug, warn};

use crate::errors::ResolveError;
use crate::fileset::{FileEntry, FileSet};

/// A declared pipeline source: one or more glob patterns plus the
/// required-non-empty flag.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub patterns: Vec<String>,
    /// When set, resolving to an empty file set is an error.
    pub required: bool,
}

impl SourceSpec {
    pub fn new(patterns: Vec<String>, required: bool) -> Self {
        Self { patterns, required }
    }

    pub fn single(pattern: impl Into<String>, required: bool) -> Self {
        Self {
            patterns: vec![pattern.into()],
            required,
        }
    }

    fn display(&self) -> String {
        self.patterns.join(", ")
    }
}

/// Expand `spec` beneath `root` into an ordered [`FileSet`].
///
/// Entry paths are relative to the pattern's static prefix (the leading
/// components before the first glob metacharacter), so `hbs/pages/**/*.hbs`
/// yields entries like `about/index.hbs`. Duplicate paths across patterns
/// keep their first occurrence.
pub fn resolve(root: &Path, spec: &SourceSpec) -> Result<FileSet, ResolveError> {
    let mut entries = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for pattern in &spec.patterns {
        let base = root.join(pattern_base(pattern));
        let full_pattern = root.join(pattern);
        let full_pattern = full_pattern.to_string_lossy();

        let paths = glob(&full_pattern).map_err(|source| ResolveError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;

        let mut matched: Vec<PathBuf> = Vec::new();
        for entry in paths {
            match entry {
                Ok(path) if path.is_file() => matched.push(path),
                Ok(_) => {}
                Err(e) => {
                    // Unreadable directory entries are skipped, not fatal.
                    warn!(pattern = %pattern, "error reading path during resolve: {e}");
                }
            }
        }
        matched.sort();

        for path in matched {
            if !seen.insert(path.clone()) {
                continue;
            }
            let rel = path
                .strip_prefix(&base)
                .unwrap_or(&path)
                .to_path_buf();
            let contents = fs::read(&path).map_err(|source| ResolveError::Io {
                path: path.clone(),
                source,
            })?;
            entries.push(FileEntry::new(rel, contents));
        }
    }

    if entries.is_empty() && spec.required {
        return Err(ResolveError::NoMatch {
            pattern: spec.display(),
        });
    }

    debug!(
        patterns = %spec.display(),
        files = entries.len(),
        "resolved source file set"
    );

    Ok(FileSet::new(entries))
}

/// Static prefix of a glob pattern: the leading path components that contain
/// no glob metacharacters.
pub fn pattern_base(pattern: &str) -> PathBuf {
    let components: Vec<&str> = pattern.split('/').collect();
    let mut base = PathBuf::new();
    for (i, component) in components.iter().enumerate() {
        if component.contains(['*', '?', '[']) {
            break;
        }
        // A trailing literal file name is not part of the base.
        if i == components.len() - 1 && component.contains('.') {
            break;
        }
        base.push(component);
    }
    base
}
