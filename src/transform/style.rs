// src/transform/style.rs

//! Stylesheet compilation.
//!
//! The stage order is load-bearing: `@import` expansion, then unused-rule
//! removal against the markup corpus, then browser-target compilation
//! (vendor prefixing / downleveling) via lightningcss. Purging runs before
//! prefixing so selectors that only exist because of a prefixing rule are
//! never discarded as unused.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use regex::Regex;
use tracing::debug;

use crate::errors::{TransformCause, TransformError};
use crate::fileset::{FileEntry, FileSet};
use crate::transform::Transform;

const NAME: &str = "style";

/// Import expansion depth cap.
const MAX_IMPORT_DEPTH: usize = 32;

/// Markup corpus the purge pass cross-references.
#[derive(Debug, Clone)]
pub struct PurgeCorpus {
    /// Directory the corpus patterns are evaluated beneath.
    pub root: PathBuf,
    pub patterns: Vec<String>,
}

/// Compiles stylesheet entry files: import expansion, purge, targets.
pub struct StyleCompile {
    /// On-disk directory holding the stylesheet sources; entry paths are
    /// relative to it.
    styles_dir: PathBuf,
    /// Root for tilde-prefixed imports (`~pkg/...`).
    packages_root: Option<PathBuf>,
    purge: Option<PurgeCorpus>,
    targets: Browsers,
    import_re: Regex,
}

impl StyleCompile {
    pub fn new(
        styles_dir: impl Into<PathBuf>,
        packages_root: Option<PathBuf>,
        purge: Option<PurgeCorpus>,
        targets: Browsers,
    ) -> Self {
        Self {
            styles_dir: styles_dir.into(),
            packages_root,
            purge,
            targets,
            import_re: Regex::new(r#"(?m)^[ \t]*@import\s+(?:"([^"]+)"|'([^']+)')\s*;[ \t]*$"#)
                .unwrap(),
        }
    }

    /// Inline whole-line `@import "..."` statements, recursively.
    ///
    /// Supports glob imports (`@import "components/*"`) and the tilde
    /// convention (`@import "~pkg/button"` resolves beneath the packages
    /// root). Imports carrying url() or media queries are left for the CSS
    /// compiler. Already-visited files are skipped.
    fn expand_imports(
        &self,
        text: &str,
        dir: &Path,
        visited: &mut HashSet<PathBuf>,
        depth: usize,
    ) -> Result<String, TransformCause> {
        if depth > MAX_IMPORT_DEPTH {
            return Err(TransformCause::Style(format!(
                "@import nesting exceeds {MAX_IMPORT_DEPTH} levels"
            )));
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for caps in self.import_re.captures_iter(text) {
            let whole = caps.get(0).unwrap();
            let target = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();

            out.push_str(&text[last..whole.start()]);
            last = whole.end();

            for file in self.resolve_import(target, dir)? {
                let canonical = file.canonicalize().unwrap_or_else(|_| file.clone());
                if !visited.insert(canonical) {
                    debug!(import = %file.display(), "skipping already-inlined import");
                    continue;
                }
                let body = fs::read_to_string(&file).map_err(|e| {
                    TransformCause::Style(format!("reading import {}: {e}", file.display()))
                })?;
                let sub_dir = file.parent().unwrap_or(dir).to_path_buf();
                let expanded = self.expand_imports(&body, &sub_dir, visited, depth + 1)?;
                out.push_str(&expanded);
                out.push('\n');
            }
        }

        out.push_str(&text[last..]);
        Ok(out)
    }

    /// Resolve one import target to the concrete file list it names.
    fn resolve_import(&self, target: &str, dir: &Path) -> Result<Vec<PathBuf>, TransformCause> {
        let with_ext = |p: &str| -> String {
            if Path::new(p).extension().is_some() {
                p.to_string()
            } else {
                format!("{p}.css")
            }
        };

        if let Some(rest) = target.strip_prefix('~') {
            let root = self.packages_root.as_ref().ok_or_else(|| {
                TransformCause::Style(format!(
                    "tilde import '~{rest}' requires [project].packages to be set"
                ))
            })?;
            let path = root.join(with_ext(rest));
            if !path.is_file() {
                return Err(TransformCause::Style(format!(
                    "cannot resolve tilde import '~{rest}' beneath {}",
                    root.display()
                )));
            }
            return Ok(vec![path]);
        }

        if target.contains('*') {
            let pattern = dir.join(with_ext(target));
            let pattern = pattern.to_string_lossy();
            let paths = glob::glob(&pattern)
                .map_err(|e| TransformCause::Style(format!("glob import '{target}': {e}")))?;
            let mut files: Vec<PathBuf> =
                paths.filter_map(|p| p.ok()).filter(|p| p.is_file()).collect();
            files.sort();
            return Ok(files);
        }

        let path = dir.join(with_ext(target));
        if !path.is_file() {
            return Err(TransformCause::Style(format!(
                "cannot resolve @import '{target}' from {}",
                dir.display()
            )));
        }
        Ok(vec![path])
    }

    fn corpus_tokens(&self) -> Result<Option<HashSet<String>>, TransformCause> {
        let Some(purge) = &self.purge else {
            return Ok(None);
        };

        let mut tokens = HashSet::new();
        let word = Regex::new(r"[A-Za-z][A-Za-z0-9_-]*").unwrap();

        for pattern in &purge.patterns {
            let full = purge.root.join(pattern);
            let full = full.to_string_lossy();
            let paths = glob::glob(&full)
                .map_err(|e| TransformCause::Style(format!("purge corpus '{pattern}': {e}")))?;
            for path in paths.filter_map(|p| p.ok()).filter(|p| p.is_file()) {
                let text = fs::read_to_string(&path).map_err(|e| {
                    TransformCause::Style(format!("reading corpus {}: {e}", path.display()))
                })?;
                for m in word.find_iter(&text) {
                    tokens.insert(m.as_str().to_string());
                }
            }
        }

        Ok(Some(tokens))
    }

    fn compile(&self, css: &str, filename: &str) -> Result<String, TransformCause> {
        let mut sheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| TransformCause::Style(format!("{filename}: {e}")))?;

        sheet
            .minify(MinifyOptions {
                targets: Targets::from(self.targets.clone()),
                ..Default::default()
            })
            .map_err(|e| TransformCause::Style(format!("{filename}: {e}")))?;

        let result = sheet
            .to_css(PrinterOptions {
                minify: false,
                targets: Targets::from(self.targets.clone()),
                ..Default::default()
            })
            .map_err(|e| TransformCause::Style(format!("{filename}: {e}")))?;

        Ok(result.code)
    }
}

impl Transform for StyleCompile {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply(&self, input: FileSet) -> Result<FileSet, TransformError> {
        let tokens = self
            .corpus_tokens()
            .map_err(|cause| TransformError::new(NAME, &self.styles_dir, cause))?;

        let mut out = Vec::with_capacity(input.len());

        for entry in input {
            let err = |cause| TransformError::new(NAME, &entry.path, cause);

            let source = entry.text().ok_or_else(|| {
                TransformError::new(
                    NAME,
                    &entry.path,
                    TransformCause::Style("stylesheet is not valid UTF-8".into()),
                )
            })?;

            let disk_path = self.styles_dir.join(&entry.path);
            let dir = disk_path
                .parent()
                .unwrap_or(&self.styles_dir)
                .to_path_buf();

            let mut visited = HashSet::new();
            visited.insert(disk_path.canonicalize().unwrap_or(disk_path.clone()));

            let expanded = self
                .expand_imports(source, &dir, &mut visited, 0)
                .map_err(err)?;

            let stripped = strip_comments(&expanded);
            let purged = match &tokens {
                Some(tokens) => purge_rules(&stripped, tokens),
                None => stripped,
            };

            let filename = entry.path.to_string_lossy().into_owned();
            let compiled = self.compile(&purged, &filename).map_err(err)?;

            debug!(stylesheet = %entry.path.display(), "compiled stylesheet");
            out.push(FileEntry::new(entry.path.clone(), compiled.into_bytes()));
        }

        Ok(FileSet::new(out))
    }
}

/// Emits a sibling sourcemap entry under `maps/` for every stylesheet and
/// appends the sourceMappingURL pointer to the artifact.
pub struct SourceMapEmit;

impl Transform for SourceMapEmit {
    fn name(&self) -> &'static str {
        "sourcemap"
    }

    fn apply(&self, input: FileSet) -> Result<FileSet, TransformError> {
        let mut out = Vec::with_capacity(input.len() * 2);

        for entry in input {
            if entry.extension().as_deref() != Some("css") {
                out.push(entry);
                continue;
            }

            let file_name = entry
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let map_rel = format!("maps/{file_name}.map");

            let map = serde_json::json!({
                "version": 3,
                "file": file_name,
                "sources": [entry.path.to_string_lossy()],
                "names": [],
                "mappings": "",
            });

            let mut annotated = entry.contents.clone();
            annotated
                .extend_from_slice(format!("\n/*# sourceMappingURL={map_rel} */\n").as_bytes());

            out.push(FileEntry::new(entry.path.clone(), annotated));
            out.push(FileEntry::new(PathBuf::from(map_rel), map.to_string().into_bytes()));
        }

        Ok(FileSet::new(out))
    }
}

/// Remove `/* ... */` comments, respecting string literals.
pub(crate) fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut chars = css.chars().peekable();
    let mut in_string: Option<char> = None;

    while let Some(c) = chars.next() {
        match in_string {
            Some(quote) => {
                out.push(c);
                if c == '\\' {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                } else if c == quote {
                    in_string = None;
                }
            }
            None => {
                if c == '/' && chars.peek() == Some(&'*') {
                    chars.next();
                    let mut prev = ' ';
                    for c in chars.by_ref() {
                        if prev == '*' && c == '/' {
                            break;
                        }
                        prev = c;
                    }
                } else {
                    if c == '"' || c == '\'' {
                        in_string = Some(c);
                    }
                    out.push(c);
                }
            }
        }
    }

    out
}

/// Drop style rules whose selectors reference nothing in the corpus.
///
/// Conditional group rules (`@media`, `@supports`) are purged recursively
/// and dropped when emptied; other at-rules (`@keyframes`, `@font-face`,
/// `@charset`, remaining `@import`s) are kept verbatim.
pub(crate) fn purge_rules(css: &str, tokens: &HashSet<String>) -> String {
    let matchers = SelectorMatchers::new();
    purge_block(css, tokens, &matchers)
}

struct SelectorMatchers {
    pseudo: Regex,
    attribute: Regex,
    name: Regex,
}

impl SelectorMatchers {
    fn new() -> Self {
        Self {
            pseudo: Regex::new(r"::?[A-Za-z-]+(\([^)]*\))?").unwrap(),
            attribute: Regex::new(r"\[[^\]]*\]").unwrap(),
            name: Regex::new(r"[.#]?[A-Za-z][A-Za-z0-9_-]*").unwrap(),
        }
    }
}

fn purge_block(css: &str, tokens: &HashSet<String>, matchers: &SelectorMatchers) -> String {
    let mut out = String::new();
    let mut rest = css;

    loop {
        let Some((idx, delim)) = next_delimiter(rest) else {
            let tail = rest.trim();
            if !tail.is_empty() {
                out.push_str(tail);
                out.push('\n');
            }
            break;
        };

        match delim {
            ';' => {
                let statement = rest[..=idx].trim();
                if !statement.is_empty() {
                    out.push_str(statement);
                    out.push('\n');
                }
                rest = &rest[idx + 1..];
            }
            _ => {
                let Some(close) = matching_brace(rest, idx) else {
                    // Unbalanced braces; keep the remainder untouched and let
                    // the CSS parser report it.
                    out.push_str(rest);
                    break;
                };
                let prelude = rest[..idx].trim();
                let body = &rest[idx + 1..close];
                rest = &rest[close + 1..];

                if let Some(at_rule) = prelude.strip_prefix('@') {
                    let keyword = at_rule.split_whitespace().next().unwrap_or_default();
                    if keyword == "media" || keyword == "supports" {
                        let purged = purge_block(body, tokens, matchers);
                        if !purged.trim().is_empty() {
                            out.push_str(&format!("{prelude} {{\n{purged}}}\n"));
                        }
                    } else {
                        out.push_str(&format!("{prelude} {{{body}}}\n"));
                    }
                    continue;
                }

                let kept: Vec<&str> = prelude
                    .split(',')
                    .map(str::trim)
                    .filter(|sel| selector_used(sel, tokens, matchers))
                    .collect();

                if !kept.is_empty() {
                    out.push_str(&format!("{} {{{body}}}\n", kept.join(", ")));
                }
            }
        }
    }

    out
}

fn next_delimiter(s: &str) -> Option<(usize, char)> {
    s.char_indices().find(|(_, c)| *c == '{' || *c == ';')
}

fn matching_brace(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// A selector survives the purge when every class/id/element token it names
/// appears in the corpus. Selectors with no name tokens at all (universal,
/// `:root`, bare pseudo-elements) always survive.
fn selector_used(selector: &str, tokens: &HashSet<String>, matchers: &SelectorMatchers) -> bool {
    let cleaned = matchers.pseudo.replace_all(selector, " ");
    let cleaned = matchers.attribute.replace_all(&cleaned, " ");

    for m in matchers.name.find_iter(&cleaned) {
        let raw = m.as_str();
        let bare = raw.trim_start_matches(['.', '#']);
        if raw.starts_with(['.', '#']) {
            if !tokens.contains(bare) {
                return false;
            }
        } else if !tokens.contains(bare) && !matches!(bare, "html" | "body") {
            return false;
        }
    }

    true
}
