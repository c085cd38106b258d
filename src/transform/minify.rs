// src/transform/minify.rs

//! Size-reduction transform for text artifacts.
//!
//! [`MinifyVariant`] keeps each input entry and adds a `.min` sibling:
//! scripts go through the whitespace/comment minifier, stylesheets through
//! the CSS printer in minify mode. Minification is idempotent — running it
//! over already-minified output yields the same bytes.

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::errors::{TransformCause, TransformError};
use crate::fileset::{FileEntry, FileSet};
use crate::transform::Transform;

const NAME: &str = "minify";

/// Compatibility mode for minified output.
///
/// `Broad` keeps browser-target downleveling applied to minified CSS;
/// `Modern` prints for current engines only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompatMode {
    #[default]
    Broad,
    Modern,
}

impl CompatMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "*" | "broad" => Some(CompatMode::Broad),
            "modern" => Some(CompatMode::Modern),
            _ => None,
        }
    }
}

/// Adds a minified `.min` sibling for every script and stylesheet entry.
pub struct MinifyVariant {
    compat: CompatMode,
    targets: Browsers,
}

impl MinifyVariant {
    pub fn new(compat: CompatMode, targets: Browsers) -> Self {
        Self { compat, targets }
    }

    fn effective_targets(&self) -> Targets {
        match self.compat {
            CompatMode::Broad => Targets::from(self.targets.clone()),
            CompatMode::Modern => Targets::default(),
        }
    }

    fn minify_css(&self, css: &str, filename: &str) -> Result<String, TransformCause> {
        let mut sheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| TransformCause::Style(format!("{filename}: {e}")))?;
        sheet
            .minify(MinifyOptions {
                targets: self.effective_targets(),
                ..Default::default()
            })
            .map_err(|e| TransformCause::Style(format!("{filename}: {e}")))?;
        let result = sheet
            .to_css(PrinterOptions {
                minify: true,
                targets: self.effective_targets(),
                ..Default::default()
            })
            .map_err(|e| TransformCause::Style(format!("{filename}: {e}")))?;
        Ok(result.code)
    }
}

impl Transform for MinifyVariant {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply(&self, input: FileSet) -> Result<FileSet, TransformError> {
        let mut out = Vec::with_capacity(input.len() * 2);

        for entry in input {
            let ext = entry.extension();
            let stem = entry
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let already_minified = stem.ends_with(".min");

            match ext.as_deref() {
                Some(ext_str @ ("js" | "css")) if !already_minified => {
                    let text = entry.text().ok_or_else(|| {
                        TransformError::new(
                            NAME,
                            &entry.path,
                            TransformCause::Data("artifact is not valid UTF-8".into()),
                        )
                    })?;

                    let minified = if ext_str == "js" {
                        minify_script(text)
                    } else {
                        let filename = entry.path.to_string_lossy().into_owned();
                        self.minify_css(text, &filename)
                            .map_err(|cause| TransformError::new(NAME, &entry.path, cause))?
                    };

                    let min_path = entry.path.with_file_name(format!("{stem}.min.{ext_str}"));

                    out.push(FileEntry::new(min_path, minified.into_bytes()));
                    out.push(entry);
                }
                _ => out.push(entry),
            }
        }

        Ok(FileSet::new(out))
    }
}

/// Conservative script minifier: strips comments, trailing whitespace and
/// blank lines. Statement text is never rewritten, so output is stable
/// under repeated application.
pub fn minify_script(source: &str) -> String {
    let stripped = strip_script_comments(source);

    let mut out = String::with_capacity(stripped.len());
    for line in stripped.lines() {
        let trimmed = line.trim_end();
        if trimmed.trim_start().is_empty() {
            continue;
        }
        out.push_str(trimmed);
        out.push('\n');
    }
    out
}

/// Remove `//` and `/* */` comments, respecting string and template
/// literals.
fn strip_script_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_string: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(quote) = in_string {
            out.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else if c == quote {
                in_string = None;
            }
            continue;
        }

        match c {
            '"' | '\'' | '`' => {
                in_string = Some(c);
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }

    out
}
