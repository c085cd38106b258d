// src/transform/template.rs

//! Page template compilation.
//!
//! Resolves `{{> name}}` partial references against a partials directory,
//! `{{helper arg}}` against a registry of named helper functions, and
//! `{{file.key...}}` against JSON data records. Compiled pages are renamed
//! from `.hbs` to `.html`. Template syntax beyond reference resolution is
//! deliberately minimal.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::errors::{TemplateError, TransformCause, TransformError};
use crate::fileset::{FileEntry, FileSet};
use crate::transform::Transform;

const NAME: &str = "template";

/// Partial expansion depth cap; a partial including itself would otherwise
/// loop forever.
const MAX_DEPTH: usize = 16;

type HelperFn = fn(&str) -> String;

/// Compiles page templates against partials, helpers and data records.
pub struct TemplateCompile {
    partials_dir: PathBuf,
    data_dir: PathBuf,
    helpers: HashMap<&'static str, HelperFn>,
    tag: Regex,
}

impl TemplateCompile {
    pub fn new(partials_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        let mut helpers: HashMap<&'static str, HelperFn> = HashMap::new();
        helpers.insert("upper", |s| s.to_uppercase());
        helpers.insert("lower", |s| s.to_lowercase());
        helpers.insert("capitalize", |s| {
            let mut chars = s.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        });
        helpers.insert("trim", |s| s.trim().to_string());

        Self {
            partials_dir: partials_dir.into(),
            data_dir: data_dir.into(),
            helpers,
            tag: Regex::new(r"\{\{\s*(.+?)\s*\}\}").unwrap(),
        }
    }

    fn load_data(&self) -> Result<HashMap<String, Value>, TransformCause> {
        let mut data = HashMap::new();
        if !self.data_dir.is_dir() {
            return Ok(data);
        }
        let mut names: Vec<PathBuf> = fs::read_dir(&self.data_dir)
            .map_err(TransformCause::Io)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        names.sort();

        for path in names {
            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(s) => s.to_string(),
                None => continue,
            };
            let text = fs::read_to_string(&path).map_err(TransformCause::Io)?;
            let value: Value = serde_json::from_str(&text).map_err(|e| {
                TransformCause::Data(format!("invalid JSON in {}: {e}", path.display()))
            })?;
            data.insert(stem, value);
        }
        Ok(data)
    }

    fn render(
        &self,
        source: &str,
        data: &HashMap<String, Value>,
        partials: &mut HashMap<String, String>,
        depth: usize,
    ) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(source.len());
        let mut last = 0;

        for caps in self.tag.captures_iter(source) {
            let whole = caps.get(0).unwrap();
            let inner = caps.get(1).unwrap().as_str();
            out.push_str(&source[last..whole.start()]);
            last = whole.end();

            if inner.starts_with('!') {
                continue;
            }

            if let Some(name) = inner.strip_prefix('>') {
                let name = name.trim();
                if depth + 1 > MAX_DEPTH {
                    return Err(TemplateError::RecursionLimit {
                        name: name.to_string(),
                    });
                }
                let body = self.load_partial(name, partials)?;
                let rendered = self.render(&body, data, partials, depth + 1)?;
                out.push_str(&rendered);
                continue;
            }

            if let Some((helper, arg)) = inner.split_once(char::is_whitespace) {
                let helper_fn = self.helpers.get(helper.trim()).ok_or_else(|| {
                    TemplateError::UnresolvedHelper {
                        name: helper.trim().to_string(),
                    }
                })?;
                let arg = arg.trim();
                let resolved = if let Some(literal) = strip_quotes(arg) {
                    literal.to_string()
                } else {
                    lookup_data(data, arg)?
                };
                out.push_str(&helper_fn(&resolved));
                continue;
            }

            out.push_str(&lookup_data(data, inner)?);
        }

        out.push_str(&source[last..]);
        Ok(out)
    }

    fn load_partial(
        &self,
        name: &str,
        partials: &mut HashMap<String, String>,
    ) -> Result<String, TemplateError> {
        if let Some(body) = partials.get(name) {
            return Ok(body.clone());
        }
        let path = self.partials_dir.join(format!("{name}.hbs"));
        let body = fs::read_to_string(&path).map_err(|_| TemplateError::UnresolvedPartial {
            name: name.to_string(),
        })?;
        partials.insert(name.to_string(), body.clone());
        Ok(body)
    }
}

impl Transform for TemplateCompile {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply(&self, input: FileSet) -> Result<FileSet, TransformError> {
        let data = self
            .load_data()
            .map_err(|cause| TransformError::new(NAME, &self.data_dir, cause))?;

        let mut partials: HashMap<String, String> = HashMap::new();
        let mut out = Vec::with_capacity(input.len());

        for entry in input {
            let source = match entry.text() {
                Some(s) => s.to_string(),
                None => {
                    return Err(TransformError::new(
                        NAME,
                        entry.path,
                        TransformCause::Data("page template is not valid UTF-8".into()),
                    ));
                }
            };

            let rendered = self
                .render(&source, &data, &mut partials, 0)
                .map_err(|e| TransformError::new(NAME, &entry.path, e))?;

            let mut path = entry.path.clone();
            path.set_extension("html");
            debug!(page = %path.display(), "compiled page template");
            out.push(FileEntry::new(path, rendered.into_bytes()));
        }

        Ok(FileSet::new(out))
    }
}

/// Resolve a dotted reference like `site.title` against the data records:
/// the first segment selects the record (data file stem), the rest walk
/// object keys.
fn lookup_data(data: &HashMap<String, Value>, reference: &str) -> Result<String, TemplateError> {
    let unresolved = || TemplateError::UnresolvedData {
        reference: reference.to_string(),
    };

    let mut segments = reference.split('.');
    let record = segments.next().ok_or_else(unresolved)?;
    let mut value = data.get(record).ok_or_else(unresolved)?;

    for key in segments {
        value = value.get(key).ok_or_else(unresolved)?;
    }

    Ok(match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn strip_quotes(arg: &str) -> Option<&str> {
    arg.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| arg.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
}
