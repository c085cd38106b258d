// src/lint.rs

//! Style linting.
//!
//! A small rule set over stylesheet sources. Violations are written to a
//! plain-text report in the report directory and logged; the owning task is
//! configured non-fatal, so lint findings never block the rest of the
//! graph.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{info, warn};

use crate::errors::LintError;
use crate::fileset::{resolve, SourceSpec};

/// One lint finding.
#[derive(Debug, Clone)]
pub struct Violation {
    pub path: PathBuf,
    pub line: usize,
    pub rule: &'static str,
    pub message: String,
}

/// Style-lint pass over a stylesheet source pattern.
pub struct Linter {
    source_root: PathBuf,
    sources: SourceSpec,
    report_dir: PathBuf,
}

impl Linter {
    pub fn new(
        source_root: impl Into<PathBuf>,
        sources: SourceSpec,
        report_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            sources,
            report_dir: report_dir.into(),
        }
    }

    /// Lint all matching sources, write the report, and fail with
    /// [`LintError::Violations`] when findings exist.
    pub fn run(&self) -> Result<(), LintError> {
        let files = resolve(&self.source_root, &self.sources)?;

        let rules = LintRules::new();
        let mut violations = Vec::new();

        for entry in files.iter() {
            let Some(text) = entry.text() else {
                continue;
            };
            rules.check(&entry.path, text, &mut violations);
        }

        let report_path = self.write_report(&violations)?;

        for v in &violations {
            warn!(
                rule = v.rule,
                "lint: {}:{}: {}",
                v.path.display(),
                v.line,
                v.message
            );
        }

        if violations.is_empty() {
            info!(files = files.len(), "style lint clean");
            Ok(())
        } else {
            Err(LintError::Violations {
                count: violations.len(),
                report: report_path,
            })
        }
    }

    fn write_report(&self, violations: &[Violation]) -> Result<PathBuf, LintError> {
        let report_path = self.report_dir.join("stylelint.txt");
        let io_err = |source| LintError::Report {
            path: report_path.clone(),
            source,
        };

        fs::create_dir_all(&self.report_dir).map_err(io_err)?;

        let mut report = String::new();
        if violations.is_empty() {
            report.push_str("no violations\n");
        }
        for v in violations {
            report.push_str(&format!(
                "{}:{}: {} ({})\n",
                v.path.display(),
                v.line,
                v.message,
                v.rule
            ));
        }

        fs::write(&report_path, report).map_err(io_err)?;
        Ok(report_path)
    }
}

struct LintRules {
    hex_color: Regex,
    empty_rule: Regex,
}

impl LintRules {
    fn new() -> Self {
        Self {
            hex_color: Regex::new(r"#([0-9a-fA-F]+)\b").unwrap(),
            empty_rule: Regex::new(r"\{\s*\}").unwrap(),
        }
    }

    fn check(&self, path: &Path, text: &str, out: &mut Vec<Violation>) {
        for (i, line) in text.lines().enumerate() {
            let line_no = i + 1;

            for caps in self.hex_color.captures_iter(line) {
                let digits = &caps[1];
                if !matches!(digits.len(), 3 | 4 | 6 | 8) {
                    out.push(Violation {
                        path: path.to_path_buf(),
                        line: line_no,
                        rule: "color-no-invalid-hex",
                        message: format!("invalid hex color '#{digits}'"),
                    });
                }
            }

            if line.contains("!important") {
                out.push(Violation {
                    path: path.to_path_buf(),
                    line: line_no,
                    rule: "declaration-no-important",
                    message: "unexpected !important".to_string(),
                });
            }

            if line != line.trim_end() {
                out.push(Violation {
                    path: path.to_path_buf(),
                    line: line_no,
                    rule: "no-trailing-whitespace",
                    message: "trailing whitespace".to_string(),
                });
            }
        }

        for m in self.empty_rule.find_iter(text) {
            let line_no = text[..m.start()].lines().count().max(1);
            out.push(Violation {
                path: path.to_path_buf(),
                line: line_no,
                rule: "block-no-empty",
                message: "empty rule block".to_string(),
            });
        }
    }
}
