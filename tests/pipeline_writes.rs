// tests/pipeline_writes.rs

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use sitegear::errors::{PipelineError, ResolveError, TransformCause, TransformError};
use sitegear::fileset::{resolve, FileSet, SourceSpec};
use sitegear::pipeline::Pipeline;
use sitegear::serve::Notifier;
use sitegear::transform::Transform;

type TestResult = Result<(), Box<dyn Error>>;

/// Transform that fails as soon as it sees the given path.
struct FailOn {
    path: PathBuf,
}

impl Transform for FailOn {
    fn name(&self) -> &'static str {
        "fail-on"
    }

    fn apply(&self, input: FileSet) -> Result<FileSet, TransformError> {
        for entry in input.iter() {
            if entry.path == self.path {
                return Err(TransformError::new(
                    "fail-on",
                    &entry.path,
                    TransformCause::Data("injected failure".to_string()),
                ));
            }
        }
        Ok(input)
    }
}

fn write_sources(root: &std::path::Path, files: &[(&str, &str)]) -> TestResult {
    for (rel, contents) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap())?;
        fs::write(path, contents)?;
    }
    Ok(())
}

#[test]
fn empty_transform_chain_is_a_pure_copy() -> TestResult {
    let dir = tempfile::tempdir()?;
    let src = dir.path().join("src");
    let dest = dir.path().join("dist");
    write_sources(
        &src,
        &[
            ("files/robots.txt", "User-agent: *\n"),
            ("files/nested/note.txt", "hello\n"),
        ],
    )?;

    let pipeline = Pipeline::new(
        "copy",
        &src,
        SourceSpec::single("files/**/*.txt", true),
        Vec::new(),
        vec![dest.clone()],
        Notifier::disabled(),
    );

    let result = pipeline.run()?;
    assert_eq!(result.files, 2);

    assert_eq!(fs::read(dest.join("robots.txt"))?, b"User-agent: *\n");
    assert_eq!(fs::read(dest.join("nested/note.txt"))?, b"hello\n");
    Ok(())
}

#[test]
fn transform_failure_writes_nothing() -> TestResult {
    let dir = tempfile::tempdir()?;
    let src = dir.path().join("src");
    let dest = dir.path().join("dist");
    write_sources(
        &src,
        &[
            ("js/a.js", "var a;\n"),
            ("js/b.js", "var b;\n"),
            ("js/c.js", "var c;\n"),
            ("js/d.js", "var d;\n"),
            ("js/e.js", "var e;\n"),
        ],
    )?;

    let transforms: Vec<Box<dyn Transform>> = vec![Box::new(FailOn {
        path: PathBuf::from("c.js"),
    })];
    let pipeline = Pipeline::new(
        "scripts",
        &src,
        SourceSpec::single("js/**/*.js", true),
        transforms,
        vec![dest.clone()],
        Notifier::disabled(),
    );

    let err = pipeline.run().unwrap_err();
    assert!(matches!(err, PipelineError::Transform { .. }));
    assert_eq!(err.pipeline(), "scripts");

    // All-or-nothing: the failing run left no partial output behind.
    assert!(!dest.exists());
    Ok(())
}

#[test]
fn required_pattern_with_no_matches_fails() -> TestResult {
    let dir = tempfile::tempdir()?;
    let src = dir.path().join("src");
    fs::create_dir_all(&src)?;

    let err = resolve(&src, &SourceSpec::single("images/**/*.png", true)).unwrap_err();
    assert!(matches!(err, ResolveError::NoMatch { .. }));
    Ok(())
}

#[test]
fn optional_pattern_with_no_matches_is_empty() -> TestResult {
    let dir = tempfile::tempdir()?;
    let src = dir.path().join("src");
    fs::create_dir_all(&src)?;

    let files = resolve(&src, &SourceSpec::single("images/**/*.png", false))?;
    assert!(files.is_empty());
    Ok(())
}

#[test]
fn resolution_order_is_sorted_and_deterministic() -> TestResult {
    let dir = tempfile::tempdir()?;
    let src = dir.path().join("src");
    write_sources(
        &src,
        &[
            ("js/zeta.js", "z\n"),
            ("js/alpha.js", "a\n"),
            ("js/mid.js", "m\n"),
        ],
    )?;

    let files = resolve(&src, &SourceSpec::single("js/**/*.js", true))?;
    let order: Vec<String> = files
        .iter()
        .map(|e| e.path.to_string_lossy().into_owned())
        .collect();
    assert_eq!(order, vec!["alpha.js", "mid.js", "zeta.js"]);
    Ok(())
}

#[test]
fn multiple_destinations_receive_identical_output() -> TestResult {
    let dir = tempfile::tempdir()?;
    let src = dir.path().join("src");
    let dest_a = dir.path().join("a");
    let dest_b = dir.path().join("b");
    write_sources(&src, &[("index.html", "<html></html>\n")])?;

    let pipeline = Pipeline::new(
        "copy",
        &src,
        SourceSpec::single("*.html", true),
        Vec::new(),
        vec![dest_a.clone(), dest_b.clone()],
        Notifier::disabled(),
    );

    pipeline.run()?;
    assert_eq!(fs::read(dest_a.join("index.html"))?, fs::read(dest_b.join("index.html"))?);
    Ok(())
}
