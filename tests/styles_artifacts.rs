// tests/styles_artifacts.rs

use std::error::Error;
use std::fs;

use lightningcss::targets::Browsers;
use sitegear::fileset::SourceSpec;
use sitegear::pipeline::Pipeline;
use sitegear::serve::Notifier;
use sitegear::transform::minify::{CompatMode, MinifyVariant};
use sitegear::transform::style::{SourceMapEmit, StyleCompile};
use sitegear::transform::Transform;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn styles_pipeline_emits_full_min_and_map_artifacts() -> TestResult {
    let dir = tempfile::tempdir()?;
    let src = dir.path().join("src");
    let dest = dir.path().join("docs");
    fs::create_dir_all(src.join("css"))?;
    fs::write(
        src.join("css/main.css"),
        "body {\n  margin: 0;\n  padding: 0;\n}\n",
    )?;

    let transforms: Vec<Box<dyn Transform>> = vec![
        Box::new(StyleCompile::new(
            src.join("css"),
            None,
            None,
            Browsers::default(),
        )),
        Box::new(SourceMapEmit),
        Box::new(MinifyVariant::new(CompatMode::Broad, Browsers::default())),
    ];

    let pipeline = Pipeline::new(
        "styles",
        &src,
        SourceSpec::single("css/main.css", true),
        transforms,
        vec![dest.join("css")],
        Notifier::disabled(),
    );

    let result = pipeline.run()?;
    assert_eq!(result.files, 3);

    let full = fs::read_to_string(dest.join("css/main.css"))?;
    let min = fs::read_to_string(dest.join("css/main.min.css"))?;
    let map = fs::read_to_string(dest.join("css/maps/main.css.map"))?;

    assert!(full.contains("margin"));
    assert!(full.contains("sourceMappingURL=maps/main.css.map"));
    assert!(min.len() < full.len());
    assert!(min.contains("margin"));

    let map: serde_json::Value = serde_json::from_str(&map)?;
    assert_eq!(map["version"], 3);
    assert_eq!(map["file"], "main.css");
    Ok(())
}

#[test]
fn minified_artifacts_are_not_minified_again() -> TestResult {
    use sitegear::fileset::{FileEntry, FileSet};

    let variant = MinifyVariant::new(CompatMode::Broad, Browsers::default());
    let input = FileSet::new(vec![FileEntry::new("bundle.min.js", "var a=1;\n")]);

    let out = variant.apply(input)?;
    assert_eq!(out.len(), 1, "a .min artifact must pass through untouched");
    Ok(())
}
