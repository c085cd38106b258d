// tests/config_loading.rs

use std::error::Error;
use std::fs;

use sitegear::config::model::ActionConfig;
use sitegear::config::{load_and_validate, load_from_path};

type TestResult = Result<(), Box<dyn Error>>;

const FULL_CONFIG: &str = r#"
[project]
source = "src"
dest = "docs"
packages = "vendor"

[server]
port = 3000

[default]
exclude = ["**/*.tmp"]

[task.clean]
action = "clean"

[task.lint]
action = "stylelint"
after = ["clean"]
source = ["css/**/*.css"]

[task.markup]
action = "template"
after = ["lint"]
watch = ["hbs/**/*.hbs"]
pages = ["hbs/pages/**/*.hbs"]
partials = "hbs/partials"
data = "hbs/data"
required = true

[task.styles]
action = "styles"
after = ["markup"]
watch = ["css/**/*.css"]
entry = ["css/main.css"]
purge_content = ["hbs/**/*.hbs"]
dest = ["css"]
required = true

[task.styles.targets]
chrome = "109"
safari = "15.6"

[task.scripts]
action = "scripts"
after = ["clean"]
watch = ["js/**/*.js"]
source = ["js/**/*.js"]
dest = ["js"]

[task.images]
action = "images"
after = ["clean"]
source = ["images/**/*.png", "images/**/*.jpg"]
dest = ["images"]
quality = 85

[task.files]
action = "copy"
after = ["clean"]
source = ["*.html", "*.txt"]
"#;

#[test]
fn full_config_parses_and_validates() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Sitegear.toml");
    fs::write(&path, FULL_CONFIG)?;

    let cfg = load_and_validate(&path)?;

    assert_eq!(cfg.project.source, "src");
    assert_eq!(cfg.project.dest, "docs");
    assert_eq!(cfg.project.packages.as_deref(), Some("vendor"));
    assert_eq!(cfg.server.port, 3000);
    assert_eq!(cfg.task.len(), 7);

    let lint = &cfg.task["lint"];
    assert!(matches!(lint.action, ActionConfig::Stylelint { .. }));
    assert!(lint.effective_soft_fail());

    let styles = &cfg.task["styles"];
    assert!(!styles.effective_soft_fail());
    let ActionConfig::Styles { ref targets, ref dest, .. } = styles.action else {
        panic!("styles task has wrong action");
    };
    assert_eq!(targets.chrome.as_deref(), Some("109"));
    assert_eq!(dest, &vec!["css".to_string()]);

    let ActionConfig::Images { quality, interlace, .. } = cfg.task["images"].action else {
        panic!("images task has wrong action");
    };
    assert_eq!(quality, 85);
    assert!(interlace);

    // Copy defaults to the destination root.
    let ActionConfig::Copy { ref dest, .. } = cfg.task["files"].action else {
        panic!("files task has wrong action");
    };
    assert_eq!(dest, &vec![String::new()]);
    Ok(())
}

#[test]
fn cyclic_config_fails_validation() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Sitegear.toml");
    fs::write(
        &path,
        r#"
[task.a]
action = "clean"
after = ["b"]

[task.b]
action = "clean"
after = ["a"]
"#,
    )?;

    assert!(load_and_validate(&path).is_err());
    // Deserialization alone still succeeds.
    assert!(load_from_path(&path).is_ok());
    Ok(())
}

#[test]
fn unknown_action_is_rejected_at_parse_time() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Sitegear.toml");
    fs::write(
        &path,
        r#"
[task.a]
action = "frobnicate"
"#,
    )?;

    assert!(load_from_path(&path).is_err());
    Ok(())
}
