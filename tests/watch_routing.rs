// tests/watch_routing.rs

mod common;

use std::collections::BTreeMap;
use std::error::Error;

use sitegear::watch::build_watch_profiles;

use common::{clean_task, config_with_tasks};

type TestResult = Result<(), Box<dyn Error>>;

fn watched(task: sitegear::config::TaskConfig, patterns: &[&str]) -> sitegear::config::TaskConfig {
    let mut task = task;
    task.watch = Some(patterns.iter().map(|s| s.to_string()).collect());
    task
}

#[test]
fn stylesheet_change_routes_only_to_the_style_task() -> TestResult {
    let mut tasks = BTreeMap::new();
    tasks.insert("clean".to_string(), clean_task(&[]));
    tasks.insert(
        "styles".to_string(),
        watched(clean_task(&["clean"]), &["css/**/*.css"]),
    );
    tasks.insert(
        "scripts".to_string(),
        watched(clean_task(&["clean"]), &["js/**/*.js"]),
    );
    tasks.insert(
        "images".to_string(),
        watched(clean_task(&["clean"]), &["images/**/*.png", "images/**/*.jpg"]),
    );

    let cfg = config_with_tasks(tasks);
    let profiles = build_watch_profiles(&cfg)?;

    // Tasks without watch patterns (clean) get no profile at all.
    assert_eq!(profiles.len(), 3);

    let matches_for = |path: &str| -> Vec<&str> {
        profiles
            .iter()
            .filter(|p| p.matches(path))
            .map(|p| p.name())
            .collect()
    };

    assert_eq!(matches_for("css/main.css"), vec!["styles"]);
    assert_eq!(matches_for("js/app.js"), vec!["scripts"]);
    assert_eq!(matches_for("images/logo.png"), vec!["images"]);
    assert!(matches_for("hbs/pages/index.hbs").is_empty());
    Ok(())
}

#[test]
fn default_watch_and_exclude_apply_to_tasks_without_overrides() -> TestResult {
    let mut tasks = BTreeMap::new();
    tasks.insert("build".to_string(), clean_task(&[]));

    let mut cfg = config_with_tasks(tasks);
    cfg.default.watch = vec!["src/**/*".to_string()];
    cfg.default.exclude = vec!["src/**/*.tmp".to_string()];

    let profiles = build_watch_profiles(&cfg)?;
    assert_eq!(profiles.len(), 1);
    assert!(profiles[0].matches("src/page.html"));
    assert!(!profiles[0].matches("src/page.tmp"));
    Ok(())
}

#[test]
fn appended_defaults_extend_task_patterns() -> TestResult {
    let mut tasks = BTreeMap::new();
    let mut task = watched(clean_task(&[]), &["css/**/*.css"]);
    task.append_default_watch = true;
    tasks.insert("styles".to_string(), task);

    let mut cfg = config_with_tasks(tasks);
    cfg.default.watch = vec!["shared/**/*.css".to_string()];

    let profiles = build_watch_profiles(&cfg)?;
    assert!(profiles[0].matches("css/main.css"));
    assert!(profiles[0].matches("shared/vars.css"));
    Ok(())
}
