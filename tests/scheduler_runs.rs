// tests/scheduler_runs.rs

mod common;

use std::collections::BTreeMap;
use std::error::Error;

use sitegear::config::model::ActionConfig;
use sitegear::dag::{Scheduler, TaskState};
use sitegear::engine::TaskOutcome;

use common::{clean_task, config_with_tasks, task};

type TestResult = Result<(), Box<dyn Error>>;

fn failed() -> TaskOutcome {
    TaskOutcome::Failed {
        message: "boom".to_string(),
    }
}

fn trigger_all(scheduler: &mut Scheduler, names: &[&str]) -> Vec<String> {
    let mut ready = Vec::new();
    for name in names {
        ready.extend(scheduler.handle_trigger(name).into_iter().map(|t| t.name));
    }
    ready
}

#[test]
fn chain_runs_in_declared_order() -> TestResult {
    let mut tasks = BTreeMap::new();
    tasks.insert("a".to_string(), clean_task(&[]));
    tasks.insert("b".to_string(), clean_task(&["a"]));
    tasks.insert("c".to_string(), clean_task(&["b"]));
    let mut scheduler = Scheduler::from_config(&config_with_tasks(tasks));

    scheduler.start_new_run();
    let ready = trigger_all(&mut scheduler, &["a", "b", "c"]);
    assert_eq!(ready, vec!["a".to_string()]);

    let ready = scheduler.handle_completion("a", TaskOutcome::Success);
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].name, "b");

    let ready = scheduler.handle_completion("b", TaskOutcome::Success);
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].name, "c");

    scheduler.handle_completion("c", TaskOutcome::Success);
    assert!(scheduler.is_idle());
    assert!(scheduler.take_first_failure().is_none());
    Ok(())
}

#[test]
fn independent_tasks_are_dispatched_together() -> TestResult {
    let mut tasks = BTreeMap::new();
    tasks.insert("clean".to_string(), clean_task(&[]));
    tasks.insert("images".to_string(), clean_task(&["clean"]));
    tasks.insert("scripts".to_string(), clean_task(&["clean"]));
    let mut scheduler = Scheduler::from_config(&config_with_tasks(tasks));

    scheduler.start_new_run();
    let ready = trigger_all(&mut scheduler, &["clean", "images", "scripts"]);
    assert_eq!(ready, vec!["clean".to_string()]);

    // Both dependents become ready at once when the shared dep finishes.
    let ready = scheduler.handle_completion("clean", TaskOutcome::Success);
    let mut names: Vec<String> = ready.into_iter().map(|t| t.name).collect();
    names.sort();
    assert_eq!(names, vec!["images".to_string(), "scripts".to_string()]);
    Ok(())
}

#[test]
fn hard_failure_skips_dependents_and_is_recorded() -> TestResult {
    let mut tasks = BTreeMap::new();
    tasks.insert("a".to_string(), clean_task(&[]));
    tasks.insert("b".to_string(), clean_task(&["a"]));
    tasks.insert("c".to_string(), clean_task(&["b"]));
    let mut scheduler = Scheduler::from_config(&config_with_tasks(tasks));

    scheduler.start_new_run();
    trigger_all(&mut scheduler, &["a", "b", "c"]);

    let ready = scheduler.handle_completion("a", failed());
    assert!(ready.is_empty());

    assert_eq!(scheduler.state_of("b"), Some(TaskState::Skipped));
    assert_eq!(scheduler.state_of("c"), Some(TaskState::Skipped));
    assert!(scheduler.is_idle());
    assert_eq!(scheduler.take_first_failure().as_deref(), Some("a"));
    Ok(())
}

#[test]
fn lint_failure_does_not_block_the_graph() -> TestResult {
    // Entry graph shape from the default build: clean, lint (non-fatal),
    // then content pipelines. A lint failure must still let the run reach
    // the downstream tasks.
    let mut tasks = BTreeMap::new();
    tasks.insert("clean".to_string(), clean_task(&[]));
    tasks.insert(
        "lint".to_string(),
        task(
            ActionConfig::Stylelint {
                source: vec!["css/**/*.css".to_string()],
                report_dir: "reports/lint".to_string(),
            },
            &["clean"],
        ),
    );
    tasks.insert("markup".to_string(), clean_task(&["lint"]));
    tasks.insert("styles".to_string(), clean_task(&["markup"]));
    let mut scheduler = Scheduler::from_config(&config_with_tasks(tasks));

    scheduler.start_new_run();
    trigger_all(&mut scheduler, &["clean", "lint", "markup", "styles"]);

    let ready = scheduler.handle_completion("clean", TaskOutcome::Success);
    assert_eq!(ready[0].name, "lint");

    // Stylelint defaults to soft_fail; its failure schedules dependents.
    let ready = scheduler.handle_completion("lint", failed());
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].name, "markup");

    let ready = scheduler.handle_completion("markup", TaskOutcome::Success);
    assert_eq!(ready[0].name, "styles");

    scheduler.handle_completion("styles", TaskOutcome::Success);
    assert!(scheduler.is_idle());

    // The soft failure is not the run's fatal failure.
    assert!(scheduler.take_first_failure().is_none());
    Ok(())
}

#[test]
fn watch_trigger_reruns_only_the_bound_task() -> TestResult {
    let mut tasks = BTreeMap::new();
    tasks.insert("clean".to_string(), clean_task(&[]));
    tasks.insert("scripts".to_string(), clean_task(&["clean"]));
    tasks.insert("styles".to_string(), clean_task(&["clean"]));
    let mut scheduler = Scheduler::from_config(&config_with_tasks(tasks));

    // Initial full run.
    scheduler.start_new_run();
    trigger_all(&mut scheduler, &["clean", "scripts", "styles"]);
    scheduler.handle_completion("clean", TaskOutcome::Success);
    scheduler.handle_completion("scripts", TaskOutcome::Success);
    scheduler.handle_completion("styles", TaskOutcome::Success);
    assert!(scheduler.is_idle());

    // A stylesheet change triggers only the style task; its dependency is
    // satisfied by run history, and the script task is never scheduled.
    scheduler.start_new_run();
    let ready = scheduler.handle_trigger("styles");
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].name, "styles");
    assert_eq!(scheduler.state_of("scripts"), None);

    scheduler.handle_completion("styles", TaskOutcome::Success);
    assert!(scheduler.is_idle());
    Ok(())
}

#[test]
fn soft_failed_task_still_satisfies_later_partial_runs() -> TestResult {
    let mut tasks = BTreeMap::new();
    tasks.insert("clean".to_string(), clean_task(&[]));
    tasks.insert(
        "lint".to_string(),
        task(
            ActionConfig::Stylelint {
                source: vec!["css/**/*.css".to_string()],
                report_dir: "reports/lint".to_string(),
            },
            &["clean"],
        ),
    );
    tasks.insert("styles".to_string(), clean_task(&["lint"]));
    let mut scheduler = Scheduler::from_config(&config_with_tasks(tasks));

    scheduler.start_new_run();
    trigger_all(&mut scheduler, &["clean", "lint", "styles"]);
    scheduler.handle_completion("clean", TaskOutcome::Success);
    scheduler.handle_completion("lint", failed());
    scheduler.handle_completion("styles", TaskOutcome::Success);
    assert!(scheduler.is_idle());

    // Style-only rerun: the soft-failed lint counts as satisfied history.
    scheduler.start_new_run();
    let ready = scheduler.handle_trigger("styles");
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].name, "styles");
    Ok(())
}
