// tests/ordering_validation.rs

mod common;

use std::collections::BTreeMap;
use std::error::Error;

use sitegear::config::validate_ordering;
use sitegear::errors::GraphError;

use common::{clean_task, config_with_tasks};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn cyclic_ordering_is_rejected_at_construction() -> TestResult {
    let mut tasks = BTreeMap::new();
    tasks.insert("a".to_string(), clean_task(&["b"]));
    tasks.insert("b".to_string(), clean_task(&["a"]));

    let cfg = config_with_tasks(tasks);
    let err = validate_ordering(&cfg).unwrap_err();
    assert!(matches!(err, GraphError::CyclicDependency { .. }));
    Ok(())
}

#[test]
fn longer_cycle_is_rejected() -> TestResult {
    let mut tasks = BTreeMap::new();
    tasks.insert("a".to_string(), clean_task(&["c"]));
    tasks.insert("b".to_string(), clean_task(&["a"]));
    tasks.insert("c".to_string(), clean_task(&["b"]));

    let cfg = config_with_tasks(tasks);
    let err = validate_ordering(&cfg).unwrap_err();
    assert!(matches!(err, GraphError::CyclicDependency { .. }));
    Ok(())
}

#[test]
fn unknown_after_reference_is_rejected() -> TestResult {
    let mut tasks = BTreeMap::new();
    tasks.insert("a".to_string(), clean_task(&["ghost"]));

    let cfg = config_with_tasks(tasks);
    let err = validate_ordering(&cfg).unwrap_err();
    assert!(matches!(
        err,
        GraphError::UnknownReference { ref reference, .. } if reference == "ghost"
    ));
    Ok(())
}

#[test]
fn self_reference_is_rejected() -> TestResult {
    let mut tasks = BTreeMap::new();
    tasks.insert("a".to_string(), clean_task(&["a"]));

    let cfg = config_with_tasks(tasks);
    let err = validate_ordering(&cfg).unwrap_err();
    assert!(matches!(err, GraphError::SelfReference { .. }));
    Ok(())
}

#[test]
fn parallel_with_conflicting_after_is_rejected() -> TestResult {
    let mut tasks = BTreeMap::new();
    let mut a = clean_task(&["b"]);
    a.parallel_with = vec!["b".to_string()];
    tasks.insert("a".to_string(), a);
    tasks.insert("b".to_string(), clean_task(&[]));

    let cfg = config_with_tasks(tasks);
    let err = validate_ordering(&cfg).unwrap_err();
    assert!(matches!(err, GraphError::ConflictingOrdering { .. }));
    Ok(())
}

#[test]
fn empty_task_table_is_rejected() -> TestResult {
    let cfg = config_with_tasks(BTreeMap::new());
    let err = validate_ordering(&cfg).unwrap_err();
    assert!(matches!(err, GraphError::NoTasks));
    Ok(())
}

#[test]
fn valid_chain_passes() -> TestResult {
    let mut tasks = BTreeMap::new();
    tasks.insert("a".to_string(), clean_task(&[]));
    tasks.insert("b".to_string(), clean_task(&["a"]));
    let mut c = clean_task(&["a"]);
    c.parallel_with = vec!["b".to_string()];
    tasks.insert("c".to_string(), c);

    let cfg = config_with_tasks(tasks);
    validate_ordering(&cfg)?;
    Ok(())
}
