// src/engine/mod.rs

//! Orchestration engine.
//!
//! Ties together the DAG scheduler, the pending-trigger set (what happens
//! when triggers arrive while a run is active), and the main runtime event
//! loop reacting to file-watch triggers, task completions, and shutdown.

pub mod queue;
pub mod runtime;

pub use queue::PendingTriggers;
pub use runtime::{Runtime, RuntimeEvent, RuntimeOptions, TaskName, TaskOutcome, TriggerReason};
