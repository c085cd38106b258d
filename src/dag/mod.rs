// src/dag/mod.rs

//! Task graph representation and scheduling.
//!
//! - [`graph`] holds the directed acyclic graph of build tasks.
//! - [`scheduler`] contains the per-run state machine deciding which tasks
//!   are ready, when dependents may start, and which tasks get skipped
//!   after an upstream failure.

pub mod graph;
pub mod scheduler;

pub use graph::TaskGraph;
pub use scheduler::{ScheduledTask, Scheduler, TaskState};
