// src/watch/mod.rs

//! File watching.
//!
//! Responsibilities:
//! - Compile per-task `watch` / `exclude` glob patterns.
//! - Wire up a cross-platform filesystem watcher (`notify`).
//! - Coalesce rapid change bursts into single task triggers (debounce).
//!
//! This module knows nothing about the DAG; it only turns filesystem
//! changes into task-level triggers. A watch-triggered run therefore
//! re-runs only the bound task, never the whole initial graph.

pub mod patterns;
pub mod watcher;

pub use patterns::{build_watch_profiles, WatchProfile};
pub use watcher::{spawn_watcher, WatcherHandle};
