// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fileset;
pub mod lint;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod serve;
pub mod tasks;
pub mod transform;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::Scheduler;
use crate::engine::{Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use crate::serve::{Notifier, ServeOptions};
use crate::watch::build_watch_profiles;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - action assembly (pipelines, lint, clean)
/// - scheduler / runtime
/// - executor
/// - dev server and file watcher (unless `--once`)
/// - Ctrl-C handling
///
/// The initial full build runs first; a failure there is fatal and the
/// process exits non-zero. Once in watch mode, task failures are reported
/// and the loop keeps running.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let root_dir = config_root_dir(&config_path);
    let source_root = root_dir.join(&cfg.project.source);
    let dest_root = root_dir.join(&cfg.project.dest);

    // Dev server first so pipelines get a live notifier (disabled in
    // --once mode).
    let notifier = if args.once {
        Notifier::disabled()
    } else {
        serve::spawn_server(
            dest_root.clone(),
            ServeOptions {
                host: cfg.server.host.clone(),
                port: cfg.server.port,
            },
        )
        .await?
    };

    let actions = tasks::build_actions(&cfg, &root_dir, notifier)?;
    let scheduler = Scheduler::from_config(&cfg);

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    // Action executor.
    let exec_tx = exec::spawn_executor(rt_tx.clone(), actions);

    // File watcher (disabled in --once mode). Patterns are evaluated
    // relative to the source root, so that is what gets observed.
    let _watcher_handle = if !args.once {
        let profiles = build_watch_profiles(&cfg)?;
        Some(watch::spawn_watcher(
            source_root.clone(),
            profiles,
            rt_tx.clone(),
        )?)
    } else {
        None
    };

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    // Seed the initial full build: every declared task participates, the
    // scheduler orders them by their `after` relations.
    let initial: Vec<String> = cfg.task.keys().cloned().collect();
    info!(tasks = initial.len(), "seeding initial full build");

    rt_tx
        .send(RuntimeEvent::TasksTriggered {
            tasks: initial,
            reason: TriggerReason::Manual,
        })
        .await?;

    let options = RuntimeOptions {
        exit_when_idle: args.once,
        initial_run_fatal: true,
    };

    let runtime = Runtime::new(scheduler, options, rt_rx, exec_tx);
    runtime.run().await
}

/// Project root for resolving source/dest paths: the directory containing
/// the config file, or `.`.
fn config_root_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Dry-run output: print tasks, ordering, and watch patterns.
fn print_dry_run(cfg: &ConfigFile) {
    println!("sitegear dry-run");
    println!("  source = {}", cfg.project.source);
    println!("  dest   = {}", cfg.project.dest);
    println!("  server = {}:{}", cfg.server.host, cfg.server.port);
    println!();

    println!("tasks ({}):", cfg.task.len());
    for (name, task) in cfg.task.iter() {
        println!("  - {name} ({})", task.action.kind());
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        if !task.parallel_with.is_empty() {
            println!("      parallel_with: {:?}", task.parallel_with);
        }
        if let Some(ref watch) = task.watch {
            if !watch.is_empty() {
                println!("      watch: {:?}", watch);
            }
        }
        if let Some(ref exclude) = task.exclude {
            if !exclude.is_empty() {
                println!("      exclude: {:?}", exclude);
            }
        }
        if task.effective_soft_fail() {
            println!("      soft_fail: true");
        }
    }
}
