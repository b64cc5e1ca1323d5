// src/lib.rs

pub mod cli;
pub mod compile;
pub mod config;
pub mod emit;
pub mod errors;
pub mod logging;
pub mod track;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::compile::CommandTemplate;
use crate::config::loader::load_and_validate;
use crate::config::ConfigFile;
use crate::emit::{DependencySet, NoopHost, OutputCoordinator};
use crate::track::ChangeTracker;
use crate::watch::{spawn_watcher, InputPatterns, WatchEvent};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the command template and change tracker
/// - the output coordinator
/// - (optional) file watcher
/// - Ctrl-C handling
///
/// Only setup problems (unreadable config, missing input pattern) surface as
/// errors here; once passes start running, compiler and write failures are
/// logged and never abort the loop.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;
    let patterns = InputPatterns::compile(&cfg.input)?;

    if args.dry_run {
        print_dry_run(&cfg, &patterns);
        return Ok(());
    }

    let coordinator = OutputCoordinator::new(cfg);
    let mut tracker = ChangeTracker::new();

    if !args.watch {
        let mut host = NoopHost;
        coordinator.run_pass(&patterns, &mut tracker, &mut host).await;
        return Ok(());
    }

    // Watch mode: the watcher and the Ctrl-C handler feed one event channel.
    let patterns = Arc::new(patterns);
    let (events_tx, mut events_rx) = mpsc::channel::<WatchEvent>(64);

    let _watcher_handle = spawn_watcher(Arc::clone(&patterns), events_tx.clone())?;

    {
        let tx = events_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(WatchEvent::ShutdownRequested).await;
        });
    }

    // Initial pass compiles whatever already exists on disk.
    let mut host = DependencySet::new();
    coordinator
        .run_pass(&patterns, &mut tracker, &mut host)
        .await;

    while let Some(event) = events_rx.recv().await {
        match event {
            WatchEvent::FilesChanged => {
                // Coalesce a burst of events into one pass; the change cache
                // already makes the pass itself skip unchanged files.
                let mut shutdown = false;
                while let Ok(pending) = events_rx.try_recv() {
                    if pending == WatchEvent::ShutdownRequested {
                        shutdown = true;
                        break;
                    }
                }

                let summary = coordinator
                    .run_pass(&patterns, &mut tracker, &mut host)
                    .await;
                debug!(?summary, "watch-triggered pass finished");

                if shutdown {
                    info!("shutdown requested, stopping watch loop");
                    break;
                }
            }
            WatchEvent::ShutdownRequested => {
                info!("shutdown requested, stopping watch loop");
                break;
            }
        }
    }

    Ok(())
}

/// Simple dry-run output: print the resolved compiler command and the files
/// the input pattern currently matches.
fn print_dry_run(cfg: &ConfigFile, patterns: &InputPatterns) {
    let template = CommandTemplate::from_config(cfg);

    println!("protowatch dry-run");
    println!("  input = {}", patterns.pattern());
    println!("  output = {}", cfg.output);
    println!("  output_mode = {:?}", cfg.output_mode);
    println!("  compiler = {} {}", cfg.compiler, template.args().join(" "));
    if cfg.batch.concurrency != 0 {
        println!("  batch.concurrency = {}", cfg.batch.concurrency);
    }
    println!("  batch.on_error = {:?}", cfg.batch.on_error);
    println!();

    let files = patterns.matching_files();
    println!("matched files ({}):", files.len());
    for file in files {
        println!("  - {}", file.display());
    }

    debug!("dry-run complete (no execution)");
}
