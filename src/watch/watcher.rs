// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::watch::patterns::InputPatterns;

/// Events driving the emit-pass loop in watch mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEvent {
    /// At least one matched schema file was touched; run another pass.
    FilesChanged,
    /// Ctrl-C or equivalent; stop the loop.
    ShutdownRequested,
}

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive
/// for as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher over the pattern's root directory and send
/// [`WatchEvent::FilesChanged`] whenever a changed path matches the input
/// glob.
///
/// The change tracker downstream makes redundant notifications cheap: a pass
/// triggered by an event that did not actually alter file content compiles
/// nothing.
pub fn spawn_watcher(
    patterns: Arc<InputPatterns>,
    events_tx: mpsc::Sender<WatchEvent>,
) -> Result<WatcherHandle> {
    let root = patterns.root().to_path_buf();
    let canonical_root = root.canonicalize().unwrap_or_else(|_| root.clone());

    // Channel from the blocking notify callback into the async world.
    let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = raw_tx.send(event) {
                    // We can't log via tracing here easily, so fall back to stderr.
                    eprintln!("protowatch: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("protowatch: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&canonical_root, RecursiveMode::Recursive)?;
    info!("file watcher started on {:?}", root);

    tokio::spawn(async move {
        while let Some(event) = raw_rx.recv().await {
            debug!("received notify event: {:?}", event);

            let hit = event.paths.iter().any(|path| {
                candidate_path(&canonical_root, &root, path)
                    .map(|rel| patterns.matches(&rel))
                    .unwrap_or(false)
            });

            if hit {
                if let Err(err) = events_tx.send(WatchEvent::FilesChanged).await {
                    warn!("failed to send WatchEvent::FilesChanged: {err}");
                    // Loop has gone away; no point keeping the watcher task alive.
                    return;
                }
            }
        }

        debug!("file watcher loop ended");
    });

    Ok(WatcherHandle { _inner: watcher })
}

/// Rebase an absolute event path onto the (possibly relative) pattern root so
/// it can be matched against the original glob, e.g.
/// `/abs/project/proto/a.proto` → `proto/a.proto`.
fn candidate_path(canonical_root: &Path, root: &Path, path: &Path) -> Option<PathBuf> {
    let rel = path.strip_prefix(canonical_root).ok()?;
    Some(root.join(rel))
}
