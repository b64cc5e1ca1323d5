// src/emit/coordinator.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::compile::{invoke_compiler, CommandTemplate};
use crate::config::{BatchErrorPolicy, ConfigFile, OutputMode};
use crate::emit::hook::BuildHost;
use crate::track::ChangeTracker;
use crate::watch::InputPatterns;

/// Extension of generated source modules.
const GENERATED_EXT: &str = "js";

/// File name used in combined mode when `output` is a bare directory.
const DEFAULT_COMBINED_FILE: &str = "basic.proto.js";

/// What one emit pass saw; returned for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Files the input glob matched.
    pub matched: usize,
    /// Subset whose content changed since the last pass.
    pub changed: usize,
}

/// Orchestrates one emit pass: glob → register → change-filter → compile →
/// write.
///
/// A pass never fails its caller. Compiler and write errors are logged and
/// swallowed so the surrounding build always proceeds; the only fatal errors
/// in the tool are setup errors, which are caught before a coordinator is
/// ever constructed.
#[derive(Debug)]
pub struct OutputCoordinator {
    config: ConfigFile,
    template: CommandTemplate,
}

impl OutputCoordinator {
    pub fn new(config: ConfigFile) -> Self {
        let template = CommandTemplate::from_config(&config);
        Self { config, template }
    }

    /// The static compiler argument list derived from configuration.
    pub fn template(&self) -> &CommandTemplate {
        &self.template
    }

    /// Run one emit pass.
    ///
    /// Every matched file is registered with the host and hashed through the
    /// tracker. Combined mode then compiles the full matched set (a merged
    /// output must always reflect all inputs); per-file mode compiles only
    /// the changed subset. Files that cannot be read for hashing are logged
    /// and skipped for this pass without caching a digest.
    pub async fn run_pass(
        &self,
        patterns: &InputPatterns,
        tracker: &mut ChangeTracker,
        host: &mut dyn BuildHost,
    ) -> PassSummary {
        let files = patterns.matching_files();
        let mut changed: Vec<PathBuf> = Vec::new();

        for file in &files {
            host.register_dependency(file);
            match tracker.is_changed(file) {
                Ok(true) => changed.push(file.clone()),
                Ok(false) => {}
                Err(err) => {
                    warn!(file = %file.display(), error = %err, "skipping unreadable schema file");
                }
            }
        }

        let summary = PassSummary {
            matched: files.len(),
            changed: changed.len(),
        };
        info!(
            matched = summary.matched,
            changed = summary.changed,
            "emit pass starting"
        );

        match self.config.output_mode {
            OutputMode::Combined => self.combined_output(&files).await,
            OutputMode::PerFile => self.per_file_output(&changed).await,
        }

        summary
    }

    /// Compile all matched files in one invocation and write a single merged
    /// module.
    async fn combined_output(&self, files: &[PathBuf]) {
        if files.is_empty() {
            debug!("no files matched the input pattern; nothing to compile");
            return;
        }

        let out_path = combined_output_path(&self.config.output);
        let args = self.template.with_files(files.iter().map(path_arg));

        let text = match invoke_compiler(&self.config.compiler, &args).await {
            Ok(text) => text,
            Err(err) => {
                error!(error = %err, "combined compilation failed");
                return;
            }
        };

        if let Some(parent) = out_path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(err) = tokio::fs::create_dir_all(parent).await {
                    error!(dir = %parent.display(), error = %err, "creating output directory failed");
                    return;
                }
            }
        }

        match tokio::fs::write(&out_path, text).await {
            Ok(()) => info!(output = %out_path.display(), "wrote combined module"),
            Err(err) => {
                error!(output = %out_path.display(), error = %err, "writing combined module failed");
            }
        }
    }

    /// Compile each changed file independently and write one module per
    /// input.
    ///
    /// An empty change set short-circuits completely: no directory creation,
    /// no invocations. Invocations run concurrently, bounded by
    /// `batch.concurrency` when nonzero. Under the abort policy a single
    /// failure voids the batch and nothing is written.
    async fn per_file_output(&self, changed: &[PathBuf]) {
        if changed.is_empty() {
            debug!("no changed files; nothing to compile");
            return;
        }

        let out_dir = PathBuf::from(&self.config.output);
        if let Err(err) = tokio::fs::create_dir_all(&out_dir).await {
            error!(dir = %out_dir.display(), error = %err, "creating output directory failed");
            return;
        }

        let limiter = match self.config.batch.concurrency {
            0 => None,
            n => Some(Arc::new(Semaphore::new(n))),
        };

        let mut tasks: JoinSet<(PathBuf, Result<String>)> = JoinSet::new();
        for file in changed {
            let args = self.template.with_files([path_arg(file)]);
            let compiler = self.config.compiler.clone();
            let limiter = limiter.clone();
            let file = file.clone();

            tasks.spawn(async move {
                let _permit = match limiter {
                    Some(sem) => sem.acquire_owned().await.ok(),
                    None => None,
                };
                let result = invoke_compiler(&compiler, &args).await;
                (file, result)
            });
        }

        let mut compiled: Vec<(PathBuf, String)> = Vec::new();
        let mut any_failed = false;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((file, Ok(text))) => compiled.push((file, text)),
                Ok((file, Err(err))) => {
                    error!(file = %file.display(), error = %err, "compilation failed");
                    any_failed = true;
                }
                Err(err) => {
                    error!(error = %err, "compiler task panicked");
                    any_failed = true;
                }
            }
        }

        if any_failed && self.config.batch.on_error == BatchErrorPolicy::Abort {
            error!("batch aborted; no outputs written");
            return;
        }

        for (file, text) in compiled {
            let out_path = per_file_output_path(&out_dir, &file);
            match tokio::fs::write(&out_path, text).await {
                Ok(()) => debug!(output = %out_path.display(), "wrote module"),
                Err(err) => {
                    // Individual write failures never abort sibling writes.
                    error!(output = %out_path.display(), error = %err, "writing module failed");
                }
            }
        }
    }
}

/// Destination of the merged module: the configured output verbatim when it
/// already names a generated source file, otherwise a default file inside it.
fn combined_output_path(output: &str) -> PathBuf {
    let path = Path::new(output);
    if path.extension().is_some_and(|ext| ext == GENERATED_EXT) {
        path.to_path_buf()
    } else {
        path.join(DEFAULT_COMBINED_FILE)
    }
}

/// Destination of a per-file module: output directory plus the input's stem
/// with the generated extension.
fn per_file_output_path(out_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    out_dir.join(format!("{stem}.{GENERATED_EXT}"))
}

fn path_arg(path: impl AsRef<Path>) -> String {
    path.as_ref().to_string_lossy().into_owned()
}
