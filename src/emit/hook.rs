// src/emit/hook.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Capability interface to the surrounding build host.
///
/// The coordinator reports every glob-matched schema file through this trait
/// so the host can register it as a build input and re-trigger passes when it
/// changes. This replaces version-specific hook plumbing with one seam: each
/// host (one-shot CLI, watch loop, an embedding build system) supplies its
/// own implementation.
pub trait BuildHost {
    /// Register a file as an input dependency of the current pass.
    fn register_dependency(&mut self, path: &Path);
}

/// Host that ignores dependency registration; used in one-shot mode where
/// nothing re-triggers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHost;

impl BuildHost for NoopHost {
    fn register_dependency(&mut self, _path: &Path) {}
}

/// Host that records registered dependencies as absolute paths.
///
/// Watch mode uses this to know which files a pass considered; tests use it
/// to assert registration behaviour.
#[derive(Debug, Default, Clone)]
pub struct DependencySet {
    paths: BTreeSet<PathBuf>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Whether the given path (absolutized the same way as registration) has
    /// been registered.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.paths.contains(&absolutize(path.as_ref()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.paths.iter()
    }
}

impl BuildHost for DependencySet {
    fn register_dependency(&mut self, path: &Path) {
        self.paths.insert(absolutize(path));
    }
}

fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
