// src/track/mod.rs

//! Content-hash change detection.
//!
//! The tracker remembers, per file path, the digest of the file's bytes the
//! last time it was observed as changed. It lives on the plugin state for the
//! lifetime of the process, so in watch mode it persists across emit passes.
//! Entries are never removed; a stale entry for a deleted file is harmless
//! because future globs simply never produce that path again.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

/// Path → hex digest map with change-detection semantics.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    seen: HashMap<PathBuf, String>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash the file's current content and report whether it differs from the
    /// last observation.
    ///
    /// Returns `true` (and stores the new digest) when the path has never
    /// been observed or its content changed; returns `false` and leaves the
    /// stored entry untouched otherwise. I/O errors propagate to the caller
    /// without mutating the cache.
    pub fn is_changed(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        let digest = hash_file(path)?;

        match self.seen.get(path) {
            Some(stored) if *stored == digest => Ok(false),
            _ => {
                debug!(path = %path.display(), digest = %digest, "file changed");
                self.seen.insert(path.to_path_buf(), digest);
                Ok(true)
            }
        }
    }

    /// The stored digest for a path, if it has ever been observed.
    pub fn digest_of(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.seen.get(path.as_ref()).map(String::as_str)
    }

    /// Number of paths observed so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Compute a deterministic hex digest over the raw bytes of one file.
pub fn hash_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let mut hasher = Hasher::new();

    let mut file = File::open(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}
