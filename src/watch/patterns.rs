// src/watch/patterns.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::debug;
use walkdir::WalkDir;

/// Compiled input glob plus the directory it is anchored under.
///
/// The pattern is interpreted relative to the working directory, e.g.
/// `"proto/**/*.proto"`. The walk root is the longest literal directory
/// prefix of the pattern (`"proto"` here), so enumeration never scans
/// unrelated parts of the tree.
#[derive(Debug, Clone)]
pub struct InputPatterns {
    pattern: String,
    root: PathBuf,
    set: GlobSet,
}

impl InputPatterns {
    /// Compile an input glob pattern.
    pub fn compile(pattern: &str) -> Result<Self> {
        // `literal_separator` keeps `*` from crossing directory boundaries,
        // so `proto/*.proto` does not match nested files.
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pattern}"))?;

        let mut builder = GlobSetBuilder::new();
        builder.add(glob);
        let set = builder.build()?;

        Ok(Self {
            pattern: pattern.to_string(),
            root: literal_prefix(pattern),
            set,
        })
    }

    /// The original pattern string.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Directory under which all matches live; this is what watch mode
    /// observes recursively.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a path (relative to the working directory, like the pattern)
    /// matches the input glob.
    pub fn matches(&self, path: impl AsRef<Path>) -> bool {
        self.set.is_match(normalize(path.as_ref()))
    }

    /// Enumerate all existing files matching the pattern, sorted for a
    /// deterministic compile order.
    ///
    /// Unreadable directory entries are skipped rather than failing the
    /// whole enumeration.
    pub fn matching_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(err) => {
                    debug!("skipping unreadable entry during glob walk: {err}");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| self.matches(p))
            .collect();

        files.sort();
        files
    }
}

/// Longest literal directory prefix of a glob pattern.
///
/// `"proto/**/*.proto"` → `"proto"`; `"*.proto"` → `"."`.
fn literal_prefix(pattern: &str) -> PathBuf {
    let mut prefix = PathBuf::new();

    for component in Path::new(pattern).components() {
        let s = component.as_os_str().to_string_lossy();
        if s.contains(['*', '?', '[', '{']) {
            break;
        }
        prefix.push(component);
    }

    // The last literal component may be the file name itself (a wildcard-free
    // pattern); walking its parent directory covers both cases.
    if prefix.as_path() == Path::new(pattern) {
        prefix.pop();
    }

    if prefix.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        prefix
    }
}

/// Candidate string for glob matching: forward slashes, no leading `./`.
fn normalize(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    s.strip_prefix("./").map(str::to_string).unwrap_or(s)
}
