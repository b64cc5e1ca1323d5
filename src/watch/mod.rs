// src/watch/mod.rs

//! Glob matching and filesystem watching.
//!
//! This module is responsible for:
//! - Compiling the `input` glob pattern and enumerating the files it matches.
//! - Wiring up a cross-platform filesystem watcher (`notify`) that re-fires
//!   emit passes when a matched file changes.
//!
//! It does **not** decide which files get recompiled; that is the change
//! tracker's job. The watcher only turns filesystem activity into pass-level
//! triggers.

pub mod patterns;
pub mod watcher;

pub use patterns::InputPatterns;
pub use watcher::{spawn_watcher, WatchEvent, WatcherHandle};
