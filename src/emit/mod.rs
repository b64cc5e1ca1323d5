// src/emit/mod.rs

//! Emit-pass orchestration.
//!
//! This module ties together:
//! - the [`hook::BuildHost`] seam through which matched files are registered
//!   as build inputs
//! - the [`coordinator::OutputCoordinator`], which runs one pass end to end:
//!   glob enumeration, change filtering, compiler dispatch, output writing
//!
//! A pass always completes, whatever the compiler or the filesystem do; only
//! setup errors are fatal, and those are raised before a pass ever runs.

pub mod coordinator;
pub mod hook;

pub use coordinator::{OutputCoordinator, PassSummary};
pub use hook::{BuildHost, DependencySet, NoopHost};
