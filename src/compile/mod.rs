// src/compile/mod.rs

//! External schema-compiler integration.
//!
//! - [`command`] builds the static argument list from configuration.
//! - [`invoke`] runs the compiler executable over one or more schema files
//!   and captures the generated source text.
//!
//! The compiler itself is a black box: an executable taking flags plus file
//! paths and printing a generated module to stdout, or exiting nonzero.

pub mod command;
pub mod invoke;

pub use command::CommandTemplate;
pub use invoke::invoke_compiler;
