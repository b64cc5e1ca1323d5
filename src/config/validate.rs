// src/config/validate.rs

use anyhow::{anyhow, Context, Result};
use globset::Glob;

use crate::config::model::ConfigFile;

/// Run basic semantic validation against a loaded configuration.
///
/// This checks:
/// - `input` is present and parses as a glob pattern
/// - `output` is non-empty
/// - `target` / `format` are non-empty (the compiler rejects empty values
///   with a far less helpful message)
///
/// Absence of the input pattern is the one fatal setup condition: without it
/// there is nothing to compile and the tool refuses to start.
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    ensure_input_pattern(cfg)?;
    ensure_output_path(cfg)?;
    ensure_compiler_flags(cfg)?;
    Ok(())
}

fn ensure_input_pattern(cfg: &ConfigFile) -> Result<()> {
    if cfg.input.trim().is_empty() {
        return Err(anyhow!(
            "config must set `input` to a glob pattern selecting schema files"
        ));
    }

    Glob::new(&cfg.input)
        .with_context(|| format!("invalid `input` glob pattern: {}", cfg.input))?;

    Ok(())
}

fn ensure_output_path(cfg: &ConfigFile) -> Result<()> {
    if cfg.output.trim().is_empty() {
        return Err(anyhow!("`output` must not be empty"));
    }
    Ok(())
}

fn ensure_compiler_flags(cfg: &ConfigFile) -> Result<()> {
    if cfg.target.trim().is_empty() {
        return Err(anyhow!("`target` must not be empty"));
    }
    if cfg.format.trim().is_empty() {
        return Err(anyhow!("`format` must not be empty"));
    }
    if cfg.compiler.trim().is_empty() {
        return Err(anyhow!("`compiler` must not be empty"));
    }
    Ok(())
}
