// src/compile/command.rs

use crate::config::{ConfigFile, FeatureToggles};

/// Feature flag names in the fixed order the compiler documents them.
///
/// Order matters only for determinism: identical configs must always yield
/// identical argument lists.
const FEATURE_FLAGS: [&str; 8] = [
    "create",
    "encode",
    "decode",
    "verify",
    "delimited",
    "beautify",
    "comments",
    "convert",
];

/// The static part of the compiler command line, derived once from
/// configuration at setup and reused for every invocation.
///
/// Per-invocation file paths are appended by the caller; the template itself
/// never contains input or output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    args: Vec<String>,
}

impl CommandTemplate {
    /// Build the argument list from configuration.
    ///
    /// Always emits `-t <target>` then `-w <format>`. Each feature toggle
    /// that is disabled contributes a `--no-<feature>` flag, in the fixed
    /// order of [`FEATURE_FLAGS`]; enabled toggles (the default) emit
    /// nothing.
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let mut args = vec![
            "-t".to_string(),
            cfg.target.clone(),
            "-w".to_string(),
            cfg.format.clone(),
        ];

        for (name, enabled) in FEATURE_FLAGS.iter().zip(toggle_values(&cfg.features)) {
            if !enabled {
                args.push(format!("--no-{name}"));
            }
        }

        Self { args }
    }

    /// The static flags, without any file paths.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// A per-invocation argument list: the template plus the given files.
    pub fn with_files<I, S>(&self, files: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = self.args.clone();
        args.extend(files.into_iter().map(Into::into));
        args
    }
}

fn toggle_values(f: &FeatureToggles) -> [bool; 8] {
    [
        f.create,
        f.encode,
        f.decode,
        f.verify,
        f.delimited,
        f.beautify,
        f.comments,
        f.convert,
    ]
}
