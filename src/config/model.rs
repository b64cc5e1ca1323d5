// src/config/model.rs

use std::str::FromStr;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// input = "proto/**/*.proto"
/// output = "src/generated"
/// output_mode = "per-file"
/// target = "static-module"
/// format = "es6"
/// compiler = "pbjs"
///
/// [features]
/// comments = false
///
/// [batch]
/// concurrency = 4
/// on_error = "abort"
/// ```
///
/// Everything except `input` has a documented default.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    /// Glob pattern selecting the interface-definition files to compile.
    ///
    /// Required; an empty pattern is rejected by validation.
    #[serde(default)]
    pub input: String,

    /// Output path: a directory, or (in combined mode) an explicit `.js` file.
    #[serde(default = "default_output")]
    pub output: String,

    /// `"combined"` writes one merged module from all matched inputs;
    /// `"per-file"` (default) writes one module per changed input.
    #[serde(default)]
    pub output_mode: OutputMode,

    /// Compiler target mode, passed as `-t <target>`.
    #[serde(default = "default_target")]
    pub target: String,

    /// Output module format, passed as `-w <format>`.
    #[serde(default = "default_format")]
    pub format: String,

    /// The schema-compiler executable to invoke.
    #[serde(default = "default_compiler")]
    pub compiler: String,

    /// Generator feature toggles from `[features]`.
    #[serde(default)]
    pub features: FeatureToggles,

    /// Per-file batch behaviour from `[batch]`.
    #[serde(default)]
    pub batch: BatchSection,
}

fn default_output() -> String {
    ".".to_string()
}

fn default_target() -> String {
    "static-module".to_string()
}

fn default_format() -> String {
    "es6".to_string()
}

fn default_compiler() -> String {
    "pbjs".to_string()
}

/// Whether all inputs are merged into one generated module or each changed
/// input gets its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    Combined,
    PerFile,
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::PerFile
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "combined" => Ok(OutputMode::Combined),
            "per-file" | "per_file" => Ok(OutputMode::PerFile),
            other => Err(format!(
                "invalid output_mode: {other} (expected \"combined\" or \"per-file\")"
            )),
        }
    }
}

/// `[features]` section: the generator features the compiler should emit.
///
/// Each toggle defaults to `true`; a disabled toggle becomes a
/// `--no-<feature>` flag on the compiler command line.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FeatureToggles {
    /// Message creation helpers.
    #[serde(default = "default_true")]
    pub create: bool,

    /// Encode methods.
    #[serde(default = "default_true")]
    pub encode: bool,

    /// Decode methods.
    #[serde(default = "default_true")]
    pub decode: bool,

    /// Verify methods.
    #[serde(default = "default_true")]
    pub verify: bool,

    /// Length-delimited framing variants.
    #[serde(default = "default_true")]
    pub delimited: bool,

    /// Pretty-printed output.
    #[serde(default = "default_true")]
    pub beautify: bool,

    /// Doc comments in the generated code.
    #[serde(default = "default_true")]
    pub comments: bool,

    /// Plain-object conversion helpers (from/toObject).
    #[serde(default = "default_true")]
    pub convert: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            create: true,
            encode: true,
            decode: true,
            verify: true,
            delimited: true,
            beautify: true,
            comments: true,
            convert: true,
        }
    }
}

/// `[batch]` section: how per-file compiler invocations are dispatched.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BatchSection {
    /// Maximum concurrent compiler invocations; 0 means unbounded.
    #[serde(default)]
    pub concurrency: usize,

    /// `"abort"`: any failed invocation voids the whole batch, nothing is
    /// written. `"continue"`: write whatever succeeded.
    #[serde(default)]
    pub on_error: BatchErrorPolicy,
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            concurrency: 0,
            on_error: BatchErrorPolicy::default(),
        }
    }
}

/// Failure-aggregation policy for a per-file batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchErrorPolicy {
    Abort,
    Continue,
}

impl Default for BatchErrorPolicy {
    fn default() -> Self {
        BatchErrorPolicy::Abort
    }
}

impl FromStr for BatchErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(BatchErrorPolicy::Abort),
            "continue" => Ok(BatchErrorPolicy::Continue),
            other => Err(format!(
                "invalid batch.on_error: {other} (expected \"abort\" or \"continue\")"
            )),
        }
    }
}
