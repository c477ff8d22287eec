//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for t4gen.
///
/// This struct represents the contents of `t4gen.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Processor settings
    // =========================================================================
    /// Explicit path to the processor executable.
    ///
    /// When unset, the processor is looked up next to the t4gen executable
    /// under `processor_dir/processor_name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processor: Option<PathBuf>,

    /// Subdirectory (relative to the t4gen executable) holding the processor.
    #[serde(default = "default_processor_dir")]
    pub processor_dir: String,

    /// File name of the processor executable.
    #[serde(default = "default_processor_name")]
    pub processor_name: String,

    /// Seconds to wait for the processor before killing it.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Additional arguments passed before the input path (shell-style quoting).
    #[serde(default)]
    pub extra_args: String,

    // =========================================================================
    // Output settings
    // =========================================================================
    /// Extension used when a template has no `output` directive.
    #[serde(default = "default_extension")]
    pub default_extension: String,

    /// How generated output is read back.
    #[serde(default)]
    pub output_mode: OutputMode,

    /// Directory for temp output files (defaults to the platform temp dir).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,

    // =========================================================================
    // CLI settings
    // =========================================================================
    /// Glob patterns selecting templates when a directory is passed.
    #[serde(default = "default_include")]
    pub include: Vec<String>,

    /// NDJSON file receiving one event per generation (disabled when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_log: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            processor: None,
            processor_dir: default_processor_dir(),
            processor_name: default_processor_name(),
            timeout_seconds: default_timeout_seconds(),
            extra_args: String::new(),
            default_extension: default_extension(),
            output_mode: OutputMode::default(),
            temp_dir: None,
            include: default_include(),
            event_log: None,
        }
    }
}
