//! Configuration types and defaults for t4gen.
//!
//! This module defines enums, constants, and default value functions
//! used by the Config struct.

use serde::{Deserialize, Serialize};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "t4gen.yaml";

/// How generated output is read back from the processor's output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Byte-for-byte passthrough (default).
    #[default]
    Bytes,
    /// Decode to text, honoring byte order marks and the directive encoding.
    Text,
}

impl OutputMode {
    /// Parse an output mode from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "bytes" => Some(Self::Bytes),
            "text" => Some(Self::Text),
            _ => None,
        }
    }
}

pub(super) fn default_processor_dir() -> String {
    "T4Exe".to_string()
}

pub(super) fn default_processor_name() -> String {
    if cfg!(windows) {
        "t4.exe".to_string()
    } else {
        "t4".to_string()
    }
}

pub(super) fn default_extension() -> String {
    ".cs".to_string()
}

pub(super) fn default_timeout_seconds() -> u64 {
    60
}

/// Default globs used to find templates when a directory is given.
pub fn default_include() -> Vec<String> {
    vec!["**/*.tt".to_string()]
}
