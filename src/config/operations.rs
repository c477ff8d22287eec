//! Config loading, validation, and utility operations.

use super::model::Config;
use super::types::CONFIG_FILE_NAME;
use crate::error::{GenerationError, Result};
use crate::escape::split_arguments;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the t4gen.yaml file
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(GenerationError::UserError)` - Parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            GenerationError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load `t4gen.yaml` from `dir` if present, otherwise return defaults.
    pub fn load_or_default<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let path = dir.as_ref().join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml).map_err(|e| {
            GenerationError::UserError(format!("failed to parse config YAML: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            GenerationError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `timeout_seconds` must be positive
    /// - `default_extension` must be empty or start with a dot
    /// - `processor_name` must be non-empty
    /// - `extra_args` must parse as shell-style arguments
    /// - `include` globs must compile
    pub fn validate(&self) -> Result<()> {
        if self.timeout_seconds == 0 {
            return Err(GenerationError::UserError(
                "config validation failed: timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if !self.default_extension.is_empty() && !self.default_extension.starts_with('.') {
            return Err(GenerationError::UserError(format!(
                "config validation failed: default_extension must start with a dot (found '{}'). Use '.{}' instead.",
                self.default_extension, self.default_extension
            )));
        }

        if self.processor_name.trim().is_empty() {
            return Err(GenerationError::UserError(
                "config validation failed: processor_name must be non-empty".to_string(),
            ));
        }

        self.extra_args()?;
        self.include_globset()?;

        Ok(())
    }

    /// Processor deadline as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// `extra_args` split into individual arguments.
    pub fn extra_args(&self) -> Result<Vec<String>> {
        split_arguments(&self.extra_args).map_err(|e| {
            GenerationError::UserError(format!("config validation failed: extra_args: {}", e))
        })
    }

    /// Compile `include` into a glob set.
    pub fn include_globset(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();

        for pattern in &self.include {
            let normalized = pattern.trim().replace('\\', "/");
            if normalized.is_empty() {
                continue;
            }
            let glob = Glob::new(&normalized).map_err(|e| {
                GenerationError::UserError(format!(
                    "invalid glob pattern in include: '{}' - {}\n\
                     Fix: edit t4gen.yaml and correct or remove this pattern.",
                    pattern, e
                ))
            })?;
            builder.add(glob);
        }

        builder.build().map_err(|e| {
            GenerationError::UserError(format!("failed to build include glob set: {}", e))
        })
    }

    /// Absolute path to the processor executable.
    ///
    /// An explicit `processor` wins (relative paths resolve against the
    /// t4gen executable's directory); otherwise the default layout
    /// `<exe dir>/<processor_dir>/<processor_name>` is used.
    pub fn processor_path(&self) -> Result<PathBuf> {
        if let Some(explicit) = self.processor.as_ref().filter(|p| p.is_absolute()) {
            return Ok(explicit.clone());
        }

        let exe = std::env::current_exe().map_err(|e| {
            GenerationError::UserError(format!("failed to locate the t4gen executable: {}", e))
        })?;
        let base = exe.parent().map(Path::to_path_buf).unwrap_or_default();

        let path = match &self.processor {
            Some(relative) => base.join(relative),
            None => base.join(&self.processor_dir).join(&self.processor_name),
        };

        Ok(std::path::absolute(&path).unwrap_or(path))
    }
}
