//! Error types for t4gen.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//! None of these escape the generator: they are turned into diagnostics at the
//! orchestrator boundary. The CLI uses them directly for config and argument
//! problems.

use crate::exit_codes;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for t4gen operations.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// User provided invalid arguments or configuration.
    #[error("{0}")]
    UserError(String),

    /// A temp path or generated file could not be created, read, or deleted.
    #[error("{context} '{}': {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The processor executable could not be started.
    #[error("failed to start template processor '{}': {source}\nFix: check `processor` / `processor_dir` in t4gen.yaml.", .path.display())]
    ProcessLaunch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The processor did not exit before the deadline and was killed.
    #[error("the template processor did not respond within {} seconds. Aborting operation.", .timeout.as_secs())]
    Timeout { timeout: Duration },

    /// The processor exited with a code outside the template protocol.
    #[error("something went wrong executing the template processor: {0}")]
    Infrastructure(String),

    /// The processor's error stream did not follow the framed record format.
    #[error("malformed diagnostic stream from template processor: {0}")]
    Protocol(String),
}

impl GenerationError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            GenerationError::UserError(_) => exit_codes::USER_ERROR,
            GenerationError::Io { .. }
            | GenerationError::ProcessLaunch { .. }
            | GenerationError::Timeout { .. }
            | GenerationError::Infrastructure(_)
            | GenerationError::Protocol(_) => exit_codes::PROCESSOR_FAILURE,
        }
    }

    /// Wrap an I/O error with what was being attempted and on which path.
    pub fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GenerationError::Io {
            context,
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for t4gen operations.
pub type Result<T> = std::result::Result<T, GenerationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_error_has_correct_exit_code() {
        let err = GenerationError::UserError("bad argument".to_string());
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn processor_errors_share_exit_code() {
        let errs = [
            GenerationError::Timeout {
                timeout: Duration::from_secs(60),
            },
            GenerationError::Infrastructure("boom".to_string()),
            GenerationError::Protocol("bad header".to_string()),
            GenerationError::io(
                "failed to read generated output",
                "/tmp/x.cs",
                std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            ),
        ];
        for err in errs {
            assert_eq!(err.exit_code(), exit_codes::PROCESSOR_FAILURE);
        }
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = GenerationError::Timeout {
            timeout: Duration::from_secs(60),
        };
        assert_eq!(
            err.to_string(),
            "the template processor did not respond within 60 seconds. Aborting operation."
        );

        let err = GenerationError::io(
            "failed to read generated output",
            "/tmp/out.cs",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.to_string().contains("'/tmp/out.cs'"));
        assert!(err.to_string().starts_with("failed to read generated output"));
    }
}
