//! Template diagnostics and the sinks that receive them.

use serde::{Deserialize, Serialize};

/// A single error or warning attributed to a template position.
///
/// `line` and `column` hold the values exactly as the processor sent them.
/// The generator shifts them by one when handing them to a [`DiagnosticSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateError {
    pub warning: bool,
    pub message: String,
    pub line: i32,
    pub column: i32,
}

impl TemplateError {
    pub fn new(warning: bool, message: impl Into<String>, line: i32, column: i32) -> Self {
        Self {
            warning,
            message: message.into(),
            line,
            column,
        }
    }

    /// A non-warning diagnostic with no source position.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(false, message, 0, 0)
    }
}

/// Receiver for diagnostics produced by a generation.
///
/// `line` and `column` are 1-based at this boundary. `code` is always 0; it is
/// kept so hosts with numbered error lists can plug in directly.
pub trait DiagnosticSink {
    fn report(&mut self, warning: bool, code: i32, message: &str, line: i32, column: i32);
}

impl<F> DiagnosticSink for F
where
    F: FnMut(bool, i32, &str, i32, i32),
{
    fn report(&mut self, warning: bool, code: i32, message: &str, line: i32, column: i32) {
        self(warning, code, message, line, column)
    }
}

/// A diagnostic as it was delivered to a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedDiagnostic {
    pub warning: bool,
    pub code: i32,
    pub message: String,
    pub line: i32,
    pub column: i32,
}

/// Sink that keeps every diagnostic in arrival order.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    pub diagnostics: Vec<ReportedDiagnostic>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| !d.warning).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.warning).count()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&mut self, warning: bool, code: i32, message: &str, line: i32, column: i32) {
        self.diagnostics.push(ReportedDiagnostic {
            warning,
            code,
            message: message.to_string(),
            line,
            column,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_sink_keeps_order_and_counts() {
        let mut sink = CollectingSink::new();
        sink.report(false, 0, "first", 1, 1);
        sink.report(true, 0, "second", 2, 3);
        sink.report(false, 0, "third", 4, 5);

        let messages: Vec<_> = sink.diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, ["first", "second", "third"]);
        assert_eq!(sink.error_count(), 2);
        assert_eq!(sink.warning_count(), 1);
    }

    #[test]
    fn closures_are_sinks() {
        let mut seen = Vec::new();
        {
            let mut sink = |warning: bool, _code: i32, message: &str, line: i32, column: i32| {
                seen.push((warning, message.to_string(), line, column));
            };
            sink.report(true, 0, "careful", 7, 2);
        }
        assert_eq!(seen, vec![(true, "careful".to_string(), 7, 2)]);
    }

    #[test]
    fn synthetic_error_has_no_position() {
        let err = TemplateError::error("boom");
        assert!(!err.warning);
        assert_eq!((err.line, err.column), (0, 0));
    }
}
