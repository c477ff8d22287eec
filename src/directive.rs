//! Output directive detection.
//!
//! Templates can request a target extension (and output encoding) with a
//! directive such as:
//!
//! ```text
//! <#@ output extension="txt" encoding="utf-8" #>
//! ```
//!
//! The scan is a single best-effort regex match over the whole template. It
//! does not check where the directive sits or reject malformed ones; anything
//! it cannot read simply leaves the configured default in place.

use regex::Regex;
use std::sync::LazyLock;

static OUTPUT_DIRECTIVE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<#@\s*output(?:\s+encoding="([.a-z0-9- ]*)")?(?:\s+extension="([.a-z0-9- ]*)")?(?:\s+encoding="([.a-z0-9- ]*)")?\s*#>"#,
    )
    .expect("Invalid output directive regex")
});

/// Attributes read from a template's `output` directive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputDirective {
    /// Requested extension, already normalized to a leading `.` (or empty).
    pub extension: Option<String>,
    /// Requested output encoding, verbatim.
    pub encoding: Option<String>,
}

impl OutputDirective {
    /// The extension this directive selects, falling back to `default`.
    pub fn extension_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.extension.as_deref().unwrap_or(default)
    }
}

/// Scan template text for an `output` directive.
///
/// Returns an empty [`OutputDirective`] when no directive is found.
pub fn scan(content: &str) -> OutputDirective {
    let Some(caps) = OUTPUT_DIRECTIVE_REGEX.captures(content) else {
        return OutputDirective::default();
    };

    let extension = caps.get(2).map(|m| normalize_extension(m.as_str()));
    let encoding = caps
        .get(1)
        .or_else(|| caps.get(3))
        .map(|m| m.as_str().to_string());

    OutputDirective {
        extension,
        encoding,
    }
}

/// Resolve the output extension for a template.
///
/// # Examples
///
/// ```
/// use t4gen::directive::resolve_extension;
///
/// assert_eq!(resolve_extension(r#"<#@ output extension="txt" #>"#, ".cs"), ".txt");
/// assert_eq!(resolve_extension("no directive here", ".cs"), ".cs");
/// ```
pub fn resolve_extension(content: &str, default: &str) -> String {
    scan(content).extension_or(default).to_string()
}

/// Prepend a `.` unless the value is empty or already has one.
fn normalize_extension(value: &str) -> String {
    if value.is_empty() || value.starts_with('.') {
        value.to_string()
    } else {
        format!(".{}", value)
    }
}
