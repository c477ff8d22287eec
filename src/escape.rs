//! Command-line argument escaping for the template processor.
//!
//! The processor is launched directly (no shell), so the only quoting that
//! matters is the one the process launcher applies when it splits a single
//! command line back into argv: double quotes delimit an argument, `\\` is a
//! literal backslash and `\"` a literal quote.

use crate::error::{GenerationError, Result};

/// Quote and join arguments into a single command line.
///
/// Each argument is wrapped in double quotes. Backslashes are doubled before
/// quotes are escaped so the backslashes added for quotes are not doubled again.
///
/// # Examples
///
/// ```
/// use t4gen::escape::escape_arguments;
///
/// let line = escape_arguments(["-o", r#"C:\out "x".cs"#]);
/// assert_eq!(line, r#""-o" "C:\\out \"x\".cs""#);
/// ```
pub fn escape_arguments<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = String::new();

    for arg in args {
        if !line.is_empty() {
            line.push(' ');
        }
        line.push('"');
        line.push_str(&arg.as_ref().replace('\\', "\\\\").replace('"', "\\\""));
        line.push('"');
    }

    line
}

/// Split a command line back into arguments.
///
/// Used to turn an escaped line into argv on platforms whose process API takes
/// an argument vector, and to parse `extra_args` from config.
pub fn split_arguments(line: &str) -> Result<Vec<String>> {
    shell_words::split(line).map_err(|e| {
        GenerationError::UserError(format!(
            "failed to parse arguments '{}': {}\n\
             Fix: check for unmatched quotes or invalid escape sequences.",
            line, e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments_are_quoted_and_space_joined() {
        assert_eq!(
            escape_arguments(["-o", "out.cs", "-I", "dir"]),
            r#""-o" "out.cs" "-I" "dir""#
        );
    }

    #[test]
    fn test_empty_sequence_is_empty_line() {
        assert_eq!(escape_arguments(Vec::<String>::new()), "");
    }

    #[test]
    fn test_backslashes_escaped_before_quotes() {
        // A quote becomes \" and must not turn into \\" afterwards.
        assert_eq!(escape_arguments([r#"a"b"#]), r#""a\"b""#);
        assert_eq!(escape_arguments([r#"a\"b"#]), r#""a\\\"b""#);
        assert_eq!(escape_arguments([r"trailing\"]), r#""trailing\\""#);
    }

    #[test]
    fn test_escape_then_split_restores_arguments() {
        let args = vec![
            "-o".to_string(),
            r"C:\Users\me\AppData\Local\Temp\tmp0123.cs".to_string(),
            r#"quote"inside"#.to_string(),
            r#"both\"mixed\\"#.to_string(),
            "with space".to_string(),
            String::new(),
            "$HOME *.tt".to_string(),
        ];

        let line = escape_arguments(&args);
        assert_eq!(split_arguments(&line).unwrap(), args);
    }

    #[test]
    fn test_split_rejects_unmatched_quote() {
        let err = split_arguments("\"unterminated").unwrap_err();
        assert!(err.to_string().contains("failed to parse arguments"));
    }
}
