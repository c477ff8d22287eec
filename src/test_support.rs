//! Shared helpers for tests that need a stand-in template processor.

use std::path::{Path, PathBuf};

/// Encode one diagnostic the way the processor writes it to stderr.
pub(crate) fn frame(warning: bool, line: i32, column: i32, message: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}\n{}\n",
        if warning { "1" } else { "0" },
        line,
        column,
        message.encode_utf16().count(),
        message
    )
}

/// Write an executable `sh` script acting as the processor.
///
/// The script sees the real command line: `$2` is the output path, `$4` the
/// include directory and the last argument the template.
#[cfg(unix)]
pub(crate) fn write_processor(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-t4");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Files left in `dir` (non-recursive), sorted.
pub(crate) fn list_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    files.sort();
    files
}
