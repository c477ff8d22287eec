//! Temporary output files for the template processor.
//!
//! Every generation gets its own `tmp<uuid><ext>` path in the temp directory.
//! The processor writes its output there; [`TempOutput`] removes the file when
//! it goes out of scope so no exit path leaks files into the temp directory.

use crate::error::{GenerationError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A temp output path owned by a single generation.
///
/// The file itself is not created here; the processor creates it. Dropping the
/// guard deletes the file if it exists.
#[derive(Debug)]
pub struct TempOutput {
    path: PathBuf,
    removed: bool,
}

impl TempOutput {
    /// Path handed to the processor as its output file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now, reporting failures other than "not found".
    pub fn remove(mut self) -> Result<()> {
        self.removed = true;
        remove_if_exists(&self.path)
    }
}

impl Drop for TempOutput {
    fn drop(&mut self) {
        if !self.removed {
            let _ = remove_if_exists(&self.path);
        }
    }
}

/// Allocate a temp output path in the platform temp directory.
pub fn allocate(extension: &str) -> Result<TempOutput> {
    allocate_in(&std::env::temp_dir(), extension)
}

/// Allocate a temp output path in `dir`, creating the directory if needed.
///
/// # Returns
///
/// * `Ok(TempOutput)` - A unique, not-yet-existing path ending in `extension`
/// * `Err(GenerationError::Io)` - If the directory could not be created
pub fn allocate_in(dir: &Path, extension: &str) -> Result<TempOutput> {
    fs::create_dir_all(dir)
        .map_err(|e| GenerationError::io("failed to create temp directory", dir, e))?;

    let name = format!("tmp{}{}", Uuid::new_v4().simple(), extension);

    Ok(TempOutput {
        path: dir.join(name),
        removed: false,
    })
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(GenerationError::io("failed to delete temp output", path, e)),
    }
}
