//! Atomic file writer with automatic cleanup on failure.
//!
//! Writes to a temporary file in the same directory as the destination,
//! then atomically replaces the destination on `finish()`. If dropped
//! before finishing, the temporary file is automatically cleaned up.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::AppError;

/// An atomic writer for CSV outputs, archives and reports.
///
/// The underlying sink is seekable so archive writers can patch headers.
/// Nothing is visible at the final path until `finish()` succeeds.
pub struct AtomicFileWriter {
    writer: BufWriter<NamedTempFile>,
    final_path: PathBuf,
}

impl std::fmt::Debug for AtomicFileWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicFileWriter")
            .field("final_path", &self.final_path)
            .finish()
    }
}

impl AtomicFileWriter {
    /// Creates a new atomic writer targeting the specified path.
    ///
    /// The temporary file is created in the same directory as `final_path`
    /// to ensure atomic persistence (same filesystem requirement).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the parent directory cannot be determined
    /// or the temporary file cannot be created.
    pub fn new(final_path: impl AsRef<Path>) -> Result<Self, AppError> {
        let final_path = final_path.as_ref().to_path_buf();

        let parent_dir = final_path.parent().ok_or_else(|| {
            AppError::Io(format!(
                "Cannot determine parent directory for: {}",
                final_path.display()
            ))
        })?;
        let parent_dir = if parent_dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent_dir
        };

        let temp_file = NamedTempFile::new_in(parent_dir)
            .map_err(|e| AppError::Io(format!("Failed to create temporary file: {}", e)))?;

        Ok(Self {
            writer: BufWriter::new(temp_file),
            final_path,
        })
    }

    /// Returns the destination this writer will persist to.
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Returns a mutable reference to the underlying buffered sink.
    pub fn writer_mut(&mut self) -> &mut BufWriter<NamedTempFile> {
        &mut self.writer
    }

    /// Takes the buffered sink out, for writers that need ownership (zip).
    /// Hand it back through `finish_with`.
    pub fn into_parts(self) -> (BufWriter<NamedTempFile>, PathBuf) {
        (self.writer, self.final_path)
    }

    /// Flushes all buffers and atomically persists the file to the final path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if flushing or persisting fails. On error, the
    /// temporary file is cleaned up automatically.
    pub fn finish(self) -> Result<PathBuf, AppError> {
        Self::finish_with(self.writer, self.final_path)
    }

    /// Persists a sink previously taken with `into_parts`.
    pub fn finish_with(
        writer: BufWriter<NamedTempFile>,
        final_path: PathBuf,
    ) -> Result<PathBuf, AppError> {
        let named_temp = writer
            .into_inner()
            .map_err(|e| AppError::Io(format!("Failed to flush buffer: {}", e.error())))?;

        named_temp.as_file().sync_all().map_err(|e| {
            AppError::Io(format!("Failed to sync {}: {}", final_path.display(), e))
        })?;

        named_temp.persist(&final_path).map_err(|e| {
            AppError::Io(format!(
                "Failed to persist file to {}: {}",
                final_path.display(),
                e.error
            ))
        })?;

        Ok(final_path)
    }
}

/// Writes `bytes` to `path` atomically.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<PathBuf, AppError> {
    let mut writer = AtomicFileWriter::new(path)?;
    writer
        .writer_mut()
        .write_all(bytes)
        .map_err(|e| AppError::Io(format!("Failed to write {}: {}", path.display(), e)))?;
    writer.finish()
}
