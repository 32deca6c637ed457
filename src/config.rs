//! Runtime configuration for the transformation core.
//!
//! The host owns where configuration comes from; the core only needs the
//! values. `CoreConfig` deserializes from JSON with every field optional.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::ingest::LoadOptions;
use crate::split::SplitOptions;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Files larger than this are ingested in row batches (50 MB).
pub const LARGE_FILE_THRESHOLD: u64 = 50 * 1024 * 1024;

/// Rows per ingestion batch for large files.
pub const DEFAULT_BATCH_ROWS: usize = 10_000;

/// Rows taken from each input when building a merge preview.
pub const DEFAULT_PREVIEW_ROWS: usize = 10;

/// Default fragment size for the splitter.
pub const DEFAULT_MAX_ROWS: usize = 50_000;

// ─────────────────────────────────────────────────────────────────────────────
// CoreConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Tunables shared by every engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Size above which ingestion switches to batched reads.
    pub large_file_threshold_bytes: u64,
    /// Rows per batch when batched reads are active.
    pub batch_rows: usize,
    /// Rows per input used for merge previews.
    pub preview_rows: usize,
    /// Fragment size used when a split request does not name one.
    pub default_max_rows: usize,
    /// Whether a single-column first line is treated as a table title.
    pub detect_title: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            large_file_threshold_bytes: LARGE_FILE_THRESHOLD,
            batch_rows: DEFAULT_BATCH_ROWS,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            default_max_rows: DEFAULT_MAX_ROWS,
            detect_title: true,
        }
    }
}

impl CoreConfig {
    /// Parses a configuration from a JSON document. Missing keys keep defaults.
    pub fn from_json_str(json: &str) -> Result<Self, AppError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AppError::InvalidParameter(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AppError::Io(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Rejects values that would make an engine misbehave.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.batch_rows == 0 {
            return Err(AppError::InvalidParameter(
                "batch_rows must be a positive integer".into(),
            ));
        }
        if self.default_max_rows == 0 {
            return Err(AppError::InvalidParameter(
                "default_max_rows must be a positive integer".into(),
            ));
        }
        Ok(())
    }

    /// Sets the batched-read threshold.
    pub fn large_file_threshold_bytes(mut self, bytes: u64) -> Self {
        self.large_file_threshold_bytes = bytes;
        self
    }

    /// Sets the ingestion batch size.
    pub fn batch_rows(mut self, rows: usize) -> Self {
        self.batch_rows = rows;
        self
    }

    /// Sets the preview sample size.
    pub fn preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = rows;
        self
    }

    /// Enables or disables title-row detection.
    pub fn detect_title(mut self, detect: bool) -> Self {
        self.detect_title = detect;
        self
    }

    /// Ingestion options derived from this configuration.
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            detect_title: self.detect_title,
            large_file_threshold_bytes: self.large_file_threshold_bytes,
            batch_rows: self.batch_rows,
        }
    }

    /// Split options for requests that do not name a fragment size.
    pub fn split_options(&self) -> SplitOptions {
        SplitOptions::new(self.default_max_rows)
    }
}
