//! Post-merge JSON report.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::streaming::write_atomic;

use super::MergeType;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportedFile {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportResult {
    pub total_rows: usize,
    pub total_columns: usize,
    pub output_file: Option<String>,
}

/// What was merged, how, and what came out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeReport {
    pub merge_timestamp: DateTime<Utc>,
    pub merge_type: MergeType,
    pub files_merged: Vec<ReportedFile>,
    pub result: ReportResult,
}

impl MergeReport {
    pub fn to_json(&self) -> Result<String, AppError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Internal(format!("Failed to serialize merge report: {}", e)))
    }

    /// Writes the report as pretty JSON. The file appears complete or not
    /// at all.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<PathBuf, AppError> {
        let json = self.to_json()?;
        write_atomic(path, json.as_bytes())
    }
}
