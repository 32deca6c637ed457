//! Multi-file merging: vertical stacking and two-file joins.
//!
//! A `Merger` owns a registry of loaded files plus running totals. Files
//! are added one at a time, analyzed together, then merged in insertion
//! order.

mod analysis;
mod horizontal;
mod preview;
mod registry;
mod report;
mod vertical;

use std::io::Read;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::CoreConfig;
use crate::error::AppError;
use crate::ingest::{load_path, load_reader, LoadOptions, LoadedFile};
use crate::progress::{self, ProgressSink};
use crate::table::{JoinType, Table};

pub use analysis::{ColumnAnalysis, FileSummary, MergeAnalysis, MergeFeasibility};
pub use horizontal::{merge_horizontal, LEFT_SUFFIX, RIGHT_SUFFIX};
pub use preview::{MergePreview, PreviewStats, VERTICAL_ROWS_PER_FILE};
pub use registry::FileRegistry;
pub use report::{MergeReport, ReportResult, ReportedFile};
pub use vertical::{merge_vertical, merge_vertical_with_progress, output_columns};

/// Column naming each row's origin file in a vertical merge.
pub const SOURCE_COLUMN: &str = "_source_file";

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeType {
    Vertical,
    Horizontal,
}

/// Column set used when stacking files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnsMode {
    #[default]
    Union,
    Intersection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerticalOptions {
    pub columns_mode: ColumnsMode,
    pub include_source: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HorizontalOptions {
    pub join_columns: Vec<String>,
    pub join_type: JoinType,
}

/// A merge request, tagged by `merge_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "merge_type", rename_all = "lowercase")]
pub enum MergeOptions {
    Vertical(VerticalOptions),
    Horizontal(HorizontalOptions),
}

impl Default for MergeOptions {
    fn default() -> Self {
        MergeOptions::Vertical(VerticalOptions::default())
    }
}

impl MergeOptions {
    pub fn merge_type(&self) -> MergeType {
        match self {
            MergeOptions::Vertical(_) => MergeType::Vertical,
            MergeOptions::Horizontal(_) => MergeType::Horizontal,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Merger
// ─────────────────────────────────────────────────────────────────────────────

/// Registered files plus running totals.
#[derive(Debug, Clone)]
pub struct Merger {
    registry: FileRegistry,
    total_rows: usize,
    total_size: u64,
    load_options: LoadOptions,
    preview_rows: usize,
}

impl Default for Merger {
    fn default() -> Self {
        Self::with_config(&CoreConfig::default())
    }
}

impl Merger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &CoreConfig) -> Self {
        Self {
            registry: FileRegistry::new(),
            total_rows: 0,
            total_size: 0,
            load_options: config.load_options(),
            preview_rows: config.preview_rows,
        }
    }

    pub fn registry(&self) -> &FileRegistry {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Loads `path` and registers it under `id`, or `file_{n+1}` if none.
    ///
    /// # Errors
    ///
    /// - Any ingestion error (`Io`, `Decode`, `CsvInvalid`).
    /// - `AppError::InvalidParameter` if `id` is already registered.
    pub fn add(&mut self, path: &Path, id: Option<&str>) -> Result<(String, &LoadedFile), AppError> {
        self.ensure_id_free(id)?;
        let file = load_path(path, &self.load_options)?;
        self.add_loaded(file, id)
    }

    /// Like `add`, reading from a stream named `name`.
    pub fn add_reader<R: Read>(
        &mut self,
        name: &str,
        reader: R,
        id: Option<&str>,
    ) -> Result<(String, &LoadedFile), AppError> {
        self.ensure_id_free(id)?;
        let file = load_reader(name, reader, &self.load_options)?;
        self.add_loaded(file, id)
    }

    /// Registers an already loaded file.
    pub fn add_loaded(
        &mut self,
        file: LoadedFile,
        id: Option<&str>,
    ) -> Result<(String, &LoadedFile), AppError> {
        let id = match id {
            Some(id) => id.to_string(),
            None => self.registry.next_id(),
        };
        let rows = file.row_count();
        let size = file.size_bytes();
        debug!(id = %id, file = %file.name(), rows, size, "Registering merge input");

        self.registry.insert(id.clone(), file)?;
        self.total_rows += rows;
        self.total_size += size;

        let file = self
            .registry
            .get(&id)
            .ok_or_else(|| AppError::Internal(format!("File '{}' vanished after insert", id)))?;
        Ok((id, file))
    }

    fn ensure_id_free(&self, id: Option<&str>) -> Result<(), AppError> {
        match id {
            Some(id) if self.registry.contains(id) => Err(AppError::InvalidParameter(format!(
                "File id '{}' is already registered",
                id
            ))),
            _ => Ok(()),
        }
    }

    fn require_files(&self) -> Result<(), AppError> {
        if self.registry.is_empty() {
            return Err(AppError::NoFiles {
                required: 1,
                registered: 0,
            });
        }
        Ok(())
    }

    /// Two tables for a join, in insertion order.
    fn join_pair(&self) -> Result<(&LoadedFile, &LoadedFile), AppError> {
        self.require_files()?;
        let mut files = self.registry.files();
        match (files.next(), files.next(), files.next()) {
            (Some(left), Some(right), None) => Ok((left, right)),
            _ => Err(AppError::UnsupportedOperation(format!(
                "Horizontal merge supports exactly 2 files, {} registered",
                self.registry.len()
            ))),
        }
    }

    /// Column compatibility across every registered file.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NoFiles` if nothing is registered.
    pub fn analyze(&self) -> Result<MergeAnalysis, AppError> {
        self.require_files()?;
        Ok(analysis::analyze_registry(&self.registry))
    }

    /// Stacks every registered file in insertion order.
    pub fn execute_vertical(&self, options: &VerticalOptions) -> Result<Table, AppError> {
        self.stack(options, None)
    }

    fn stack(
        &self,
        options: &VerticalOptions,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<Table, AppError> {
        self.require_files()?;
        let sources: Vec<(&str, &Table)> = self
            .registry
            .files()
            .map(|f| (f.name(), f.table()))
            .collect();
        Ok(merge_vertical_with_progress(&sources, options, progress))
    }

    /// Joins the two registered files.
    ///
    /// # Errors
    ///
    /// - `AppError::NoFiles` if nothing is registered.
    /// - `AppError::UnsupportedOperation` unless exactly two files are
    ///   registered.
    /// - `AppError::InvalidColumns` for empty or absent join columns.
    /// - `AppError::MergeFailed` if the key columns cannot be compared.
    pub fn execute_horizontal(&self, options: &HorizontalOptions) -> Result<Table, AppError> {
        self.join(options, None)
    }

    fn join(
        &self,
        options: &HorizontalOptions,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<Table, AppError> {
        let (left, right) = self.join_pair()?;
        let joined = merge_horizontal(left.table(), right.table(), options)?;
        progress::report(
            progress,
            1,
            1,
            &format!("Joined {} and {}", left.name(), right.name()),
        );
        Ok(joined)
    }

    pub fn execute(&self, options: &MergeOptions) -> Result<Table, AppError> {
        self.execute_with_progress(options, None)
    }

    /// `execute`, reporting to `progress` once per file stacked, or once
    /// when a join completes.
    pub fn execute_with_progress(
        &self,
        options: &MergeOptions,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<Table, AppError> {
        let merged = match options {
            MergeOptions::Vertical(opts) => self.stack(opts, progress)?,
            MergeOptions::Horizontal(opts) => self.join(opts, progress)?,
        };
        info!(
            merge_type = ?options.merge_type(),
            files = self.registry.len(),
            rows = merged.row_count(),
            columns = merged.column_count(),
            "Merge executed"
        );
        Ok(merged)
    }

    /// Runs the merge over the first `rows` rows of each file (the
    /// configured preview size when `None`).
    pub fn preview(&self, options: &MergeOptions, rows: Option<usize>) -> Result<MergePreview, AppError> {
        let limit = rows.unwrap_or(self.preview_rows);
        match options {
            MergeOptions::Vertical(opts) => {
                self.require_files()?;
                let heads: Vec<(&str, Table)> = self
                    .registry
                    .files()
                    .map(|f| (f.name(), f.table().head(limit.min(VERTICAL_ROWS_PER_FILE))))
                    .collect();
                let sources: Vec<(&str, &Table)> =
                    heads.iter().map(|(name, table)| (*name, table)).collect();
                let sample = merge_vertical(&sources, opts);
                let stats = PreviewStats::Vertical {
                    total_rows_after_merge: self.total_rows,
                    total_columns: sample.column_count(),
                    columns_mode: opts.columns_mode,
                    include_source: opts.include_source,
                };
                Ok(MergePreview::new(&sample, limit, stats))
            }
            MergeOptions::Horizontal(opts) => {
                let (left, right) = self.join_pair()?;
                let sample =
                    merge_horizontal(&left.table().head(limit), &right.table().head(limit), opts)?;
                let stats = PreviewStats::Horizontal {
                    join_type: opts.join_type,
                    join_columns: opts.join_columns.clone(),
                    preview_rows: limit,
                    total_columns: sample.column_count(),
                };
                Ok(MergePreview::new(&sample, limit, stats))
            }
        }
    }

    /// Describes a finished merge.
    pub fn report(&self, merge_type: MergeType, merged: &Table, output: Option<&Path>) -> MergeReport {
        MergeReport {
            merge_timestamp: Utc::now(),
            merge_type,
            files_merged: self
                .registry
                .files()
                .map(|f| ReportedFile {
                    name: f.name().to_string(),
                    rows: f.row_count(),
                    columns: f.table().column_count(),
                    size_bytes: f.size_bytes(),
                })
                .collect(),
            result: ReportResult {
                total_rows: merged.row_count(),
                total_columns: merged.column_count(),
                output_file: output.map(|p| p.display().to_string()),
            },
        }
    }
}
