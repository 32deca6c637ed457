//! Duplicate detection and resolution.
//!
//! Rows are grouped by exact typed equality over the key columns (nulls
//! group together). `analyze` reports what would be removed; `resolve`
//! keeps one survivor per group and returns the survivors in their
//! original relative order.

mod groups;
mod strategy;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::AppError;
use crate::progress::{self, ProgressSink};
use crate::table::{Record, Table};

pub use groups::{duplicate_groups, group_rows, DuplicateGroup};
pub use strategy::DedupStrategy;

/// Groups included in an analysis preview.
pub const PREVIEW_GROUPS: usize = 5;

/// Sample rows shown per previewed group.
pub const PREVIEW_SAMPLE_ROWS: usize = 3;

/// Progress updates reported by `resolve_with_progress`.
pub const RESOLVE_PHASES: u64 = 3;

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// Caller-facing dedup request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupOptions {
    pub key_columns: Vec<String>,
    #[serde(default = "default_keep_strategy")]
    pub keep_strategy: String,
    #[serde(default)]
    pub strategy_column: Option<String>,
}

fn default_keep_strategy() -> String {
    "first".to_string()
}

impl DedupOptions {
    pub fn new(key_columns: Vec<String>) -> Self {
        Self {
            key_columns,
            keep_strategy: default_keep_strategy(),
            strategy_column: None,
        }
    }

    pub fn keep(mut self, strategy: &str, column: Option<&str>) -> Self {
        self.keep_strategy = strategy.to_string();
        self.strategy_column = column.map(str::to_string);
        self
    }

    /// # Errors
    ///
    /// Returns `AppError::InvalidParameter` for an unknown strategy or a
    /// missing strategy column.
    pub fn strategy(&self) -> Result<DedupStrategy, AppError> {
        DedupStrategy::from_name(&self.keep_strategy, self.strategy_column.as_deref())
    }
}

/// One duplicate group as shown in an analysis preview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupPreview {
    pub duplicate_values: Record,
    pub occurrences: usize,
    pub sample_rows: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateAnalysis {
    pub total_duplicate_rows: usize,
    pub group_count: usize,
    pub rows_to_remove: usize,
    pub preview: Vec<GroupPreview>,
}

impl DuplicateAnalysis {
    pub fn has_duplicates(&self) -> bool {
        self.group_count > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DedupStats {
    pub original_rows: usize,
    pub cleaned_rows: usize,
    pub rows_removed: usize,
    pub removal_percentage: f64,
}

impl DedupStats {
    fn new(original_rows: usize, cleaned_rows: usize) -> Self {
        let rows_removed = original_rows - cleaned_rows;
        let removal_percentage = if original_rows == 0 {
            0.0
        } else {
            ((rows_removed as f64 / original_rows as f64) * 10_000.0).round() / 100.0
        };
        Self {
            original_rows,
            cleaned_rows,
            rows_removed,
            removal_percentage,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Counts duplicates over `key_columns` without changing anything.
///
/// # Errors
///
/// Returns `AppError::InvalidColumns` if `key_columns` is empty or names a
/// column the table lacks.
pub fn analyze(table: &Table, key_columns: &[String]) -> Result<DuplicateAnalysis, AppError> {
    let keys = resolve_key_columns(table, key_columns)?;
    let groups = duplicate_groups(table, &keys);

    let total_duplicate_rows: usize = groups.iter().map(DuplicateGroup::len).sum();
    let group_count = groups.len();

    let preview = groups
        .iter()
        .take(PREVIEW_GROUPS)
        .map(|group| GroupPreview {
            duplicate_values: Record(
                key_columns
                    .iter()
                    .cloned()
                    .zip(group.key.iter().cloned())
                    .collect(),
            ),
            occurrences: group.len(),
            sample_rows: group
                .rows
                .iter()
                .take(PREVIEW_SAMPLE_ROWS)
                .map(|&row| table.row_record(row))
                .collect(),
        })
        .collect();

    debug!(
        keys = ?key_columns,
        group_count,
        total_duplicate_rows,
        "Analyzed duplicates"
    );

    Ok(DuplicateAnalysis {
        total_duplicate_rows,
        group_count,
        rows_to_remove: total_duplicate_rows - group_count,
        preview,
    })
}

/// Keeps one row per duplicate group, chosen by `strategy`.
///
/// Survivors keep their original relative order; the title line and
/// column types carry over unchanged.
///
/// # Errors
///
/// - `AppError::InvalidColumns` if `key_columns` is empty, or it or the
///   strategy column names a column the table lacks.
pub fn resolve(
    table: &Table,
    key_columns: &[String],
    strategy: &DedupStrategy,
) -> Result<(Table, DedupStats), AppError> {
    resolve_with_progress(table, key_columns, strategy, None)
}

/// `resolve`, reporting to `progress` after each phase: grouping, survivor
/// selection, and building the cleaned table.
pub fn resolve_with_progress(
    table: &Table,
    key_columns: &[String],
    strategy: &DedupStrategy,
    progress: Option<&dyn ProgressSink>,
) -> Result<(Table, DedupStats), AppError> {
    let keys = resolve_key_columns(table, key_columns)?;
    let selector = strategy.bind(table)?;

    let groups = group_rows(table, &keys);
    progress::report(
        progress,
        1,
        RESOLVE_PHASES,
        &format!("Grouped {} rows into {} keys", table.row_count(), groups.len()),
    );

    let mut survivors: Vec<usize> = groups
        .iter()
        .filter_map(|group| selector.survivor(&group.rows))
        .collect();
    survivors.sort_unstable();
    progress::report(
        progress,
        2,
        RESOLVE_PHASES,
        &format!("Selected {} survivors", survivors.len()),
    );

    let cleaned = table.take_rows(&survivors);
    let stats = DedupStats::new(table.row_count(), cleaned.row_count());
    progress::report(progress, RESOLVE_PHASES, RESOLVE_PHASES, "Built cleaned table");

    info!(
        strategy = %strategy,
        original_rows = stats.original_rows,
        rows_removed = stats.rows_removed,
        "Resolved duplicates"
    );

    Ok((cleaned, stats))
}

/// `resolve` driven by caller-facing options.
pub fn resolve_with(table: &Table, options: &DedupOptions) -> Result<(Table, DedupStats), AppError> {
    let strategy = options.strategy()?;
    resolve(table, &options.key_columns, &strategy)
}

fn resolve_key_columns(table: &Table, key_columns: &[String]) -> Result<Vec<usize>, AppError> {
    if key_columns.is_empty() {
        return Err(AppError::invalid_columns(Vec::<String>::new()));
    }
    table.require_columns(key_columns)
}
