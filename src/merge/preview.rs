//! Fast approximate merge previews over truncated inputs.
//!
//! Previews run the real merge over the first rows of each file only, so a
//! horizontal preview can miss matches that lie further down either file.
//! Preview counts are not guaranteed to equal full-execution counts.

use serde::Serialize;

use crate::table::{JoinType, Record, Table};

use super::{ColumnsMode, MergeType};

/// Rows each file contributes to a vertical preview, at most.
pub const VERTICAL_ROWS_PER_FILE: usize = 5;

/// Mode-specific figures shown alongside a preview.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "merge_type", rename_all = "lowercase")]
pub enum PreviewStats {
    Vertical {
        total_rows_after_merge: usize,
        total_columns: usize,
        columns_mode: ColumnsMode,
        include_source: bool,
    },
    Horizontal {
        join_type: JoinType,
        join_columns: Vec<String>,
        preview_rows: usize,
        total_columns: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergePreview {
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
    pub stats: PreviewStats,
}

impl MergePreview {
    pub(crate) fn new(sample: &Table, limit: usize, stats: PreviewStats) -> Self {
        Self {
            columns: sample.columns().to_vec(),
            rows: sample.head(limit).records(),
            stats,
        }
    }

    pub fn merge_type(&self) -> MergeType {
        match self.stats {
            PreviewStats::Vertical { .. } => MergeType::Vertical,
            PreviewStats::Horizontal { .. } => MergeType::Horizontal,
        }
    }
}
