//! Cross-file column compatibility report.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::ingest::TextEncoding;
use crate::table::ColumnType;

use super::registry::FileRegistry;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    pub id: String,
    pub name: String,
    pub encoding: TextEncoding,
    pub rows: usize,
    pub columns: usize,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnAnalysis {
    pub total_unique_columns: usize,
    /// Every column name, in first-appearance order.
    pub all_columns: Vec<String>,
    /// Columns present in every file, in the first file's order.
    pub common_columns: Vec<String>,
    /// Column name to the ids of the files containing it.
    pub column_coverage: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeFeasibility {
    pub vertical: bool,
    pub horizontal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeAnalysis {
    pub file_count: usize,
    pub total_rows: usize,
    pub total_size_bytes: u64,
    pub files: Vec<FileSummary>,
    pub column_analysis: ColumnAnalysis,
    /// Common columns whose inferred type differs between files, types in
    /// file order. An all-empty column counts as its own `Empty` type.
    pub dtype_conflicts: BTreeMap<String, Vec<ColumnType>>,
    pub merge_feasibility: MergeFeasibility,
}

/// Builds the report for a non-empty registry.
pub(crate) fn analyze_registry(registry: &FileRegistry) -> MergeAnalysis {
    let mut all_columns: Vec<String> = Vec::new();
    let mut column_coverage: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut files = Vec::with_capacity(registry.len());

    for (id, file) in registry.iter() {
        for name in file.table().columns() {
            if !all_columns.contains(name) {
                all_columns.push(name.clone());
            }
            column_coverage
                .entry(name.clone())
                .or_default()
                .push(id.to_string());
        }
        files.push(FileSummary {
            id: id.to_string(),
            name: file.name().to_string(),
            encoding: file.encoding(),
            rows: file.row_count(),
            columns: file.table().column_count(),
            size_bytes: file.size_bytes(),
        });
    }

    let common_columns: Vec<String> = match registry.files().next() {
        Some(first) => first
            .table()
            .columns()
            .iter()
            .filter(|name| registry.files().all(|f| f.table().has_column(name)))
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    let mut dtype_conflicts = BTreeMap::new();
    for name in &common_columns {
        let mut types: Vec<ColumnType> = Vec::new();
        for file in registry.files() {
            if let Some(dtype) = file.table().dtype(name) {
                if !types.contains(&dtype) {
                    types.push(dtype);
                }
            }
        }
        if types.len() > 1 {
            dtype_conflicts.insert(name.clone(), types);
        }
    }

    let has_common = !common_columns.is_empty();
    MergeAnalysis {
        file_count: registry.len(),
        total_rows: files.iter().map(|f| f.rows).sum(),
        total_size_bytes: files.iter().map(|f| f.size_bytes).sum(),
        files,
        column_analysis: ColumnAnalysis {
            total_unique_columns: all_columns.len(),
            all_columns,
            common_columns,
            column_coverage,
        },
        dtype_conflicts,
        merge_feasibility: MergeFeasibility {
            vertical: has_common || registry.len() == 1,
            horizontal: has_common,
        },
    }
}
