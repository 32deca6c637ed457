//! Row-bounded splitting of a table into fragments.
//!
//! Fragment `i` (zero-based) covers rows `[i * max_rows, min((i + 1) * max_rows, n))`.
//! Fragments carry the source title, so each serialized part starts with
//! the same title line and concatenating them in order rebuilds the input.

mod archive;

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_MAX_ROWS;
use crate::error::AppError;
use crate::table::Table;

pub use archive::{split_to_archive, write_archive};

/// Split settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitOptions {
    /// Maximum data rows per fragment (header and title excluded).
    pub max_rows: usize,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

impl SplitOptions {
    pub fn new(max_rows: usize) -> Self {
        Self { max_rows }
    }
}

/// What a split produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitSummary {
    pub total_rows: usize,
    pub parts: usize,
    /// Archive entry names, in fragment order.
    pub part_names: Vec<String>,
    /// Data rows per fragment (parallel to `part_names`).
    pub rows_per_part: Vec<usize>,
}

/// Number of fragments `row_count` rows produce at `max_rows` per fragment.
pub fn fragment_count(row_count: usize, max_rows: usize) -> usize {
    if max_rows == 0 {
        return 0;
    }
    row_count.div_ceil(max_rows)
}

/// Archive entry name of fragment `index` (zero-based) out of `total`.
pub fn fragment_name(index: usize, total: usize) -> String {
    format!("part_{}_of_{}.csv", index + 1, total)
}

/// Partitions `table` into consecutive windows of at most `max_rows` rows.
///
/// An empty table yields no fragments.
///
/// # Errors
///
/// Returns `AppError::InvalidParameter` if `max_rows` is zero.
pub fn split(table: &Table, max_rows: usize) -> Result<Vec<Table>, AppError> {
    if max_rows == 0 {
        return Err(AppError::InvalidParameter(
            "max_rows must be a positive integer".into(),
        ));
    }

    let total = table.row_count();
    let count = fragment_count(total, max_rows);
    Ok((0..count)
        .map(|i| table.slice(i * max_rows..((i + 1) * max_rows).min(total)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{concat, Value};

    fn numbered(rows: usize) -> Table {
        Table::from_rows(
            vec!["n".into(), "label".into()],
            (0..rows)
                .map(|i| vec![Value::Int(i as i64), Value::Str(format!("row {}", i))])
                .collect(),
        )
        .with_title(Some("Numbers".into()))
    }

    #[test]
    fn test_zero_max_rows_rejected() {
        assert!(matches!(
            split(&numbered(3), 0),
            Err(AppError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_fragment_count_and_last_size() {
        for (rows, max_rows) in [(10, 3), (9, 3), (1, 5), (7, 1), (5, 5)] {
            let fragments = split(&numbered(rows), max_rows).unwrap();
            assert_eq!(fragments.len(), rows.div_ceil(max_rows), "{} / {}", rows, max_rows);
            let expected_last = if rows % max_rows == 0 { max_rows } else { rows % max_rows };
            assert_eq!(fragments.last().unwrap().row_count(), expected_last);
            assert!(fragments.iter().all(|f| f.row_count() <= max_rows));
        }
    }

    #[test]
    fn test_empty_table_has_no_fragments() {
        assert!(split(&numbered(0), 10).unwrap().is_empty());
    }

    #[test]
    fn test_concatenated_fragments_rebuild_table() {
        let table = numbered(11);
        let fragments = split(&table, 4).unwrap();
        let parts: Vec<&Table> = fragments.iter().collect();
        let rebuilt = concat(&parts, table.columns()).with_title(Some("Numbers".into()));
        assert_eq!(rebuilt, table);
    }

    #[test]
    fn test_fragments_keep_title() {
        let fragments = split(&numbered(5), 2).unwrap();
        assert!(fragments.iter().all(|f| f.title() == Some("Numbers")));
    }

    #[test]
    fn test_fragment_names() {
        assert_eq!(fragment_name(0, 3), "part_1_of_3.csv");
        assert_eq!(fragment_name(2, 3), "part_3_of_3.csv");
    }
}
