//! Two-file relational join.

use crate::error::AppError;
use crate::table::{join, Suffixes, Table};

use super::HorizontalOptions;

/// Suffix for overlapping non-key columns from the first file.
pub const LEFT_SUFFIX: &str = "_file1";
/// Suffix for overlapping non-key columns from the second file.
pub const RIGHT_SUFFIX: &str = "_file2";

/// Joins `left` and `right` on `options.join_columns`.
///
/// # Errors
///
/// - `AppError::InvalidColumns` if no join columns are given or one is
///   missing from either table.
/// - `AppError::MergeFailed` if the key columns cannot be compared.
pub fn merge_horizontal(
    left: &Table,
    right: &Table,
    options: &HorizontalOptions,
) -> Result<Table, AppError> {
    join(
        left,
        right,
        &options.join_columns,
        options.join_type,
        Suffixes {
            left: LEFT_SUFFIX,
            right: RIGHT_SUFFIX,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{JoinType, Value};

    fn file_a() -> Table {
        Table::from_rows(
            vec!["id".into(), "x".into(), "note".into()],
            vec![
                vec![Value::Int(1), "a".into(), "l1".into()],
                vec![Value::Int(2), "b".into(), "l2".into()],
            ],
        )
    }

    fn file_b() -> Table {
        Table::from_rows(
            vec!["id".into(), "y".into(), "note".into()],
            vec![
                vec![Value::Int(1), "p".into(), "r1".into()],
                vec![Value::Int(3), "q".into(), "r3".into()],
            ],
        )
    }

    fn options(join_type: JoinType) -> HorizontalOptions {
        HorizontalOptions {
            join_columns: vec!["id".into()],
            join_type,
        }
    }

    #[test]
    fn test_overlapping_columns_get_file_suffixes() {
        let merged = merge_horizontal(&file_a(), &file_b(), &options(JoinType::Inner)).unwrap();
        assert_eq!(merged.columns(), &["id", "x", "note_file1", "y", "note_file2"]);
        assert_eq!(merged.row_count(), 1);
    }

    #[test]
    fn test_outer_join_keeps_both_sides() {
        let merged = merge_horizontal(&file_a(), &file_b(), &options(JoinType::Outer)).unwrap();
        assert_eq!(merged.row_count(), 3);
    }

    #[test]
    fn test_empty_join_columns_rejected() {
        let opts = HorizontalOptions::default();
        assert!(matches!(
            merge_horizontal(&file_a(), &file_b(), &opts),
            Err(AppError::InvalidColumns { .. })
        ));
    }
}
