//! Row-wise stacking of registered files.

use crate::progress::{self, ProgressSink};
use crate::table::{concat_each, Table, Value};

use super::{ColumnsMode, VerticalOptions, SOURCE_COLUMN};

/// Output schema for stacking `tables`.
///
/// Union keeps every column in first-appearance order; intersection keeps
/// the columns every table shares, in the first table's order.
pub fn output_columns(tables: &[&Table], mode: ColumnsMode) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    match mode {
        ColumnsMode::Union => {
            for table in tables {
                for name in table.columns() {
                    if !columns.contains(name) {
                        columns.push(name.clone());
                    }
                }
            }
        }
        ColumnsMode::Intersection => {
            if let Some((first, rest)) = tables.split_first() {
                columns = first
                    .columns()
                    .iter()
                    .filter(|name| rest.iter().all(|t| t.has_column(name)))
                    .cloned()
                    .collect();
            }
        }
    }
    columns
}

/// Stacks `sources` (display name, table) in order.
///
/// With `include_source`, a `_source_file` column naming each row's file
/// is placed last, after the column set has been narrowed.
pub fn merge_vertical(sources: &[(&str, &Table)], options: &VerticalOptions) -> Table {
    merge_vertical_with_progress(sources, options, None)
}

/// `merge_vertical`, reporting to `progress` once per file stacked.
pub fn merge_vertical_with_progress(
    sources: &[(&str, &Table)],
    options: &VerticalOptions,
    progress: Option<&dyn ProgressSink>,
) -> Table {
    let tables: Vec<&Table> = sources.iter().map(|(_, table)| *table).collect();
    let mut columns = output_columns(&tables, options.columns_mode);
    if options.include_source {
        columns.retain(|name| name != SOURCE_COLUMN);
    }

    let total = sources.len() as u64;
    let merged = concat_each(&tables, &columns, |idx| {
        let name = sources.get(idx).map_or("", |(name, _)| *name);
        progress::report(progress, idx as u64 + 1, total, &format!("Stacked {}", name));
    });
    if !options.include_source {
        return merged;
    }

    let origins: Vec<Value> = sources
        .iter()
        .flat_map(|(name, table)| {
            std::iter::repeat(Value::Str((*name).to_string())).take(table.row_count())
        })
        .collect();
    merged.with_column(SOURCE_COLUMN, origins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::testing::RecordingProgress;

    fn people() -> Table {
        Table::from_rows(
            vec!["id".into(), "name".into()],
            vec![
                vec![Value::Int(1), "Ana".into()],
                vec![Value::Int(2), "Bo".into()],
            ],
        )
    }

    fn contacts() -> Table {
        Table::from_rows(
            vec!["email".into(), "id".into()],
            vec![vec!["c@x.io".into(), Value::Int(3)]],
        )
    }

    #[test]
    fn test_union_fills_missing_with_null() {
        let (a, b) = (people(), contacts());
        let merged = merge_vertical(&[("a.csv", &a), ("b.csv", &b)], &VerticalOptions::default());
        assert_eq!(merged.columns(), &["id", "name", "email"]);
        assert_eq!(merged.row_count(), 3);
        assert_eq!(
            merged.rows()[2],
            vec![Value::Int(3), Value::Null, Value::Str("c@x.io".into())]
        );
        assert_eq!(merged.rows()[0][2], Value::Null);
    }

    #[test]
    fn test_intersection_with_source_column() {
        let (a, b) = (people(), contacts());
        let options = VerticalOptions {
            columns_mode: ColumnsMode::Intersection,
            include_source: true,
        };
        let merged = merge_vertical(&[("a.csv", &a), ("b.csv", &b)], &options);
        assert_eq!(merged.columns(), &["id", "_source_file"]);
        let origins: Vec<&Value> = merged.column_values(1).collect();
        assert_eq!(
            origins,
            vec![
                &Value::Str("a.csv".into()),
                &Value::Str("a.csv".into()),
                &Value::Str("b.csv".into())
            ]
        );
    }

    #[test]
    fn test_row_count_conserved_in_every_mode() {
        let (a, b) = (people(), contacts());
        for mode in [ColumnsMode::Union, ColumnsMode::Intersection] {
            for include_source in [false, true] {
                let options = VerticalOptions {
                    columns_mode: mode,
                    include_source,
                };
                let merged = merge_vertical(&[("a", &a), ("b", &b), ("a2", &a)], &options);
                assert_eq!(merged.row_count(), 5);
            }
        }
    }

    #[test]
    fn test_existing_source_column_not_duplicated() {
        let tagged = people().with_constant_column(SOURCE_COLUMN, "old".into());
        let options = VerticalOptions {
            columns_mode: ColumnsMode::Union,
            include_source: true,
        };
        let merged = merge_vertical(&[("new.csv", &tagged)], &options);
        assert_eq!(merged.columns(), &["id", "name", "_source_file"]);
        assert_eq!(merged.rows()[0][2], Value::Str("new.csv".into()));
    }

    #[test]
    fn test_progress_reported_per_stacked_file() {
        let (a, b) = (people(), contacts());
        let progress = RecordingProgress::default();
        let merged = merge_vertical_with_progress(
            &[("a.csv", &a), ("b.csv", &b)],
            &VerticalOptions::default(),
            Some(&progress),
        );
        assert_eq!(merged.row_count(), 3);
        assert_eq!(
            progress.snapshot(),
            vec![
                (1, 2, "Stacked a.csv".to_string()),
                (2, 2, "Stacked b.csv".to_string()),
            ]
        );
    }
}
