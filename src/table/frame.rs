//! The in-memory table every engine consumes and produces.

use std::ops::Range;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::AppError;

use super::value::{ColumnType, Value};

/// Ordered named columns over ordered rows.
///
/// Rows are stored row-major; every row has exactly one cell per column.
/// An optional title line (the single-column pseudo-header some exports
/// carry above the real header) travels with the table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    title: Option<String>,
    columns: Vec<String>,
    dtypes: Vec<ColumnType>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Builds a table, inferring each column type from its values.
    ///
    /// Short rows are padded with nulls and long rows truncated so the
    /// rectangular shape always holds.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows: Vec<Vec<Value>> = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        let dtypes = (0..width)
            .map(|idx| ColumnType::of_values(rows.iter().map(|row| &row[idx])))
            .collect();
        Self {
            title: None,
            columns,
            dtypes,
            rows,
        }
    }

    /// Builds a table with explicit column types (used by ingestion, where
    /// the type comes from the raw text rather than the parsed values).
    pub(crate) fn with_types(
        columns: Vec<String>,
        dtypes: Vec<ColumnType>,
        rows: Vec<Vec<Value>>,
    ) -> Self {
        debug_assert_eq!(columns.len(), dtypes.len());
        Self {
            title: None,
            columns,
            dtypes,
            rows,
        }
    }

    /// Attaches (or clears) the title line.
    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn dtypes(&self) -> &[ColumnType] {
        &self.dtypes
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Type tag of the named column.
    pub fn dtype(&self, name: &str) -> Option<ColumnType> {
        self.column_index(name).map(|idx| self.dtypes[idx])
    }

    /// Resolves column names to indices.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidColumns` naming every absent column.
    pub fn require_columns(&self, names: &[String]) -> Result<Vec<usize>, AppError> {
        let missing: Vec<&String> = names.iter().filter(|n| !self.has_column(n)).collect();
        if !missing.is_empty() {
            return Err(AppError::invalid_columns(missing.into_iter().cloned()));
        }
        Ok(names
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect())
    }

    /// Iterates the cells of one column.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |row| &row[idx])
    }

    /// A new table holding rows `range` (clamped), same schema and title.
    pub fn slice(&self, range: Range<usize>) -> Table {
        let end = range.end.min(self.rows.len());
        let start = range.start.min(end);
        Table {
            title: self.title.clone(),
            columns: self.columns.clone(),
            dtypes: self.dtypes.clone(),
            rows: self.rows[start..end].to_vec(),
        }
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> Table {
        self.slice(0..n)
    }

    /// A new table keeping only the rows at `indices`, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        Table {
            title: self.title.clone(),
            columns: self.columns.clone(),
            dtypes: self.dtypes.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Named view of one row, for previews.
    pub fn row_record(&self, idx: usize) -> Record {
        Record(
            self.columns
                .iter()
                .cloned()
                .zip(self.rows[idx].iter().cloned())
                .collect(),
        )
    }

    /// Named views of every row.
    pub fn records(&self) -> Vec<Record> {
        (0..self.rows.len()).map(|idx| self.row_record(idx)).collect()
    }

    /// Appends a column (replacing an existing one of that name).
    ///
    /// `values` is padded with nulls or truncated to the row count.
    pub fn with_column(mut self, name: &str, mut values: Vec<Value>) -> Table {
        values.resize(self.rows.len(), Value::Null);
        let dtype = ColumnType::of_values(values.iter());
        let idx = match self.column_index(name) {
            Some(idx) => {
                self.dtypes[idx] = dtype;
                idx
            }
            None => {
                self.columns.push(name.to_string());
                self.dtypes.push(dtype);
                for row in &mut self.rows {
                    row.push(Value::Null);
                }
                self.columns.len() - 1
            }
        };
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
        self
    }

    /// Appends a column holding `value` on every row.
    pub fn with_constant_column(self, name: &str, value: Value) -> Table {
        let values = vec![value; self.rows.len()];
        self.with_column(name, values)
    }

    /// Consumes the table, returning its rows.
    pub fn into_rows(self) -> Vec<Vec<Value>> {
        self.rows
    }
}

/// A row as ordered `(column, value)` pairs. Serializes as a JSON object
/// with keys in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record(pub Vec<(String, Value)>);

impl Record {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.0
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            vec!["id".into(), "name".into()],
            vec![
                vec![Value::Int(1), "a".into()],
                vec![Value::Int(2), "b".into()],
                vec![Value::Int(3)],
            ],
        )
    }

    #[test]
    fn test_from_rows_pads_and_infers() {
        let table = sample();
        assert_eq!(table.rows()[2], vec![Value::Int(3), Value::Null]);
        assert_eq!(table.dtypes(), &[ColumnType::Integer, ColumnType::Text]);
    }

    #[test]
    fn test_require_columns_reports_all_missing() {
        let err = sample()
            .require_columns(&["id".into(), "x".into(), "y".into()])
            .unwrap_err();
        match err {
            AppError::InvalidColumns { missing } => assert_eq!(missing, vec!["x", "y"]),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_column_lookup_is_case_sensitive() {
        assert!(sample().has_column("id"));
        assert!(!sample().has_column("ID"));
    }

    #[test]
    fn test_slice_clamps_and_keeps_title() {
        let table = sample().with_title(Some("Orders".into()));
        let tail = table.slice(2..10);
        assert_eq!(tail.row_count(), 1);
        assert_eq!(tail.title(), Some("Orders"));
        assert_eq!(table.slice(5..9).row_count(), 0);
    }

    #[test]
    fn test_take_rows_keeps_given_order() {
        let picked = sample().take_rows(&[2, 0]);
        assert_eq!(picked.rows()[0][0], Value::Int(3));
        assert_eq!(picked.rows()[1][0], Value::Int(1));
    }

    #[test]
    fn test_record_serializes_in_column_order() {
        let json = serde_json::to_string(&sample().row_record(0)).unwrap();
        assert_eq!(json, r#"{"id":1,"name":"a"}"#);
        assert_eq!(sample().row_record(1).get("name"), Some(&Value::Str("b".into())));
    }

    #[test]
    fn test_constant_column_appended_once() {
        let table = sample()
            .with_constant_column("_source_file", "a.csv".into())
            .with_constant_column("_source_file", "b.csv".into());
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.rows()[0][2], Value::Str("b.csv".into()));
    }
}
