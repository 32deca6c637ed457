//! Survivor selection within a duplicate group.

use std::fmt;

use serde::Serialize;

use crate::error::AppError;
use crate::table::{ColumnType, Table, Value};

/// Which row of a duplicate group is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", content = "column", rename_all = "snake_case")]
pub enum DedupStrategy {
    /// Smallest original row index.
    First,
    /// Largest original row index.
    Last,
    /// Earliest row whose column is non-null, else the first row.
    NotEmpty(String),
    /// Highest numeric value in the column; unparseable counts as lowest.
    MaxValue(String),
    /// Latest date/time in the column; unparseable counts as lowest.
    MostRecent(String),
}

impl DedupStrategy {
    /// Parses a strategy name and its optional column.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidParameter` for an unknown name, or when
    /// `not_empty`, `max_value` or `most_recent` is given no column.
    pub fn from_name(name: &str, strategy_column: Option<&str>) -> Result<Self, AppError> {
        let column = || {
            strategy_column
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    AppError::InvalidParameter(format!(
                        "Strategy '{}' requires a strategy column",
                        name
                    ))
                })
        };

        match name {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            "not_empty" => Ok(Self::NotEmpty(column()?)),
            "max_value" => Ok(Self::MaxValue(column()?)),
            "most_recent" => Ok(Self::MostRecent(column()?)),
            other => Err(AppError::InvalidParameter(format!(
                "Unknown keep strategy '{}' (expected first, last, not_empty, max_value or most_recent)",
                other
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Last => "last",
            Self::NotEmpty(_) => "not_empty",
            Self::MaxValue(_) => "max_value",
            Self::MostRecent(_) => "most_recent",
        }
    }

    pub fn strategy_column(&self) -> Option<&str> {
        match self {
            Self::First | Self::Last => None,
            Self::NotEmpty(c) | Self::MaxValue(c) | Self::MostRecent(c) => Some(c),
        }
    }

    /// Binds the strategy to `table`, resolving its column.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidColumns` if the strategy column is absent.
    pub(crate) fn bind<'t>(&self, table: &'t Table) -> Result<Selector<'t>, AppError> {
        let column = match self.strategy_column() {
            Some(name) => {
                let idx = table
                    .column_index(name)
                    .ok_or_else(|| AppError::invalid_columns([name]))?;
                Some((idx, table.dtypes()[idx]))
            }
            None => None,
        };
        Ok(Selector {
            strategy: self.clone(),
            table,
            column,
        })
    }
}

impl fmt::Display for DedupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.strategy_column() {
            Some(column) => write!(f, "{}({})", self.name(), column),
            None => f.write_str(self.name()),
        }
    }
}

/// A strategy resolved against one table.
pub(crate) struct Selector<'t> {
    strategy: DedupStrategy,
    table: &'t Table,
    column: Option<(usize, ColumnType)>,
}

impl Selector<'_> {
    /// Picks the surviving row index from `rows` (ascending original indices).
    /// Returns `None` only for an empty group.
    pub(crate) fn survivor(&self, rows: &[usize]) -> Option<usize> {
        let (&first, _) = rows.split_first()?;
        let Some((col, dtype)) = self.column else {
            return match self.strategy {
                DedupStrategy::Last => rows.last().copied(),
                _ => Some(first),
            };
        };
        let data = self.table.rows();
        let cell = |row: usize| &data[row][col];

        let picked = match self.strategy {
            DedupStrategy::NotEmpty(_) => rows
                .iter()
                .copied()
                .find(|&r| !cell(r).is_null())
                .unwrap_or(first),
            DedupStrategy::MaxValue(_) => greatest(rows, |r| numeric(cell(r), dtype)),
            DedupStrategy::MostRecent(_) => greatest(rows, |r| cell(r).as_datetime()),
            DedupStrategy::First | DedupStrategy::Last => first,
        };
        Some(picked)
    }
}

/// Numeric view of a cell, using the column's inferred type: numeric
/// columns are read directly, text columns are parsed.
fn numeric(value: &Value, dtype: ColumnType) -> Option<f64> {
    match (dtype, value) {
        (ColumnType::Empty, _) => None,
        (ColumnType::Integer, Value::Int(i)) => Some(*i as f64),
        (ColumnType::Float, Value::Float(f)) if !f.is_nan() => Some(*f),
        _ => value.as_f64(),
    }
}

/// Row with the greatest key; missing keys rank lowest, ties keep the
/// earliest row. `rows` must be non-empty.
fn greatest<K, F>(rows: &[usize], key: F) -> usize
where
    K: PartialOrd,
    F: Fn(usize) -> Option<K>,
{
    let mut best_row = rows[0];
    let mut best_key = key(best_row);
    for &row in &rows[1..] {
        let candidate = key(row);
        let better = match (&candidate, &best_key) {
            (Some(c), Some(b)) => c > b,
            (Some(_), None) => true,
            _ => false,
        };
        if better {
            best_row = row;
            best_key = candidate;
        }
    }
    best_row
}
