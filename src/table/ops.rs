//! Generic row-stacking and equi-join primitives.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::frame::Table;
use super::value::{ColumnType, Value};

// ─────────────────────────────────────────────────────────────────────────────
// Concat
// ─────────────────────────────────────────────────────────────────────────────

/// Stacks `parts` in order under the output schema `columns`.
///
/// A part lacking an output column contributes nulls for it; columns of a
/// part that are not in `columns` are dropped. Row order is every row of
/// the first part, then the second, and so on.
pub fn concat(parts: &[&Table], columns: &[String]) -> Table {
    concat_each(parts, columns, |_| {})
}

/// `concat`, calling `on_part` with each part's index once its rows are in.
pub(crate) fn concat_each<F>(parts: &[&Table], columns: &[String], mut on_part: F) -> Table
where
    F: FnMut(usize),
{
    let total: usize = parts.iter().map(|p| p.row_count()).sum();
    let mut rows = Vec::with_capacity(total);
    let mut dtypes = vec![ColumnType::Empty; columns.len()];

    for (part_idx, part) in parts.iter().enumerate() {
        let mapping: Vec<Option<usize>> =
            columns.iter().map(|name| part.column_index(name)).collect();

        for (out_idx, source) in mapping.iter().enumerate() {
            if let Some(idx) = source {
                dtypes[out_idx] = dtypes[out_idx].unify(part.dtypes()[*idx]);
            }
        }

        for row in part.rows() {
            rows.push(
                mapping
                    .iter()
                    .map(|source| match source {
                        Some(idx) => row[*idx].clone(),
                        None => Value::Null,
                    })
                    .collect(),
            );
        }
        on_part(part_idx);
    }

    Table::with_types(columns.to_vec(), dtypes, rows)
}

// ─────────────────────────────────────────────────────────────────────────────
// Join
// ─────────────────────────────────────────────────────────────────────────────

/// Relational join flavour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Outer,
}

impl JoinType {
    pub fn as_str(self) -> &'static str {
        match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
            JoinType::Outer => "outer",
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JoinType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inner" => Ok(JoinType::Inner),
            "left" => Ok(JoinType::Left),
            "right" => Ok(JoinType::Right),
            "outer" => Ok(JoinType::Outer),
            other => Err(AppError::InvalidParameter(format!(
                "Unknown join type '{}' (expected inner, left, right or outer)",
                other
            ))),
        }
    }
}

/// Suffixes applied to non-key columns present on both sides.
#[derive(Debug, Clone, Copy)]
pub struct Suffixes<'a> {
    pub left: &'a str,
    pub right: &'a str,
}

/// Joins `left` and `right` on equality of every column in `on`.
///
/// Output columns are the left columns in order (key columns appear once,
/// at their left position) followed by the right non-key columns. Non-key
/// names present on both sides get the matching suffix. Null keys match
/// other null keys.
///
/// Row order:
/// - `inner`/`left`: left row order, each left row followed by its matches
///   in right order;
/// - `outer`: as `left`, then unmatched right rows in right order;
/// - `right`: right row order, each right row paired with its left matches
///   in left order.
///
/// # Errors
///
/// - `AppError::InvalidColumns` if `on` is empty or names a column absent
///   from either side.
/// - `AppError::MergeFailed` if a key column holds text on one side and
///   numbers on the other.
pub fn join(
    left: &Table,
    right: &Table,
    on: &[String],
    how: JoinType,
    suffixes: Suffixes<'_>,
) -> Result<Table, AppError> {
    if on.is_empty() {
        return Err(AppError::InvalidColumns { missing: vec![] });
    }
    let mut missing: Vec<String> = Vec::new();
    for name in on {
        if (!left.has_column(name) || !right.has_column(name)) && !missing.contains(name) {
            missing.push(name.clone());
        }
    }
    if !missing.is_empty() {
        return Err(AppError::InvalidColumns { missing });
    }

    let left_keys = left.require_columns(on)?;
    let right_keys = right.require_columns(on)?;

    // Numeric keys of differing width compare as floats
    let mut widen = Vec::with_capacity(on.len());
    for (pos, name) in on.iter().enumerate() {
        let lt = left.dtypes()[left_keys[pos]];
        let rt = right.dtypes()[right_keys[pos]];
        let compatible = lt == rt
            || lt == ColumnType::Empty
            || rt == ColumnType::Empty
            || (lt.is_numeric() && rt.is_numeric());
        if !compatible {
            return Err(AppError::MergeFailed(format!(
                "Cannot join on column '{}': {} values on the left, {} values on the right",
                name, lt, rt
            )));
        }
        widen.push(lt != rt);
    }

    let key_of = |row: &[Value], keys: &[usize]| -> Vec<Value> {
        keys.iter()
            .zip(&widen)
            .map(|(&idx, &w)| if w { row[idx].widened() } else { row[idx].clone() })
            .collect()
    };

    // Output schema
    let right_extra: Vec<usize> = (0..right.column_count())
        .filter(|idx| !right_keys.contains(idx))
        .collect();
    let right_extra_names: Vec<&String> =
        right_extra.iter().map(|&i| &right.columns()[i]).collect();

    let mut columns: Vec<String> = Vec::with_capacity(left.column_count() + right_extra.len());
    for (idx, name) in left.columns().iter().enumerate() {
        if !left_keys.contains(&idx) && right_extra_names.contains(&name) {
            columns.push(format!("{}{}", name, suffixes.left));
        } else {
            columns.push(name.clone());
        }
    }
    for name in &right_extra_names {
        if left.has_column(name) && !on.contains(*name) {
            columns.push(format!("{}{}", name, suffixes.right));
        } else {
            columns.push((*name).clone());
        }
    }

    let combine = |l: Option<usize>, r: Option<usize>| -> Vec<Value> {
        let mut out = Vec::with_capacity(columns.len());
        for idx in 0..left.column_count() {
            let value = match (l, left_keys.iter().position(|&k| k == idx), r) {
                (Some(li), _, _) => left.rows()[li][idx].clone(),
                (None, Some(key_pos), Some(ri)) => right.rows()[ri][right_keys[key_pos]].clone(),
                _ => Value::Null,
            };
            out.push(value);
        }
        for &idx in &right_extra {
            out.push(match r {
                Some(ri) => right.rows()[ri][idx].clone(),
                None => Value::Null,
            });
        }
        out
    };

    let mut rows: Vec<Vec<Value>> = Vec::new();
    match how {
        JoinType::Inner | JoinType::Left | JoinType::Outer => {
            let index = build_index(right, &right_keys, &key_of);
            let mut right_matched = vec![false; right.row_count()];

            for (li, row) in left.rows().iter().enumerate() {
                match index.get(&key_of(row.as_slice(), left_keys.as_slice())) {
                    Some(matches) => {
                        for &ri in matches {
                            right_matched[ri] = true;
                            rows.push(combine(Some(li), Some(ri)));
                        }
                    }
                    None if how != JoinType::Inner => rows.push(combine(Some(li), None)),
                    None => {}
                }
            }

            if how == JoinType::Outer {
                for (ri, matched) in right_matched.iter().enumerate() {
                    if !matched {
                        rows.push(combine(None, Some(ri)));
                    }
                }
            }
        }
        JoinType::Right => {
            let index = build_index(left, &left_keys, &key_of);
            for (ri, row) in right.rows().iter().enumerate() {
                match index.get(&key_of(row.as_slice(), right_keys.as_slice())) {
                    Some(matches) => {
                        for &li in matches {
                            rows.push(combine(Some(li), Some(ri)));
                        }
                    }
                    None => rows.push(combine(None, Some(ri))),
                }
            }
        }
    }

    Ok(Table::from_rows(columns, rows))
}

/// Maps each key to the row indices carrying it, in row order.
fn build_index<F>(table: &Table, keys: &[usize], key_of: &F) -> HashMap<Vec<Value>, Vec<usize>>
where
    F: Fn(&[Value], &[usize]) -> Vec<Value>,
{
    let mut index: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
    for (idx, row) in table.rows().iter().enumerate() {
        index.entry(key_of(row.as_slice(), keys)).or_default().push(idx);
    }
    index
}
