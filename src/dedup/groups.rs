//! Duplicate group detection.

use std::collections::HashMap;

use crate::table::{Table, Value};

/// Rows sharing identical values across the key columns.
///
/// `rows` holds original row indices in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub key: Vec<Value>,
    pub rows: Vec<usize>,
}

impl DuplicateGroup {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// A group only counts as duplicated with two or more rows.
    pub fn is_duplicate(&self) -> bool {
        self.rows.len() >= 2
    }
}

/// Groups every row of `table` by its values at `key_columns`.
///
/// Groups come back in first-encountered order. Missing values group
/// together.
pub fn group_rows(table: &Table, key_columns: &[usize]) -> Vec<DuplicateGroup> {
    let mut positions: HashMap<Vec<Value>, usize> = HashMap::new();
    let mut groups: Vec<DuplicateGroup> = Vec::new();

    for (idx, row) in table.rows().iter().enumerate() {
        let key: Vec<Value> = key_columns.iter().map(|&c| row[c].clone()).collect();
        match positions.get(&key) {
            Some(&pos) => groups[pos].rows.push(idx),
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push(DuplicateGroup {
                    key,
                    rows: vec![idx],
                });
            }
        }
    }

    groups
}

/// Only the groups with two or more rows, in first-encountered order.
pub fn duplicate_groups(table: &Table, key_columns: &[usize]) -> Vec<DuplicateGroup> {
    group_rows(table, key_columns)
        .into_iter()
        .filter(DuplicateGroup::is_duplicate)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_in_first_seen_order() {
        let table = Table::from_rows(
            vec!["k".into()],
            vec![
                vec!["B".into()],
                vec!["A".into()],
                vec!["B".into()],
                vec![Value::Null],
                vec![Value::Null],
            ],
        );
        let groups = group_rows(&table, &[0]);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].rows, vec![0, 2]);
        assert_eq!(groups[1].rows, vec![1]);
        assert_eq!(groups[2].rows, vec![3, 4]);

        let dups = duplicate_groups(&table, &[0]);
        assert_eq!(dups.len(), 2);
        assert_eq!(dups[1].key, vec![Value::Null]);
    }

    #[test]
    fn test_typed_keys_do_not_collide() {
        let table = Table::from_rows(
            vec!["k".into()],
            vec![vec![Value::Int(1)], vec!["1".into()]],
        );
        assert!(duplicate_groups(&table, &[0]).is_empty());
    }
}
