use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use crate::{
    columns::{ContainmentError, SharedNames, project_columns},
    data::Cell,
    table::Table,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    LeftOnly,
    RightOnly,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinedRow {
    pub left: Option<usize>,
    pub right: Option<usize>,
    pub provenance: Provenance,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JoinError {
    #[error("no columns to join on")]
    NoKeys,
    #[error("join columns differ: left has [{left}], right has [{right}]")]
    ColumnsDiffer { left: String, right: String },
}

/// Full outer equality join of `left` and `right` on all of `left`'s columns.
/// Duplicate rows join against every equal row, so multiplicities collapse.
pub fn outer_join_indicator(left: &Table, right: &Table) -> Result<Vec<JoinedRow>, JoinError> {
    let keys = left.names();
    if keys.is_empty() {
        return Err(JoinError::NoKeys);
    }
    if left.name_set() != right.name_set() {
        return Err(JoinError::ColumnsDiffer {
            left: keys.join(", "),
            right: right.names().join(", "),
        });
    }
    let right = right.select(&keys).map_err(|_| JoinError::ColumnsDiffer {
        left: keys.join(", "),
        right: right.names().join(", "),
    })?;

    let mut lookup: HashMap<Vec<Cell>, Vec<usize>> = HashMap::new();
    for (idx, row) in right.rows().enumerate() {
        lookup.entry(row).or_default().push(idx);
    }

    let mut joined = Vec::with_capacity(left.row_count().max(right.row_count()));
    let mut right_matched = vec![false; right.row_count()];
    for (left_idx, row) in left.rows().enumerate() {
        match lookup.get(&row) {
            Some(bucket) => {
                for &right_idx in bucket {
                    right_matched[right_idx] = true;
                    joined.push(JoinedRow {
                        left: Some(left_idx),
                        right: Some(right_idx),
                        provenance: Provenance::Both,
                    });
                }
            }
            None => joined.push(JoinedRow {
                left: Some(left_idx),
                right: None,
                provenance: Provenance::LeftOnly,
            }),
        }
    }
    for (right_idx, matched) in right_matched.into_iter().enumerate() {
        if !matched {
            joined.push(JoinedRow {
                left: None,
                right: Some(right_idx),
                provenance: Provenance::RightOnly,
            });
        }
    }
    Ok(joined)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowDiff {
    pub left_only: Vec<usize>,
    pub right_only: Vec<usize>,
    pub both: usize,
}

impl RowDiff {
    pub fn is_equivalent(&self) -> bool {
        self.left_only.is_empty() && self.right_only.is_empty()
    }
}

pub fn compare_rows(left: &Table, right: &Table) -> Result<RowDiff, JoinError> {
    let joined = outer_join_indicator(left, right)?;
    let mut diff = RowDiff::default();
    for row in joined {
        match (row.provenance, row.left, row.right) {
            (Provenance::Both, _, _) => diff.both += 1,
            (Provenance::LeftOnly, Some(idx), _) => diff.left_only.push(idx),
            (Provenance::RightOnly, _, Some(idx)) => diff.right_only.push(idx),
            _ => {}
        }
    }
    Ok(diff)
}

/// Checks that every row of `a` appears in `b` once `b`'s columns are
/// aligned onto `a`'s. Shared column names only need a common type here,
/// since a row subset rarely has the same value sets.
pub fn probe_rows(a: &Table, b: &Table, decimals: u32) -> Result<(), ContainmentError> {
    let (a, b) = project_columns(a, b, decimals, SharedNames::CastOnly)?;
    let present: HashSet<Vec<Cell>> = b.rows().collect();
    match a.rows().position(|row| !present.contains(&row)) {
        Some(idx) => Err(ContainmentError::RowMissing(idx)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::Value, normalize::DEFAULT_FLOAT_DECIMALS, table::Column};

    fn int(i: i64) -> Cell {
        Some(Value::Integer(i))
    }

    fn text(s: &str) -> Cell {
        Some(Value::String(s.to_string()))
    }

    fn table(columns: Vec<(&str, Vec<Cell>)>) -> Table {
        Table::new(
            columns
                .into_iter()
                .map(|(name, cells)| Column::inferred(name, cells))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn permuted_rows_join_completely() {
        let left = table(vec![("n", vec![int(1), int(2)]), ("s", vec![text("a"), text("b")])]);
        let right = table(vec![("s", vec![text("b"), text("a")]), ("n", vec![int(2), int(1)])]);
        let diff = compare_rows(&left, &right).unwrap();
        assert!(diff.is_equivalent());
        assert_eq!(diff.both, 2);
    }

    #[test]
    fn provenance_tags_unmatched_rows() {
        let left = table(vec![("n", vec![int(1), int(2)])]);
        let right = table(vec![("n", vec![int(2), int(3)])]);
        let joined = outer_join_indicator(&left, &right).unwrap();
        let tags = joined.iter().map(|r| r.provenance).collect::<Vec<_>>();
        assert_eq!(
            tags,
            vec![Provenance::LeftOnly, Provenance::Both, Provenance::RightOnly]
        );
        let diff = compare_rows(&left, &right).unwrap();
        assert_eq!(diff.left_only, vec![0]);
        assert_eq!(diff.right_only, vec![1]);
    }

    #[test]
    fn duplicate_counts_collapse() {
        let left = table(vec![("n", vec![int(7), int(7)])]);
        let right = table(vec![("n", vec![int(7), int(7), int(7)])]);
        let diff = compare_rows(&left, &right).unwrap();
        assert!(diff.is_equivalent());
        assert_eq!(diff.both, 6);
    }

    #[test]
    fn nulls_join_with_nulls() {
        let left = table(vec![("n", vec![None, int(1)])]);
        let right = table(vec![("n", vec![int(1), None])]);
        assert!(compare_rows(&left, &right).unwrap().is_equivalent());
    }

    #[test]
    fn join_requires_shared_columns() {
        let left = table(vec![("a", vec![int(1)])]);
        let right = table(vec![("b", vec![int(1)])]);
        assert!(matches!(
            compare_rows(&left, &right),
            Err(JoinError::ColumnsDiffer { .. })
        ));
        let empty = Table::from_columns(vec![], 0).unwrap();
        assert_eq!(compare_rows(&empty, &empty), Err(JoinError::NoKeys));
    }

    #[test]
    fn probe_finds_subset_rows() {
        let small = table(vec![("n", vec![int(1)]), ("s", vec![text("a")])]);
        let large = table(vec![
            ("n", vec![int(1), int(2)]),
            ("s", vec![text("a"), text("b")]),
        ]);
        assert!(probe_rows(&small, &large, DEFAULT_FLOAT_DECIMALS).is_ok());
        assert_eq!(
            probe_rows(&large, &small, DEFAULT_FLOAT_DECIMALS),
            Err(ContainmentError::RowMissing(1))
        );
    }

    #[test]
    fn probe_needs_renamed_columns_to_share_values() {
        let small = table(vec![("n", vec![int(1)])]);
        let large = table(vec![("m", vec![int(1), int(2)])]);
        assert_eq!(
            probe_rows(&small, &large, DEFAULT_FLOAT_DECIMALS),
            Err(ContainmentError::UnmatchedColumn("n".to_string()))
        );
    }
}
