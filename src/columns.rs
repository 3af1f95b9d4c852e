//! Column alignment between a candidate table and a gold table.
//!
//! Columns pair up by name when both tables share a name, and otherwise by
//! value set: a gold column claims the first remaining candidate column it
//! can be cast into whose distinct values equal its own. The search is
//! greedy first-fit in candidate column order, not an optimal bipartite
//! matching, so two columns with identical value sets pair up in whichever
//! order the candidate lists them.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use log::debug;
use thiserror::Error;

use crate::{
    normalize::{CastError, coerce_pair},
    table::{Column, Table, TableError},
};

/// Why two tables have no 1:1 column correspondence.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ColumnMismatch {
    #[error("column '{column}' cannot be cast to the candidate's type: {source}")]
    CastFailed {
        column: String,
        #[source]
        source: CastError,
    },
    #[error("gold column '{0}' has no counterpart in the candidate")]
    GoldColumnUnmatched(String),
    #[error("candidate has extra column(s): {}", .0.join(", "))]
    ExtraCandidateColumns(Vec<String>),
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Both tables after alignment: the gold table carries the candidate's
/// column names in the candidate's order, and float columns on both sides
/// are rounded.
#[derive(Debug, Clone)]
pub struct AlignedTables {
    pub candidate: Table,
    pub gold: Table,
    /// `(candidate column, gold column)` pairs in candidate order.
    pub correspondence: Vec<(String, String)>,
}

/// Finds a 1:1 correspondence between `candidate`'s and `gold`'s columns.
pub fn align_columns(
    candidate: &Table,
    gold: &Table,
    decimals: u32,
) -> Result<AlignedTables, ColumnMismatch> {
    if candidate.name_set() == gold.name_set() {
        align_by_name(candidate, gold, decimals)
    } else {
        align_by_values(candidate, gold, decimals)
    }
}

fn align_by_name(
    candidate: &Table,
    gold: &Table,
    decimals: u32,
) -> Result<AlignedTables, ColumnMismatch> {
    let mut candidate_columns = Vec::with_capacity(candidate.column_count());
    let mut gold_columns = Vec::with_capacity(candidate.column_count());
    let mut correspondence = Vec::with_capacity(candidate.column_count());
    for target in candidate.columns() {
        let source = gold
            .column(&target.name)
            .ok_or_else(|| TableError::MissingColumn(target.name.clone()))?;
        let (target, source) =
            coerce_pair(target, source, decimals).map_err(|source| ColumnMismatch::CastFailed {
                column: target.name.clone(),
                source,
            })?;
        correspondence.push((target.name.clone(), source.name.clone()));
        candidate_columns.push(target);
        gold_columns.push(source);
    }
    Ok(AlignedTables {
        candidate: Table::from_columns(candidate_columns, candidate.row_count())?,
        gold: Table::from_columns(gold_columns, gold.row_count())?,
        correspondence,
    })
}

fn align_by_values(
    candidate: &Table,
    gold: &Table,
    decimals: u32,
) -> Result<AlignedTables, ColumnMismatch> {
    let common: HashSet<&str> = candidate
        .name_set()
        .intersection(&gold.name_set())
        .copied()
        .collect();

    let mut candidate_columns = candidate.columns().to_vec();
    let mut pool = candidate
        .names()
        .into_iter()
        .filter(|name| !common.contains(name))
        .map(str::to_string)
        .collect::<Vec<_>>();
    // Shared names pair without a value check; they are only brought to a
    // common type where possible so floats compare rounded.
    let mut placed: HashMap<String, Column> = HashMap::with_capacity(common.len());
    for source in gold
        .columns()
        .iter()
        .filter(|c| common.contains(c.name.as_str()))
    {
        let Some(idx) = candidate.column_index(&source.name) else {
            continue;
        };
        match coerce_pair(&candidate_columns[idx], source, decimals) {
            Ok((target, source)) => {
                candidate_columns[idx] = target;
                placed.insert(source.name.clone(), source);
            }
            Err(err) => {
                debug!("Shared column '{}' kept as is: {err}", source.name);
                placed.insert(source.name.clone(), source.clone());
            }
        }
    }
    let mut sources: HashMap<String, String> =
        common.iter().map(|n| (n.to_string(), n.to_string())).collect();

    for gold_column in gold
        .columns()
        .iter()
        .filter(|c| !common.contains(c.name.as_str()))
    {
        let mut matched = None;
        for (pos, name) in pool.iter().enumerate() {
            let Some(idx) = candidate.column_index(name) else {
                continue;
            };
            match coerce_pair(&candidate_columns[idx], gold_column, decimals) {
                Ok((target, source)) if target.value_set() == source.value_set() => {
                    matched = Some((pos, idx, target, source));
                    break;
                }
                Ok(_) => {}
                Err(err) => debug!(
                    "Gold column '{}' cannot pair with '{}': {err}",
                    gold_column.name, name
                ),
            }
        }

        let Some((pos, idx, target, source)) = matched else {
            return Err(ColumnMismatch::GoldColumnUnmatched(gold_column.name.clone()));
        };
        let name = pool.remove(pos);
        debug!("Gold column '{}' aligned to '{}'", gold_column.name, name);
        candidate_columns[idx] = target;
        placed.insert(name.clone(), source.renamed(name.clone()));
        sources.insert(name, gold_column.name.clone());
    }

    if !pool.is_empty() {
        return Err(ColumnMismatch::ExtraCandidateColumns(pool));
    }

    let mut gold_columns = Vec::with_capacity(candidate_columns.len());
    let mut correspondence = Vec::with_capacity(candidate_columns.len());
    for column in &candidate_columns {
        let aligned = placed
            .remove(&column.name)
            .ok_or_else(|| TableError::MissingColumn(column.name.clone()))?;
        let source = sources
            .get(&column.name)
            .cloned()
            .unwrap_or_else(|| column.name.clone());
        correspondence.push((column.name.clone(), source));
        gold_columns.push(aligned);
    }

    Ok(AlignedTables {
        candidate: Table::from_columns(candidate_columns, candidate.row_count())?,
        gold: Table::from_columns(gold_columns, gold.row_count())?,
        correspondence,
    })
}

/// Why `b` does not contain `a` during a containment probe.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContainmentError {
    #[error("column '{0}' cannot be cast to a common type")]
    ColumnTypeMismatch(String),
    #[error("column '{0}' holds different values")]
    ColumnValueMismatch(String),
    #[error("column '{0}' has no counterpart")]
    UnmatchedColumn(String),
    #[error("row {0} has no counterpart")]
    RowMissing(usize),
    #[error("malformed table: {0}")]
    Table(String),
}

/// How columns that carry the same name in both tables are treated by
/// [`project_columns`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedNames {
    /// Shared columns must hold the same value set.
    MustAgree,
    /// Shared columns only need a common type; used when one table's rows
    /// are expected to be a subset of the other's.
    CastOnly,
}

/// Checks that every column of `a` corresponds to a distinct column of `b`
/// and returns `a` (floats rounded) together with `b` projected onto `a`'s
/// column names and order.
///
/// Columns without a shared name pair first-fit by value set. Columns of `b`
/// left over are dropped from the projection.
pub fn project_columns(
    a: &Table,
    b: &Table,
    decimals: u32,
    shared: SharedNames,
) -> Result<(Table, Table), ContainmentError> {
    let b_names = b.name_set();
    let common = a
        .names()
        .into_iter()
        .filter(|name| b_names.contains(name))
        .collect::<Vec<_>>();

    let mut a_columns = a.columns().to_vec();
    let mut projected: HashMap<String, Column> = HashMap::new();

    for name in &common {
        let (Some(idx), Some(source)) = (a.column_index(name), b.column(name)) else {
            continue;
        };
        let (target, source) = coerce_pair(&a_columns[idx], source, decimals)
            .map_err(|_| ContainmentError::ColumnTypeMismatch(name.to_string()))?;
        if shared == SharedNames::MustAgree && target.value_set() != source.value_set() {
            return Err(ContainmentError::ColumnValueMismatch(name.to_string()));
        }
        a_columns[idx] = target;
        projected.insert(name.to_string(), source);
    }

    let mut pool = b
        .columns()
        .iter()
        .filter(|c| !common.contains(&c.name.as_str()))
        .collect::<Vec<_>>();
    for idx in 0..a_columns.len() {
        let name = a_columns[idx].name.clone();
        if common.contains(&name.as_str()) {
            continue;
        }
        let found = pool.iter().find_position(|candidate| {
            coerce_pair(&a_columns[idx], candidate, decimals)
                .map(|(target, source)| target.value_set() == source.value_set())
                .unwrap_or(false)
        });
        let Some((pos, _)) = found else {
            return Err(ContainmentError::UnmatchedColumn(name));
        };
        let source = pool.remove(pos);
        let (target, source) = coerce_pair(&a_columns[idx], source, decimals)
            .map_err(|_| ContainmentError::ColumnTypeMismatch(name.clone()))?;
        a_columns[idx] = target;
        projected.insert(name.clone(), source.renamed(name));
    }

    let b_columns = a_columns
        .iter()
        .map(|c| {
            projected
                .remove(&c.name)
                .ok_or_else(|| ContainmentError::UnmatchedColumn(c.name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let a_table = Table::from_columns(a_columns, a.row_count())
        .map_err(|err| ContainmentError::Table(err.to_string()))?;
    let b_table = Table::from_columns(b_columns, b.row_count())
        .map_err(|err| ContainmentError::Table(err.to_string()))?;
    Ok((a_table, b_table))
}
