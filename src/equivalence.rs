use std::fmt;

use log::debug;

use crate::{
    columns::{ColumnMismatch, align_columns},
    normalize::DEFAULT_FLOAT_DECIMALS,
    pair::with_panic_boundary,
    rows::{JoinError, RowDiff, compare_rows},
    table::Table,
};

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Match,
    Columns(ColumnMismatch),
    Rows(RowDiff),
    JoinFailed(JoinError),
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Match)
    }
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchOutcome::Match => write!(f, "tables match"),
            MatchOutcome::Columns(err) => write!(f, "column mismatch: {err}"),
            MatchOutcome::Rows(diff) => write!(
                f,
                "row mismatch: {} candidate-only row(s), {} gold-only row(s)",
                diff.left_only.len(),
                diff.right_only.len()
            ),
            MatchOutcome::JoinFailed(err) => write!(f, "row join failed: {err}"),
        }
    }
}

/// Compares `candidate` against `gold`, rounding floats to `decimals` places
/// wherever a float comparison happens.
pub fn evaluate(candidate: &Table, gold: &Table, decimals: u32) -> MatchOutcome {
    let aligned = match align_columns(candidate, gold, decimals) {
        Ok(aligned) => aligned,
        Err(mismatch) => {
            debug!("Column alignment failed: {mismatch}");
            return MatchOutcome::Columns(mismatch);
        }
    };
    match compare_rows(&aligned.candidate, &aligned.gold) {
        Ok(diff) if diff.is_equivalent() => MatchOutcome::Match,
        Ok(diff) => MatchOutcome::Rows(diff),
        Err(err) => MatchOutcome::JoinFailed(err),
    }
}

/// `true` when both tables hold the same logical data up to row order,
/// column order, column names and value types.
pub fn check(candidate: &Table, gold: &Table) -> bool {
    with_panic_boundary(|| evaluate(candidate, gold, DEFAULT_FLOAT_DECIMALS).is_match())
        .unwrap_or(false)
}
