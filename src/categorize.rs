//! Coarse triage of a failed comparison: shape first, then which side
//! contains the other.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{columns::{SharedNames, project_columns}, rows::probe_rows, table::Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeStatus {
    #[serde(rename = "Same shape")]
    SameShape,
    #[serde(rename = "Same row count")]
    SameRowCount,
    #[serde(rename = "Same col count")]
    SameColCount,
    #[serde(rename = "Row and col mismatch")]
    RowAndColMismatch,
}

impl ShapeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeStatus::SameShape => "Same shape",
            ShapeStatus::SameRowCount => "Same row count",
            ShapeStatus::SameColCount => "Same col count",
            ShapeStatus::RowAndColMismatch => "Row and col mismatch",
        }
    }
}

impl fmt::Display for ShapeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MismatchDetail {
    #[serde(rename = "NAs in result")]
    NasInResult,
    #[serde(rename = "None in pred")]
    NoneInPred,
    #[serde(rename = "Pred contains all gold cols")]
    PredContainsAllGoldCols,
    #[serde(rename = "Gold contains all pred cols")]
    GoldContainsAllPredCols,
    #[serde(rename = "Pred contains all gold rows")]
    PredContainsAllGoldRows,
    #[serde(rename = "Gold contains all pred rows")]
    GoldContainsAllPredRows,
    Other,
}

impl MismatchDetail {
    pub fn as_str(&self) -> &'static str {
        match self {
            MismatchDetail::NasInResult => "NAs in result",
            MismatchDetail::NoneInPred => "None in pred",
            MismatchDetail::PredContainsAllGoldCols => "Pred contains all gold cols",
            MismatchDetail::GoldContainsAllPredCols => "Gold contains all pred cols",
            MismatchDetail::PredContainsAllGoldRows => "Pred contains all gold rows",
            MismatchDetail::GoldContainsAllPredRows => "Gold contains all pred rows",
            MismatchDetail::Other => "Other",
        }
    }
}

impl fmt::Display for MismatchDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Categorization {
    pub shape_status: ShapeStatus,
    /// Not computed for [`ShapeStatus::RowAndColMismatch`].
    pub details: Option<MismatchDetail>,
}

/// Categorizes why `candidate` failed to match `gold`.
///
/// `placeholder` is the literal string a candidate may carry where a value
/// went missing upstream (`"None"`).
pub fn categorize(
    candidate: &Table,
    gold: &Table,
    decimals: u32,
    placeholder: &str,
) -> Categorization {
    let (candidate_rows, candidate_cols) = candidate.shape();
    let (gold_rows, gold_cols) = gold.shape();

    let (shape_status, details) = if candidate_rows == gold_rows && candidate_cols == gold_cols {
        let detail = if candidate.has_nulls() || gold.has_nulls() {
            MismatchDetail::NasInResult
        } else if candidate.contains_placeholder(placeholder) {
            MismatchDetail::NoneInPred
        } else {
            MismatchDetail::Other
        };
        (ShapeStatus::SameShape, Some(detail))
    } else if candidate_rows == gold_rows {
        let detail = if candidate_cols > gold_cols {
            contains_columns(gold, candidate, decimals)
                .then_some(MismatchDetail::PredContainsAllGoldCols)
        } else {
            contains_columns(candidate, gold, decimals)
                .then_some(MismatchDetail::GoldContainsAllPredCols)
        };
        (
            ShapeStatus::SameRowCount,
            Some(detail.unwrap_or(MismatchDetail::Other)),
        )
    } else if candidate_cols == gold_cols {
        let detail = if candidate_rows > gold_rows {
            contains_rows(gold, candidate, decimals)
                .then_some(MismatchDetail::PredContainsAllGoldRows)
        } else {
            contains_rows(candidate, gold, decimals)
                .then_some(MismatchDetail::GoldContainsAllPredRows)
        };
        (
            ShapeStatus::SameColCount,
            Some(detail.unwrap_or(MismatchDetail::Other)),
        )
    } else {
        (ShapeStatus::RowAndColMismatch, None)
    };

    Categorization {
        shape_status,
        details,
    }
}

/// Does every column of `a` have a counterpart in `b`?
fn contains_columns(a: &Table, b: &Table, decimals: u32) -> bool {
    match project_columns(a, b, decimals, SharedNames::MustAgree) {
        Ok(_) => true,
        Err(err) => {
            debug!("Column containment probe failed: {err}");
            false
        }
    }
}

/// Does every row of `a` have a counterpart in `b`?
fn contains_rows(a: &Table, b: &Table, decimals: u32) -> bool {
    match probe_rows(a, b, decimals) {
        Ok(()) => true,
        Err(err) => {
            debug!("Row containment probe failed: {err}");
            false
        }
    }
}
