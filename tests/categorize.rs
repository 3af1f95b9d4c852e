mod common;

use common::{int, table, text};
use query_oracle::{
    categorize::{MismatchDetail, ShapeStatus, categorize},
    normalize::DEFAULT_FLOAT_DECIMALS,
};

#[test]
fn truncated_candidate_is_contained_in_gold() {
    let gold = table(vec![
        ("host", (0..10).map(|i| text(&format!("h{i}"))).collect()),
        ("hits", (0..10).map(int).collect()),
    ]);
    let candidate = table(vec![
        ("host", (0..7).map(|i| text(&format!("h{i}"))).collect()),
        ("hits", (0..7).map(int).collect()),
    ]);
    let result = categorize(&candidate, &gold, DEFAULT_FLOAT_DECIMALS, "None");
    assert_eq!(result.shape_status, ShapeStatus::SameColCount);
    assert_eq!(result.details, Some(MismatchDetail::GoldContainsAllPredRows));
}

#[test]
fn candidate_with_extra_rows_contains_gold() {
    let gold = table(vec![("n", vec![int(1), int(2)])]);
    let candidate = table(vec![("count", vec![int(2), int(1), int(3)])]);
    let result = categorize(&candidate, &gold, DEFAULT_FLOAT_DECIMALS, "None");
    assert_eq!(result.shape_status, ShapeStatus::SameColCount);
    // Renamed columns need equal value sets, which a row superset lacks.
    assert_eq!(result.details, Some(MismatchDetail::Other));

    let candidate = table(vec![("n", vec![int(2), int(1), int(3)])]);
    let result = categorize(&candidate, &gold, DEFAULT_FLOAT_DECIMALS, "None");
    assert_eq!(result.details, Some(MismatchDetail::PredContainsAllGoldRows));
}

#[test]
fn candidate_with_extra_column_contains_gold_columns() {
    let gold = table(vec![("count()", vec![int(4), int(5)])]);
    let candidate = table(vec![
        ("status", vec![text("ok"), text("err")]),
        ("c", vec![int(5), int(4)]),
    ]);
    let result = categorize(&candidate, &gold, DEFAULT_FLOAT_DECIMALS, "None");
    assert_eq!(result.shape_status, ShapeStatus::SameRowCount);
    assert_eq!(result.details, Some(MismatchDetail::PredContainsAllGoldCols));
}

#[test]
fn same_shape_prefers_missing_values_over_placeholders() {
    let gold = table(vec![("a", vec![int(1)]), ("b", vec![text("x")])]);
    let candidate = table(vec![("a", vec![None]), ("b", vec![text("None")])]);
    let result = categorize(&candidate, &gold, DEFAULT_FLOAT_DECIMALS, "None");
    assert_eq!(result.shape_status, ShapeStatus::SameShape);
    assert_eq!(result.details, Some(MismatchDetail::NasInResult));

    let candidate = table(vec![("a", vec![int(1)]), ("b", vec![text("None")])]);
    let result = categorize(&candidate, &gold, DEFAULT_FLOAT_DECIMALS, "None");
    assert_eq!(result.details, Some(MismatchDetail::NoneInPred));
}

#[test]
fn labels_serialize_as_report_strings() {
    assert_eq!(
        serde_json::to_string(&ShapeStatus::RowAndColMismatch).unwrap(),
        "\"Row and col mismatch\""
    );
    assert_eq!(
        serde_json::to_string(&MismatchDetail::GoldContainsAllPredRows).unwrap(),
        "\"Gold contains all pred rows\""
    );
    assert_eq!(MismatchDetail::NasInResult.to_string(), "NAs in result");
}
