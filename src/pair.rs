//! One gold sample against one candidate sample. Anything that goes wrong
//! for a pair resolves here into a [`PairVerdict`].

use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    categorize::{MismatchDetail, ShapeStatus, categorize},
    equivalence::evaluate,
    normalize::{DEFAULT_FLOAT_DECIMALS, normalize_table},
    schema::Schema,
    table::{Table, TableError},
};

/// `data_rows` value recorded when a query failed to execute.
pub const EXECUTION_ERROR_SENTINEL: &str = "ERROR";
/// Literal a candidate may hold where the engine dropped a value.
pub const NONE_PLACEHOLDER: &str = "None";
pub const DEFAULT_SAMPLE_ROWS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareOptions {
    pub float_decimals: u32,
    /// Rows kept from each side of a mismatched pair for diagnostics.
    pub sample_rows: usize,
    pub sentinel: String,
    pub placeholder: String,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            float_decimals: DEFAULT_FLOAT_DECIMALS,
            sample_rows: DEFAULT_SAMPLE_ROWS,
            sentinel: EXECUTION_ERROR_SENTINEL.to_string(),
            placeholder: NONE_PLACEHOLDER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataRows {
    Rows(Vec<Vec<serde_json::Value>>),
    Failed(String),
}

/// One executed benchmark query as recorded by the execution step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_index: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub now: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    pub data_rows: DataRows,
}

impl Sample {
    pub fn new(schema: Schema, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self {
            question: None,
            target_index: None,
            now: None,
            query: None,
            schema: Some(schema),
            data_rows: DataRows::Rows(rows),
        }
    }

    pub fn failed(sentinel: &str) -> Self {
        Self {
            question: None,
            target_index: None,
            now: None,
            query: None,
            schema: None,
            data_rows: DataRows::Failed(sentinel.to_string()),
        }
    }

    /// Decodes one element of a samples file.
    pub fn decode(record: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Sample::deserialize(record)
    }

    pub fn is_execution_failure(&self, sentinel: &str) -> bool {
        matches!(&self.data_rows, DataRows::Failed(value) if value == sentinel)
    }

    /// Builds the normalized table for this sample.
    pub fn table(&self) -> Result<Table, PairError> {
        let rows = match &self.data_rows {
            DataRows::Rows(rows) => rows,
            DataRows::Failed(value) => return Err(PairError::NotExecuted(value.clone())),
        };
        let schema = self.schema.as_ref().ok_or(PairError::MissingSchema)?;
        schema
            .validate()
            .map_err(|err| PairError::Schema(err.to_string()))?;
        let raw = Table::from_json_rows(schema, rows)?;
        Ok(normalize_table(&raw, schema))
    }

    /// The first `limit` raw rows, or nothing when the query did not run.
    pub fn head(&self, limit: usize) -> Vec<Vec<serde_json::Value>> {
        match &self.data_rows {
            DataRows::Rows(rows) => rows.iter().take(limit).cloned().collect(),
            DataRows::Failed(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PairError {
    #[error("query did not execute (data_rows = {0:?})")]
    NotExecuted(String),
    #[error("{side} sample is malformed: {message}")]
    Malformed { side: &'static str, message: String },
    #[error("sample has rows but no schema")]
    MissingSchema,
    #[error("invalid schema: {0}")]
    Schema(String),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("comparison panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PairCategory {
    Match,
    #[serde(rename = "Syntax Error")]
    SyntaxError,
    #[serde(rename = "Data Mismatch")]
    DataMismatch,
    #[serde(rename = "Length Mismatch")]
    LengthMismatch,
    #[serde(rename = "Error Compare")]
    ErrorCompare,
}

impl PairCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PairCategory::Match => "Match",
            PairCategory::SyntaxError => "Syntax Error",
            PairCategory::DataMismatch => "Data Mismatch",
            PairCategory::LengthMismatch => "Length Mismatch",
            PairCategory::ErrorCompare => "Error Compare",
        }
    }
}

impl fmt::Display for PairCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leading rows of each side of a failed pair: `[gold, candidate]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowSamples(
    pub Vec<Vec<serde_json::Value>>,
    pub Vec<Vec<serde_json::Value>>,
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairVerdict {
    pub index: usize,
    pub matches: bool,
    pub category: PairCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_status: Option<ShapeStatus>,
    #[serde(default, alias = "detail", skip_serializing_if = "Option::is_none")]
    pub details: Option<MismatchDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<RowSamples>,
}

impl PairVerdict {
    fn new(index: usize, category: PairCategory) -> Self {
        Self {
            index,
            matches: category == PairCategory::Match,
            category,
            shape_status: None,
            details: None,
            reason: None,
            results: None,
        }
    }
}

/// Runs `f`, turning a panic into an error message.
pub fn with_panic_boundary<F, T>(f: F) -> Result<T, String>
where
    F: FnOnce() -> T,
{
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else if let Some(message) = payload.downcast_ref::<&str>() {
            message.to_string()
        } else {
            "unknown panic".to_string()
        }
    })
}

/// Compares one candidate sample against its gold sample.
///
/// A candidate whose `data_rows` is the execution-failure sentinel is a
/// syntax error and the gold sample is not looked at.
pub fn evaluate_pair(
    index: usize,
    gold: &Sample,
    candidate: &Sample,
    options: &CompareOptions,
) -> PairVerdict {
    if candidate.is_execution_failure(&options.sentinel) {
        debug!("Pair {index}: candidate query failed to execute");
        return PairVerdict::new(index, PairCategory::SyntaxError);
    }

    let outcome = with_panic_boundary(|| compare_samples(index, gold, candidate, options))
        .map_err(PairError::Panicked)
        .and_then(|verdict| verdict);
    match outcome {
        Ok(verdict) => verdict,
        Err(err) => compare_error(
            index,
            &err,
            RowSamples(
                gold.head(options.sample_rows),
                candidate.head(options.sample_rows),
            ),
        ),
    }
}

/// Compares two raw samples-file records.
///
/// Records are decoded here and not when the file is loaded, so a record
/// that is not a valid sample fails its own pair and nothing else.
pub fn evaluate_records(
    index: usize,
    gold: &serde_json::Value,
    candidate: &serde_json::Value,
    options: &CompareOptions,
) -> PairVerdict {
    let sentinel = candidate
        .get("data_rows")
        .and_then(serde_json::Value::as_str);
    if sentinel == Some(options.sentinel.as_str()) {
        debug!("Pair {index}: candidate query failed to execute");
        return PairVerdict::new(index, PairCategory::SyntaxError);
    }

    let decode = |record: &serde_json::Value, side: &'static str| {
        Sample::decode(record).map_err(|err| PairError::Malformed {
            side,
            message: err.to_string(),
        })
    };
    let decoded = decode(gold, "gold")
        .and_then(|gold_sample| Ok((gold_sample, decode(candidate, "candidate")?)));
    match decoded {
        Ok((gold_sample, candidate_sample)) => {
            evaluate_pair(index, &gold_sample, &candidate_sample, options)
        }
        Err(err) => compare_error(
            index,
            &err,
            RowSamples(
                record_rows(gold, options.sample_rows),
                record_rows(candidate, options.sample_rows),
            ),
        ),
    }
}

fn compare_error(index: usize, err: &PairError, results: RowSamples) -> PairVerdict {
    match err {
        PairError::Panicked(_) => warn!("Pair {index}: {err}"),
        _ => debug!("Pair {index}: {err}"),
    }
    let mut verdict = PairVerdict::new(index, PairCategory::ErrorCompare);
    verdict.reason = Some(err.to_string());
    verdict.results = Some(results);
    verdict
}

/// Leading rows of a record that may not decode, skipping non-array rows.
fn record_rows(record: &serde_json::Value, limit: usize) -> Vec<Vec<serde_json::Value>> {
    record
        .get("data_rows")
        .and_then(serde_json::Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(|row| row.as_array().cloned())
                .take(limit)
                .collect()
        })
        .unwrap_or_default()
}

fn compare_samples(
    index: usize,
    gold: &Sample,
    candidate: &Sample,
    options: &CompareOptions,
) -> Result<PairVerdict, PairError> {
    let gold_table = gold.table()?;
    let candidate_table = candidate.table()?;

    let outcome = evaluate(&candidate_table, &gold_table, options.float_decimals);
    if outcome.is_match() {
        return Ok(PairVerdict::new(index, PairCategory::Match));
    }
    debug!("Pair {index}: {outcome}");

    let category = if candidate_table.shape() == gold_table.shape() {
        PairCategory::DataMismatch
    } else {
        PairCategory::LengthMismatch
    };
    let triage = categorize(
        &candidate_table,
        &gold_table,
        options.float_decimals,
        &options.placeholder,
    );
    let mut verdict = PairVerdict::new(index, category);
    verdict.shape_status = Some(triage.shape_status);
    verdict.details = triage.details;
    verdict.reason = Some(outcome.to_string());
    verdict.results = Some(RowSamples(
        gold.head(options.sample_rows),
        candidate.head(options.sample_rows),
    ));
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::{ColumnSpec, DeclaredType};

    fn schema(columns: &[(&str, DeclaredType)]) -> Schema {
        Schema::new(
            columns
                .iter()
                .map(|(name, ty)| ColumnSpec::new(*name, *ty))
                .collect(),
        )
    }

    fn rows(value: serde_json::Value) -> Vec<Vec<serde_json::Value>> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn sentinel_short_circuits_without_reading_gold() {
        // A gold sample that cannot even be built would otherwise be an error.
        let gold = Sample {
            schema: None,
            ..Sample::new(Schema::default(), rows(json!([[1]])))
        };
        let verdict = evaluate_pair(3, &gold, &Sample::failed("ERROR"), &CompareOptions::default());
        assert_eq!(verdict.category, PairCategory::SyntaxError);
        assert_eq!(verdict.index, 3);
        assert!(!verdict.matches);
        assert!(verdict.results.is_none());
    }

    #[test]
    fn renamed_single_column_matches() {
        let gold = Sample::new(schema(&[("count", DeclaredType::Integer)]), rows(json!([[5]])));
        let candidate = Sample::new(schema(&[("cnt", DeclaredType::Integer)]), rows(json!([[5]])));
        let verdict = evaluate_pair(0, &gold, &candidate, &CompareOptions::default());
        assert!(verdict.matches);
        assert_eq!(verdict.category, PairCategory::Match);
    }

    #[test]
    fn shape_difference_is_a_length_mismatch() {
        let columns = [("n", DeclaredType::Integer)];
        let gold = Sample::new(schema(&columns), rows(json!([[1], [2], [3]])));
        let candidate = Sample::new(schema(&columns), rows(json!([[1], [2]])));
        let verdict = evaluate_pair(0, &gold, &candidate, &CompareOptions::default());
        assert_eq!(verdict.category, PairCategory::LengthMismatch);
        assert_eq!(verdict.shape_status, Some(ShapeStatus::SameColCount));
        assert_eq!(verdict.details, Some(MismatchDetail::GoldContainsAllPredRows));
        let samples = verdict.results.unwrap();
        assert_eq!(samples.0.len(), 2);
        assert_eq!(samples.1.len(), 2);
    }

    #[test]
    fn equal_shapes_with_different_values_are_a_data_mismatch() {
        let columns = [("s", DeclaredType::String)];
        let gold = Sample::new(schema(&columns), rows(json!([["a"]])));
        let candidate = Sample::new(schema(&columns), rows(json!([["b"]])));
        let verdict = evaluate_pair(0, &gold, &candidate, &CompareOptions::default());
        assert_eq!(verdict.category, PairCategory::DataMismatch);
        assert_eq!(verdict.details, Some(MismatchDetail::Other));
    }

    #[test]
    fn ragged_rows_are_a_compare_error() {
        let columns = [("a", DeclaredType::Integer), ("b", DeclaredType::Integer)];
        let gold = Sample::new(schema(&columns), rows(json!([[1, 2]])));
        let candidate = Sample::new(schema(&columns), rows(json!([[1]])));
        let verdict = evaluate_pair(0, &gold, &candidate, &CompareOptions::default());
        assert_eq!(verdict.category, PairCategory::ErrorCompare);
        assert!(verdict.reason.unwrap().contains("row 0"));
    }

    #[test]
    fn failed_gold_query_is_a_compare_error() {
        let candidate = Sample::new(schema(&[("a", DeclaredType::Integer)]), rows(json!([[1]])));
        let verdict =
            evaluate_pair(0, &Sample::failed("ERROR"), &candidate, &CompareOptions::default());
        assert_eq!(verdict.category, PairCategory::ErrorCompare);
    }

    #[test]
    fn panic_boundary_reports_message() {
        let result: Result<(), String> = with_panic_boundary(|| panic!("boom"));
        assert_eq!(result.unwrap_err(), "boom");
        assert_eq!(with_panic_boundary(|| 7), Ok(7));
    }

    #[test]
    fn sample_deserializes_sentinel_and_rows() {
        let failed: Sample = serde_json::from_value(json!({"query": "q", "data_rows": "ERROR"})).unwrap();
        assert!(failed.is_execution_failure("ERROR"));
        let ok: Sample = serde_json::from_value(json!({
            "schema": [{"name": "a", "type": "long"}],
            "data_rows": [[1], [null]]
        }))
        .unwrap();
        assert_eq!(ok.table().unwrap().shape(), (2, 1));
    }

    #[test]
    fn undecodable_record_fails_only_its_pair() {
        let gold = json!({"schema": [{"name": "a", "type": "long"}], "data_rows": [[1], [2]]});
        let scalar_rows = json!({"schema": [{"name": "a", "type": "long"}], "data_rows": [1, [2]]});
        let verdict = evaluate_records(5, &gold, &scalar_rows, &CompareOptions::default());
        assert_eq!(verdict.index, 5);
        assert_eq!(verdict.category, PairCategory::ErrorCompare);
        assert!(verdict.reason.unwrap().starts_with("candidate sample is malformed"));
        let samples = verdict.results.unwrap();
        assert_eq!(samples.0, vec![vec![json!(1)], vec![json!(2)]]);
        assert_eq!(samples.1, vec![vec![json!(2)]]);

        let null_type = json!({"schema": [{"name": "a", "type": null}], "data_rows": [[1]]});
        let verdict = evaluate_records(0, &null_type, &gold, &CompareOptions::default());
        assert!(verdict.reason.unwrap().starts_with("gold sample is malformed"));
    }

    #[test]
    fn sentinel_record_is_a_syntax_error_even_when_otherwise_malformed() {
        let gold = json!({"schema": [{"name": "a", "type": "long"}], "data_rows": [[1]]});
        let candidate = json!({"question": 7, "data_rows": "ERROR"});
        let verdict = evaluate_records(0, &gold, &candidate, &CompareOptions::default());
        assert_eq!(verdict.category, PairCategory::SyntaxError);
    }

    #[test]
    fn verdict_reads_singular_detail_field() {
        let verdict: PairVerdict = serde_json::from_value(json!({
            "index": 0,
            "matches": false,
            "category": "Data Mismatch",
            "detail": "Other"
        }))
        .unwrap();
        assert_eq!(verdict.details, Some(MismatchDetail::Other));
    }
}
