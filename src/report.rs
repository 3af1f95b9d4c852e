use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    categorize::{MismatchDetail, ShapeStatus},
    cli::CompareArgs,
    pair::{CompareOptions, PairCategory, PairVerdict, RowSamples, evaluate_records},
};

pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MismatchedQuery {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_index: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub now: Option<serde_json::Value>,
    pub ground_truth_query: Option<String>,
    pub eval_query: Option<String>,
    pub error: PairCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_status: Option<ShapeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<MismatchDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<RowSamples>,
}

impl MismatchedQuery {
    fn new(gold: &serde_json::Value, candidate: &serde_json::Value, verdict: &PairVerdict) -> Self {
        let syntax_error = verdict.category == PairCategory::SyntaxError;
        Self {
            index: verdict.index,
            question: (!syntax_error).then(|| text_field(gold, "question")).flatten(),
            target_index: (!syntax_error).then(|| json_field(gold, "target_index")).flatten(),
            now: json_field(gold, "now"),
            ground_truth_query: text_field(gold, "query"),
            eval_query: text_field(candidate, "query"),
            error: verdict.category,
            shape_status: verdict.shape_status,
            details: verdict.details,
            reason: verdict.reason.clone(),
            results: verdict.results.clone(),
        }
    }
}

// Report metadata is read off the raw record so it survives a record that
// failed to decode.
fn text_field(record: &serde_json::Value, key: &str) -> Option<String> {
    record
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}

fn json_field(record: &serde_json::Value, key: &str) -> Option<serde_json::Value> {
    record.get(key).filter(|value| !value.is_null()).cloned()
}

/// Summary of a batch: per-category counts, rates over `total_samples`,
/// and one entry per pair that did not match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub total_samples: usize,
    pub syntax_error_rate: f64,
    pub match_rate: f64,
    pub data_mismatch_rate: f64,
    pub length_mismatch_rate: f64,
    pub compare_error_rate: f64,
    pub syntax_errors: usize,
    pub data_mismatches: usize,
    pub length_mismatches: usize,
    pub compare_errors: usize,
    pub matches: usize,
    pub mismatched_queries: Vec<MismatchedQuery>,
}

impl AggregateReport {
    /// `verdicts[i]` must be the verdict for `gold[i]` against `candidates[i]`.
    pub fn from_verdicts(
        gold: &[serde_json::Value],
        candidates: &[serde_json::Value],
        verdicts: &[PairVerdict],
    ) -> Self {
        let total_samples = verdicts.len();
        let count = |category: PairCategory| {
            verdicts
                .iter()
                .filter(|verdict| verdict.category == category)
                .count()
        };
        let rate = |count: usize| {
            if total_samples == 0 {
                0.0
            } else {
                count as f64 / total_samples as f64
            }
        };

        let matches = count(PairCategory::Match);
        let syntax_errors = count(PairCategory::SyntaxError);
        let data_mismatches = count(PairCategory::DataMismatch);
        let length_mismatches = count(PairCategory::LengthMismatch);
        let compare_errors = count(PairCategory::ErrorCompare);

        let mismatched_queries = verdicts
            .iter()
            .filter(|verdict| !verdict.matches)
            .filter_map(|verdict| {
                let gold = gold.get(verdict.index)?;
                let candidate = candidates.get(verdict.index)?;
                Some(MismatchedQuery::new(gold, candidate, verdict))
            })
            .collect();

        Self {
            total_samples,
            syntax_error_rate: rate(syntax_errors),
            match_rate: rate(matches),
            data_mismatch_rate: rate(data_mismatches),
            length_mismatch_rate: rate(length_mismatches),
            compare_error_rate: rate(compare_errors),
            syntax_errors,
            data_mismatches,
            length_mismatches,
            compare_errors,
            matches,
            mismatched_queries,
        }
    }
}

/// Evaluates `gold[i]` against `candidates[i]` for every paired position on a
/// pool of `workers` threads. Verdicts come back in input order.
pub fn evaluate_batch(
    gold: &[serde_json::Value],
    candidates: &[serde_json::Value],
    options: &CompareOptions,
    workers: usize,
) -> Result<Vec<PairVerdict>> {
    if gold.len() != candidates.len() {
        warn!(
            "Ground truth holds {} sample(s) but the evaluated file holds {}; comparing the first {}",
            gold.len(),
            candidates.len(),
            gold.len().min(candidates.len())
        );
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .context("Building comparison worker pool")?;

    let pairs = gold.iter().zip(candidates).enumerate().collect::<Vec<_>>();
    let verdicts = pool.install(|| {
        pairs
            .par_iter()
            .map(|(index, (gold, candidate))| evaluate_records(*index, gold, candidate, options))
            .collect::<Vec<_>>()
    });
    Ok(verdicts)
}

/// Reads a samples file as a JSON array of raw records. Each record is
/// decoded later, by the pair it belongs to.
pub fn load_samples(path: &Path) -> Result<Vec<serde_json::Value>> {
    let file = File::open(path).with_context(|| format!("Opening samples file {path:?}"))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Parsing samples from {path:?}"))
}

pub fn write_report(path: &Path, report: &AggregateReport) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Creating output directory {parent:?}"))?;
    }
    let file = File::create(path).with_context(|| format!("Creating report file {path:?}"))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)
        .with_context(|| format!("Serializing report to {path:?}"))?;
    writer.flush().context("Flushing report")?;
    Ok(())
}

pub fn execute(args: &CompareArgs) -> Result<()> {
    let gold = load_samples(&args.ground_truth)?;
    let candidates = load_samples(&args.to_eval)?;
    let options = args.options();
    info!(
        "Comparing {:?} against ground truth {:?} with {} worker(s)",
        args.to_eval, args.ground_truth, args.workers
    );

    let verdicts = evaluate_batch(&gold, &candidates, &options, args.workers)?;
    let report = AggregateReport::from_verdicts(&gold, &candidates, &verdicts);
    write_report(&args.output, &report)?;

    info!(
        "Compared {} pair(s): {} match, {} syntax error(s), {} data mismatch(es), {} length mismatch(es), {} compare error(s)",
        report.total_samples,
        report.matches,
        report.syntax_errors,
        report.data_mismatches,
        report.length_mismatches,
        report.compare_errors
    );
    info!("Match rate {:.4}; report written to {:?}", report.match_rate, args.output);
    Ok(())
}
