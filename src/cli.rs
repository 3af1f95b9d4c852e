use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{
    normalize::DEFAULT_FLOAT_DECIMALS,
    pair::{CompareOptions, DEFAULT_SAMPLE_ROWS, EXECUTION_ERROR_SENTINEL, NONE_PLACEHOLDER},
    report::DEFAULT_WORKERS,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Judge query results against ground truth by table equivalence", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compare a file of evaluated query results against ground truth and write a JSON report
    Compare(CompareArgs),
    /// Check a single candidate result against a single gold result
    Check(CheckArgs),
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// JSON array of ground-truth samples
    #[arg(short = 'g', long = "ground-truth")]
    pub ground_truth: PathBuf,
    /// JSON array of samples to evaluate, paired with the ground truth by position
    #[arg(short = 'e', long = "to-eval")]
    pub to_eval: PathBuf,
    /// Destination report file (parent directories are created)
    #[arg(short, long)]
    pub output: PathBuf,
    /// Number of pairs compared concurrently
    #[arg(short, long, default_value_t = DEFAULT_WORKERS, value_parser = parse_workers)]
    pub workers: usize,
    /// Rows kept from each side of a mismatched pair
    #[arg(long, default_value_t = DEFAULT_SAMPLE_ROWS)]
    pub sample_rows: usize,
    /// Decimal places floats are rounded to before comparison
    #[arg(long, default_value_t = DEFAULT_FLOAT_DECIMALS)]
    pub decimals: u32,
    /// `data_rows` value marking a query that failed to execute
    #[arg(long, default_value = EXECUTION_ERROR_SENTINEL)]
    pub sentinel: String,
}

impl CompareArgs {
    pub fn options(&self) -> CompareOptions {
        CompareOptions {
            float_decimals: self.decimals,
            sample_rows: self.sample_rows,
            sentinel: self.sentinel.clone(),
            placeholder: NONE_PLACEHOLDER.to_string(),
        }
    }
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// JSON file holding the gold sample
    #[arg(long)]
    pub gold: PathBuf,
    /// JSON file holding the candidate sample
    #[arg(long)]
    pub candidate: PathBuf,
    /// Rows shown from each side when the pair does not match
    #[arg(long, default_value_t = DEFAULT_SAMPLE_ROWS)]
    pub sample_rows: usize,
    /// Decimal places floats are rounded to before comparison
    #[arg(long, default_value_t = DEFAULT_FLOAT_DECIMALS)]
    pub decimals: u32,
    /// Print the verdict as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

impl CheckArgs {
    pub fn options(&self) -> CompareOptions {
        CompareOptions {
            float_decimals: self.decimals,
            sample_rows: self.sample_rows,
            ..CompareOptions::default()
        }
    }
}

fn parse_workers(value: &str) -> Result<usize, String> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err("worker count must be at least 1".to_string()),
        Ok(count) => Ok(count),
        Err(err) => Err(format!("invalid worker count '{value}': {err}")),
    }
}
