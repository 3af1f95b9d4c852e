pub mod categorize;
pub mod check_cmd;
pub mod cli;
pub mod columns;
pub mod data;
pub mod equivalence;
pub mod normalize;
pub mod pair;
pub mod render;
pub mod report;
pub mod rows;
pub mod schema;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

pub use crate::{
    equivalence::{MatchOutcome, check, evaluate},
    pair::{CompareOptions, PairCategory, PairVerdict, Sample, evaluate_pair, evaluate_records},
    table::Table,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("query_oracle", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Compare(args) => report::execute(&args),
        Commands::Check(args) => check_cmd::execute(&args),
    }
}
