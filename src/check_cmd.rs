use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::CheckArgs,
    pair::evaluate_records,
    render::render_verdict,
};

fn load_sample(path: &Path) -> Result<serde_json::Value> {
    let file = File::open(path).with_context(|| format!("Opening sample file {path:?}"))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Parsing sample from {path:?}"))
}

pub fn execute(args: &CheckArgs) -> Result<()> {
    let gold = load_sample(&args.gold)?;
    let candidate = load_sample(&args.candidate)?;
    let options = args.options();

    let verdict = evaluate_records(0, &gold, &candidate, &options);
    info!("Checked {:?} against {:?}: {}", args.candidate, args.gold, verdict.category);

    if args.json {
        let rendered =
            serde_json::to_string_pretty(&verdict).context("Serializing verdict to JSON")?;
        println!("{rendered}");
    } else {
        print!("{}", render_verdict(&verdict, &gold, &candidate, options.sample_rows));
    }
    Ok(())
}
