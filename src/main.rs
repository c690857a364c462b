mod analysis;
mod cli;
mod data;
mod error;
mod pipeline;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use analysis::histogram::HistogramConfig;
use cli::Cli;
use data::loader::{load_file, BadDataPolicy, Ingest};
use data::writer::{write_all, OutputOptions};
use pipeline::Pipeline;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config =
        HistogramConfig::new(cli.bins, cli.start, cli.end).context("invalid histogram axis")?;
    let policy = if cli.strict {
        BadDataPolicy::Strict
    } else {
        BadDataPolicy::FullScaleOnly
    };

    info!(
        "axis: {} points over [{}, {}]",
        config.bin_count(),
        config.start(),
        config.end()
    );

    let dataset = load_file(&cli.input, &Ingest::new(policy, &config))?;
    let results = Pipeline::new(config).parallel(cli.parallel).run(&dataset);

    let degenerate = results.iter().filter(|r| r.summary.degenerate).count();
    info!(
        "processed {} words, {} with an all-zero histogram",
        results.len(),
        degenerate
    );

    let options = OutputOptions {
        out_dir: cli.out_dir,
        histogram_format: cli.histogram_format,
        json_summary: cli.json,
    };
    write_all(&results, &config, &options)?;
    Ok(())
}
