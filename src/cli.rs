use std::path::PathBuf;

use clap::Parser;

use crate::analysis::histogram::{DEFAULT_BIN_COUNT, DEFAULT_END, DEFAULT_START};
use crate::data::writer::HistogramFormat;

/// Clean interval survey data and build a membership histogram per word
#[derive(Debug, Parser)]
#[command(name = "interval-approach", version, about)]
pub struct Cli {
    /// Survey file (.csv or .json)
    pub input: PathBuf,

    /// Directory for cleaned.csv, histograms and statistics.csv
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Number of histogram axis points
    #[arg(long, default_value_t = DEFAULT_BIN_COUNT)]
    pub bins: usize,

    /// Lowest value on the answer scale
    #[arg(long, default_value_t = DEFAULT_START, allow_negative_numbers = true)]
    pub start: f64,

    /// Highest value on the answer scale
    #[arg(long, default_value_t = DEFAULT_END, allow_negative_numbers = true)]
    pub end: f64,

    /// Also drop off-scale, inverted and full-width answers on load
    #[arg(long)]
    pub strict: bool,

    /// Process words in parallel
    #[arg(long)]
    pub parallel: bool,

    /// File format for the histogram table
    #[arg(long, value_enum, default_value_t = HistogramFormat::Csv)]
    pub histogram_format: HistogramFormat,

    /// Also write summary.json with every per-word result
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
