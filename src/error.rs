use serde::Serialize;
use thiserror::Error;

use crate::data::filter::Stage;

// ---------------------------------------------------------------------------
// Fatal configuration errors
// ---------------------------------------------------------------------------

/// Raised when the histogram constants cannot describe a valid axis.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("bin count must be at least 2, got {0}")]
    InvalidBinCount(usize),

    #[error("domain [{start}, {end}] must be finite with start < end")]
    InvalidDomain { start: f64, end: f64 },
}

// ---------------------------------------------------------------------------
// Recoverable data issues, reported per word
// ---------------------------------------------------------------------------

/// Data-shape problems found while processing one word.
///
/// None of these abort a run; they travel with the word's result so the
/// output files can show them next to the numbers they affect.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataIssue {
    /// Too few survivors for a filter stage; it and every later stage were skipped.
    #[error("only {remaining} interval(s) left before {stage}, remaining stages skipped")]
    InsufficientData { stage: Stage, remaining: usize },

    /// No axis point is covered, so MOM and std dev are undefined. Either
    /// nothing survived cleaning or every survivor falls between grid points.
    #[error("no axis point is covered by the {survivors} cleaned interval(s), histogram is all zero")]
    DegenerateHistogram { survivors: usize },

    /// Left endpoint greater than right endpoint. Kept as-is.
    #[error("interval #{index} has left {left} > right {right}")]
    MalformedInterval { index: usize, left: f64, right: f64 },
}

impl DataIssue {
    /// Short tag used in the statistics table.
    pub fn code(&self) -> &'static str {
        match self {
            DataIssue::InsufficientData { .. } => "insufficient_data",
            DataIssue::DegenerateHistogram { .. } => "degenerate_histogram",
            DataIssue::MalformedInterval { .. } => "malformed_interval",
        }
    }
}
