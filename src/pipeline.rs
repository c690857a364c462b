use log::{debug, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::analysis::histogram::{Histogram, HistogramConfig};
use crate::analysis::summary::{summarize, SummaryPair};
use crate::data::filter::{FilterReport, IntervalFilter};
use crate::data::model::{Interval, SurveyDataset, WordRecord};
use crate::error::DataIssue;

// ---------------------------------------------------------------------------
// Per-word result
// ---------------------------------------------------------------------------

/// Everything the writers need for one word.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordResult {
    pub label: String,
    /// Answers dropped by the bad-data rule before cleaning.
    pub discarded: usize,
    pub cleaned: Vec<Interval>,
    pub report: FilterReport,
    pub histogram: Histogram,
    pub summary: SummaryPair,
    pub issues: Vec<DataIssue>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// clean → histogram → summary, once per word.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: HistogramConfig,
    filter: IntervalFilter,
    parallel: bool,
}

impl Pipeline {
    pub fn new(config: HistogramConfig) -> Self {
        Self {
            config,
            filter: IntervalFilter::new(config.width()),
            parallel: false,
        }
    }

    /// Spread words over the rayon pool. Result order is unchanged.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Results in the dataset's word order.
    pub fn run(&self, dataset: &SurveyDataset) -> Vec<WordResult> {
        if self.parallel {
            dataset
                .words
                .par_iter()
                .map(|w| self.process_word(w))
                .collect()
        } else {
            dataset.words.iter().map(|w| self.process_word(w)).collect()
        }
    }

    pub fn process_word(&self, word: &WordRecord) -> WordResult {
        let mut issues: Vec<DataIssue> = word
            .intervals
            .iter()
            .enumerate()
            .filter(|(_, iv)| iv.is_malformed())
            .map(|(index, iv)| DataIssue::MalformedInterval {
                index,
                left: iv.left,
                right: iv.right,
            })
            .collect();

        let outcome = self.filter.clean(&word.intervals);
        issues.extend(outcome.issues);

        let histogram = Histogram::build(&self.config, &outcome.intervals);
        let summary = summarize(&histogram);
        if summary.degenerate {
            issues.push(DataIssue::DegenerateHistogram {
                survivors: outcome.intervals.len(),
            });
        }

        debug!(
            "'{}': {} -> {} intervals {:?}",
            word.label,
            word.intervals.len(),
            outcome.intervals.len(),
            outcome.report
        );
        for issue in &issues {
            warn!("'{}': {issue}", word.label);
        }

        WordResult {
            label: word.label.clone(),
            discarded: word.discarded,
            cleaned: outcome.intervals,
            report: outcome.report,
            histogram,
            summary,
            issues,
        }
    }
}
