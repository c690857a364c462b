use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use serde::Deserialize;

use super::model::{Interval, SurveyDataset, WordRecord};
use crate::analysis::histogram::HistogramConfig;

// ---------------------------------------------------------------------------
// Bad-data rule
// ---------------------------------------------------------------------------

/// Which answers are dropped before the word ever reaches the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BadDataPolicy {
    /// Only the full-scale `(start, end)` "no answer" response.
    #[default]
    FullScaleOnly,
    /// Also endpoints off the scale, inverted pairs, and full-width lengths.
    Strict,
}

#[derive(Debug, Clone, Copy)]
pub struct Ingest {
    pub policy: BadDataPolicy,
    pub start: f64,
    pub end: f64,
}

impl Ingest {
    pub fn new(policy: BadDataPolicy, config: &HistogramConfig) -> Self {
        Self {
            policy,
            start: config.start(),
            end: config.end(),
        }
    }

    pub fn is_bad(&self, iv: &Interval) -> bool {
        if iv.is_full_scale(self.start, self.end) {
            return true;
        }
        match self.policy {
            BadDataPolicy::FullScaleOnly => false,
            BadDataPolicy::Strict => {
                iv.left < self.start
                    || iv.right > self.end
                    || iv.is_malformed()
                    || iv.length() >= self.end - self.start
            }
        }
    }

    fn push(&self, word: &mut WordRecord, iv: Interval) {
        if self.is_bad(&iv) {
            word.discarded += 1;
        } else {
            word.intervals.push(iv);
        }
    }
}

impl Default for Ingest {
    fn default() -> Self {
        Self::new(BadDataPolicy::default(), &HistogramConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a survey from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`  – header of word labels, two endpoint columns per word
/// * `.json` – `[{ "label": "...", "intervals": [[l, r], ...] }, ...]`
pub fn load_file(path: &Path, ingest: &Ingest) -> Result<SurveyDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let file = std::fs::File::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let dataset = match ext.as_str() {
        "csv" => read_csv(file, ingest),
        "json" => read_json(file, ingest),
        other => bail!("Unsupported file extension: .{other}"),
    }?;
    if dataset.is_empty() {
        bail!("{} contains no words", path.display());
    }

    info!(
        "loaded {} words, {} intervals ({} discarded as bad data) from {}",
        dataset.len(),
        dataset.interval_count(),
        dataset.discarded_count(),
        path.display()
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with the word labels.
/// Word `k` owns columns `2k` (left endpoint) and `2k + 1` (right endpoint);
/// empty header cells are skipped when collecting labels:
///   `Little,,Some,,A lot,`
///   `0.5,2,3,6,7,9.5`
/// A pair left empty is a missing answer.
pub fn read_csv<R: Read>(source: R, ingest: &Ingest) -> Result<SurveyDataset> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader.headers().context("reading CSV headers")?;
    let mut words: Vec<WordRecord> = Vec::new();
    for label in headers.iter().filter(|h| !h.is_empty()) {
        if words.iter().any(|w| w.label == label) {
            bail!("CSV header repeats word '{label}'");
        }
        words.push(WordRecord::new(label));
    }
    if words.is_empty() {
        bail!("CSV header has no word labels");
    }

    // Line numbers are 1-based and count the header; columns are 1-based.
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV line {}", row_no + 2))?;
        let line = record.position().map_or(row_no as u64 + 2, |p| p.line());
        let cells: Vec<&str> = record.iter().collect();

        for (pair_idx, pair) in cells.chunks(2).enumerate() {
            let (left, right) = match pair {
                [l, r] => (*l, *r),
                [l] => (*l, ""),
                _ => continue,
            };
            if left.is_empty() && right.is_empty() {
                continue;
            }
            let Some(word) = words.get_mut(pair_idx) else {
                bail!(
                    "CSV line {line}, columns {}-{}: values have no word",
                    2 * pair_idx + 1,
                    2 * pair_idx + 2
                );
            };
            if left.is_empty() || right.is_empty() {
                warn!(
                    "CSV line {line}: '{}' has only one endpoint, skipped",
                    word.label
                );
                continue;
            }
            let l = parse_endpoint(left, line, 2 * pair_idx + 1)?;
            let r = parse_endpoint(right, line, 2 * pair_idx + 2)?;
            ingest.push(word, Interval::new(l, r));
        }
    }

    Ok(SurveyDataset::from_words(words))
}

/// NaN and infinities parse as `f64` but would poison every fence for the word.
fn parse_endpoint(cell: &str, line: u64, col: usize) -> Result<f64> {
    let value = cell
        .parse::<f64>()
        .with_context(|| format!("CSV line {line}, column {col}: '{cell}' is not a number"))?;
    if !value.is_finite() {
        bail!("CSV line {line}, column {col}: '{cell}' is not a finite number");
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct JsonWord {
    label: String,
    #[serde(default)]
    intervals: Vec<Interval>,
}

/// Expected JSON schema, one object per word in output order:
///
/// ```json
/// [
///   { "label": "Some", "intervals": [[2.0, 5.0], [3.0, 6.5]] },
///   ...
/// ]
/// ```
pub fn read_json<R: Read>(source: R, ingest: &Ingest) -> Result<SurveyDataset> {
    let records: Vec<JsonWord> = serde_json::from_reader(source).context("parsing JSON")?;

    let mut words: Vec<WordRecord> = Vec::with_capacity(records.len());
    for rec in records {
        if words.iter().any(|w| w.label == rec.label) {
            bail!("JSON repeats word '{}'", rec.label);
        }
        let mut word = WordRecord::new(rec.label);
        for (i, iv) in rec.intervals.into_iter().enumerate() {
            if !iv.is_finite() {
                bail!("JSON word '{}', interval {i}: {iv:?} is not finite", word.label);
            }
            ingest.push(&mut word, iv);
        }
        words.push(word);
    }

    Ok(SurveyDataset::from_words(words))
}
