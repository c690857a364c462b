use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Interval – one respondent's answer for one word
// ---------------------------------------------------------------------------

/// A `(left, right)` endpoint pair on the survey scale.
///
/// `left <= right` is expected but not enforced: malformed answers are kept
/// as they were read and flagged further down the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Interval {
    pub left: f64,
    pub right: f64,
}

impl Interval {
    pub const fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    pub fn length(&self) -> f64 {
        self.right - self.left
    }

    /// Inclusive on both ends.
    pub fn contains(&self, x: f64) -> bool {
        self.left <= x && x <= self.right
    }

    pub fn is_finite(&self) -> bool {
        self.left.is_finite() && self.right.is_finite()
    }

    pub fn is_malformed(&self) -> bool {
        self.left > self.right
    }

    /// The "no answer" response covering the whole scale.
    pub fn is_full_scale(&self, start: f64, end: f64) -> bool {
        self.left == start && self.right == end
    }
}

impl From<[f64; 2]> for Interval {
    fn from([left, right]: [f64; 2]) -> Self {
        Self { left, right }
    }
}

impl From<Interval> for [f64; 2] {
    fn from(iv: Interval) -> Self {
        [iv.left, iv.right]
    }
}

// ---------------------------------------------------------------------------
// WordRecord – every answer collected for one word
// ---------------------------------------------------------------------------

/// A word label with its intervals in row order.
#[derive(Debug, Clone, PartialEq)]
pub struct WordRecord {
    pub label: String,
    pub intervals: Vec<Interval>,
    /// Answers dropped during ingestion by the bad-data rule.
    pub discarded: usize,
}

impl WordRecord {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            intervals: Vec::new(),
            discarded: 0,
        }
    }

    pub fn with_intervals(label: impl Into<String>, intervals: Vec<Interval>) -> Self {
        Self {
            label: label.into(),
            intervals,
            discarded: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// SurveyDataset – the complete loaded survey
// ---------------------------------------------------------------------------

/// All words in the order their labels first appear in the source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurveyDataset {
    pub words: Vec<WordRecord>,
}

impl SurveyDataset {
    pub fn from_words(words: Vec<WordRecord>) -> Self {
        Self { words }
    }

    /// Number of words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the dataset has no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Intervals kept across all words.
    pub fn interval_count(&self) -> usize {
        self.words.iter().map(|w| w.intervals.len()).sum()
    }

    /// Intervals dropped by the bad-data rule across all words.
    pub fn discarded_count(&self) -> usize {
        self.words.iter().map(|w| w.discarded).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_inclusive() {
        let iv = Interval::new(2.0, 4.0);
        assert!(iv.contains(2.0));
        assert!(iv.contains(4.0));
        assert!(!iv.contains(4.000001));
        assert_eq!(iv.length(), 2.0);
    }

    #[test]
    fn full_scale_requires_exact_endpoints() {
        assert!(Interval::new(0.0, 10.0).is_full_scale(0.0, 10.0));
        assert!(!Interval::new(0.0, 9.99).is_full_scale(0.0, 10.0));
        assert!(Interval::new(6.0, 5.0).is_malformed());
        assert!(!Interval::new(f64::NAN, 5.0).is_finite());
    }

    #[test]
    fn interval_serializes_as_pair() {
        let json = serde_json::to_string(&Interval::new(1.5, 3.0)).unwrap();
        assert_eq!(json, "[1.5,3.0]");
        let back: Interval = serde_json::from_str("[2,7]").unwrap();
        assert_eq!(back, Interval::new(2.0, 7.0));
    }

    #[test]
    fn dataset_totals() {
        let mut w = WordRecord::with_intervals("some", vec![Interval::new(1.0, 2.0)]);
        w.discarded = 2;
        let ds = SurveyDataset::from_words(vec![w, WordRecord::new("none")]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.interval_count(), 1);
        assert_eq!(ds.discarded_count(), 2);
    }
}
