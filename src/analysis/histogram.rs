use serde::Serialize;

use crate::data::model::Interval;
use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// HistogramConfig – fixed axis for a whole run
// ---------------------------------------------------------------------------

pub const DEFAULT_BIN_COUNT: usize = 201;
pub const DEFAULT_START: f64 = 0.0;
pub const DEFAULT_END: f64 = 10.0;

/// Evenly spaced axis `start..=end` with `bin_count` points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramConfig {
    bin_count: usize,
    start: f64,
    end: f64,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            bin_count: DEFAULT_BIN_COUNT,
            start: DEFAULT_START,
            end: DEFAULT_END,
        }
    }
}

impl HistogramConfig {
    pub fn new(bin_count: usize, start: f64, end: f64) -> Result<Self, ConfigError> {
        if bin_count < 2 {
            return Err(ConfigError::InvalidBinCount(bin_count));
        }
        if !start.is_finite() || !end.is_finite() || start >= end {
            return Err(ConfigError::InvalidDomain { start, end });
        }
        Ok(Self {
            bin_count,
            start,
            end,
        })
    }

    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    pub fn spacing(&self) -> f64 {
        self.width() / (self.bin_count - 1) as f64
    }

    /// Axis values. The last point is exactly `end`.
    pub fn axis(&self) -> Vec<f64> {
        let steps = (self.bin_count - 1) as f64;
        let mut axis: Vec<f64> = (0..self.bin_count)
            .map(|i| self.start + self.width() * i as f64 / steps)
            .collect();
        if let Some(last) = axis.last_mut() {
            *last = self.end;
        }
        axis
    }
}

// ---------------------------------------------------------------------------
// Histogram – coverage counts over the axis
// ---------------------------------------------------------------------------

/// How many intervals cover each axis point, and the same counts scaled so
/// the tallest bin is 1.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub axis: Vec<f64>,
    pub counts: Vec<u32>,
    pub normalized: Vec<f64>,
    pub max_frequency: u32,
}

impl Histogram {
    /// Count intervals containing each axis point, both ends inclusive.
    ///
    /// An empty `intervals` gives all-zero counts and an all-zero
    /// normalized curve.
    pub fn build(config: &HistogramConfig, intervals: &[Interval]) -> Self {
        let axis = config.axis();
        let counts: Vec<u32> = axis
            .iter()
            .map(|&x| intervals.iter().filter(|iv| iv.contains(x)).count() as u32)
            .collect();
        let max_frequency = counts.iter().copied().max().unwrap_or(0);

        let normalized = if max_frequency == 0 {
            vec![0.0; counts.len()]
        } else {
            let max = f64::from(max_frequency);
            counts.iter().map(|&c| f64::from(c) / max).collect()
        };

        Histogram {
            axis,
            counts,
            normalized,
            max_frequency,
        }
    }

    /// Number of axis points.
    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    /// No interval covered any axis point.
    pub fn is_degenerate(&self) -> bool {
        self.max_frequency == 0
    }

    /// Indices of every bin holding the maximum count.
    pub fn peak_bins(&self) -> impl Iterator<Item = usize> + '_ {
        let max = self.max_frequency;
        self.counts
            .iter()
            .enumerate()
            .filter(move |&(_, &c)| max > 0 && c == max)
            .map(|(i, _)| i)
    }
}
