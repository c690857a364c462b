use serde::Serialize;

use super::histogram::Histogram;

/// Mode of maximum and spread of a normalized histogram.
///
/// For a degenerate (all-zero) histogram both values are NaN and
/// `degenerate` is set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryPair {
    pub mom: f64,
    pub std_dev: f64,
    pub degenerate: bool,
}

impl SummaryPair {
    pub const DEGENERATE: SummaryPair = SummaryPair {
        mom: f64::NAN,
        std_dev: f64::NAN,
        degenerate: true,
    };

    pub fn from_histogram(histogram: &Histogram) -> Self {
        if histogram.is_degenerate() || histogram.bins() < 2 {
            return Self::DEGENERATE;
        }

        // Tied peaks all contribute to the mode.
        let (sum, ties) = histogram
            .peak_bins()
            .fold((0.0, 0usize), |(sum, n), i| (sum + histogram.axis[i], n + 1));
        let mom = sum / ties as f64;

        // Normalized heights as weights; the denominator is bins - 1.
        let weighted: f64 = histogram
            .axis
            .iter()
            .zip(&histogram.normalized)
            .map(|(&x, &w)| w * (x - mom).powi(2))
            .sum();
        let std_dev = (weighted / (histogram.bins() - 1) as f64).sqrt();

        SummaryPair {
            mom,
            std_dev,
            degenerate: false,
        }
    }
}

pub fn summarize(histogram: &Histogram) -> SummaryPair {
    SummaryPair::from_histogram(histogram)
}
