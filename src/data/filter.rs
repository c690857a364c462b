use std::fmt;

use log::trace;
use serde::Serialize;

use super::model::Interval;
use crate::error::DataIssue;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Two-sided tolerance factors for a normal population (95% coverage at 95%
/// confidence), indexed by `min(n - 1, 24)`.
pub const TOLERANCE_FACTORS: [f64; 25] = [
    32.019, 32.019, 8.380, 5.369, 4.275, 3.712, 3.369, 3.136, 2.967, 2.839, 2.737, 2.655, 2.587,
    2.529, 2.48, 2.437, 2.4, 2.366, 2.337, 2.31, 2.31, 2.31, 2.31, 2.31, 2.208,
];

/// Smallest population a stage will run on.
pub const MIN_POPULATION: usize = 2;

const IQR_FENCE: f64 = 1.5;
const BARRIER_OFFSET: f64 = 0.01;

// ---------------------------------------------------------------------------
// Stage – the five rejection passes, in execution order
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    EndpointIqr,
    LengthIqr,
    EndpointTolerance,
    LengthTolerance,
    Reasonable,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::EndpointIqr,
        Stage::LengthIqr,
        Stage::EndpointTolerance,
        Stage::LengthTolerance,
        Stage::Reasonable,
    ];

    fn position(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::EndpointIqr => "endpoint IQR",
            Stage::LengthIqr => "length IQR",
            Stage::EndpointTolerance => "endpoint tolerance",
            Stage::LengthTolerance => "length tolerance",
            Stage::Reasonable => "reasonable interval",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Filter output
// ---------------------------------------------------------------------------

/// Survivor count after each stage. A skipped stage repeats the count it
/// was handed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterReport {
    pub input: usize,
    pub after_endpoint_iqr: usize,
    pub after_length_iqr: usize,
    pub after_endpoint_tolerance: usize,
    pub after_length_tolerance: usize,
    pub after_reasonable: usize,
}

impl FilterReport {
    fn new(input: usize) -> Self {
        Self {
            input,
            after_endpoint_iqr: input,
            after_length_iqr: input,
            after_endpoint_tolerance: input,
            after_length_tolerance: input,
            after_reasonable: input,
        }
    }

    /// Set `stage` and every later stage to `count`.
    fn record_from(&mut self, stage: Stage, count: usize) {
        for later in &Stage::ALL[stage.position()..] {
            *self.slot(*later) = count;
        }
    }

    fn slot(&mut self, stage: Stage) -> &mut usize {
        match stage {
            Stage::EndpointIqr => &mut self.after_endpoint_iqr,
            Stage::LengthIqr => &mut self.after_length_iqr,
            Stage::EndpointTolerance => &mut self.after_endpoint_tolerance,
            Stage::LengthTolerance => &mut self.after_length_tolerance,
            Stage::Reasonable => &mut self.after_reasonable,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    /// Survivors, in their original relative order.
    pub intervals: Vec<Interval>,
    pub report: FilterReport,
    pub issues: Vec<DataIssue>,
}

// ---------------------------------------------------------------------------
// IntervalFilter
// ---------------------------------------------------------------------------

/// One interval with its length, removed as a unit.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    interval: Interval,
    length: f64,
}

impl From<&Interval> for Candidate {
    fn from(iv: &Interval) -> Self {
        Candidate {
            interval: *iv,
            length: iv.length(),
        }
    }
}

/// Outlier and consistency filter for one word's intervals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalFilter {
    /// Width of the answer scale; caps the length tolerance band.
    domain_width: f64,
}

impl Default for IntervalFilter {
    fn default() -> Self {
        Self { domain_width: 10.0 }
    }
}

impl IntervalFilter {
    pub fn new(domain_width: f64) -> Self {
        Self { domain_width }
    }

    /// Run every stage in order over a copy of `intervals`.
    ///
    /// Thresholds are recomputed on the survivors of the previous stage.
    /// Once fewer than [`MIN_POPULATION`] intervals remain, the remaining
    /// stages are skipped and an [`DataIssue::InsufficientData`] is recorded.
    pub fn clean(&self, intervals: &[Interval]) -> FilterOutcome {
        let mut pool: Vec<Candidate> = intervals.iter().map(Candidate::from).collect();
        let mut report = FilterReport::new(pool.len());
        let mut issues = Vec::new();

        for stage in Stage::ALL {
            if pool.len() < MIN_POPULATION {
                issues.push(DataIssue::InsufficientData {
                    stage,
                    remaining: pool.len(),
                });
                report.record_from(stage, pool.len());
                break;
            }
            match stage {
                Stage::EndpointIqr => endpoint_iqr(&mut pool),
                Stage::LengthIqr => length_iqr(&mut pool),
                Stage::EndpointTolerance => endpoint_tolerance(&mut pool),
                Stage::LengthTolerance => self.length_tolerance(&mut pool),
                Stage::Reasonable => reasonable(&mut pool),
            }
            trace!("{stage}: {} left", pool.len());
            report.record_from(stage, pool.len());
        }

        FilterOutcome {
            intervals: pool.into_iter().map(|c| c.interval).collect(),
            report,
            issues,
        }
    }

    fn length_tolerance(&self, pool: &mut Vec<Candidate>) {
        let lengths = Moments::of(pool.iter().map(|c| c.length));
        let k = length_tolerance_factor(&lengths, pool.len(), self.domain_width);
        pool.retain(|c| lengths.within(c.length, k));
    }
}

/// Clean with the default 0..10 scale, discarding the report.
pub fn clean(intervals: &[Interval]) -> Vec<Interval> {
    IntervalFilter::default().clean(intervals).intervals
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

fn endpoint_iqr(pool: &mut Vec<Candidate>) {
    let left = Fence::from_quartiles(order_statistic_quartiles(&sorted(
        pool.iter().map(|c| c.interval.left),
    )));
    let right = Fence::from_quartiles(order_statistic_quartiles(&sorted(
        pool.iter().map(|c| c.interval.right),
    )));
    pool.retain(|c| left.admits(c.interval.left) && right.admits(c.interval.right));
}

fn length_iqr(pool: &mut Vec<Candidate>) {
    let fence = Fence::from_quartiles(paired_quartiles(&sorted(
        pool.iter().map(|c| c.length),
    )));
    pool.retain(|c| fence.admits(c.length));
}

fn endpoint_tolerance(pool: &mut Vec<Candidate>) {
    let k = tolerance_factor(pool.len());
    let left = Moments::of(pool.iter().map(|c| c.interval.left));
    let right = Moments::of(pool.iter().map(|c| c.interval.right));
    pool.retain(|c| left.within(c.interval.left, k) && right.within(c.interval.right, k));
}

fn reasonable(pool: &mut Vec<Candidate>) {
    let left = Moments::of(pool.iter().map(|c| c.interval.left));
    let right = Moments::of(pool.iter().map(|c| c.interval.right));
    let b = barrier(&left, &right);
    let left_floor = 2.0 * left.mean - b;
    let right_ceiling = 2.0 * right.mean - b;
    pool.retain(|c| {
        let Interval { left, right } = c.interval;
        left < b && right > b && left >= left_floor && right <= right_ceiling
    });
}

// ---------------------------------------------------------------------------
// Order statistics
// ---------------------------------------------------------------------------

fn sorted(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut v: Vec<f64> = values.collect();
    v.sort_by(f64::total_cmp);
    v
}

/// `(floor(0.25 n), floor(0.75 n))`.
fn quartile_indices(n: usize) -> (usize, usize) {
    (n / 4, 3 * n / 4)
}

/// Single order statistic at each quartile index. `sorted` must be non-empty.
fn order_statistic_quartiles(sorted: &[f64]) -> (f64, f64) {
    let (nn1, nn2) = quartile_indices(sorted.len());
    (sorted[nn1], sorted[nn2])
}

/// Mean of the order statistic at each quartile index and its successor.
/// The successor index is clamped to the last element.
fn paired_quartiles(sorted: &[f64]) -> (f64, f64) {
    let last = sorted.len() - 1;
    let (nn1, nn2) = quartile_indices(sorted.len());
    let pair = |i: usize| (sorted[i] + sorted[(i + 1).min(last)]) / 2.0;
    (pair(nn1), pair(nn2))
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Fence {
    low: f64,
    high: f64,
}

impl Fence {
    fn from_quartiles((q25, q75): (f64, f64)) -> Self {
        let iqr = q75 - q25;
        Fence {
            low: q25 - IQR_FENCE * iqr,
            high: q75 + IQR_FENCE * iqr,
        }
    }

    fn admits(&self, x: f64) -> bool {
        self.low <= x && x <= self.high
    }
}

// ---------------------------------------------------------------------------
// Moments and tolerance limits
// ---------------------------------------------------------------------------

/// Mean and population standard deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Moments {
    mean: f64,
    std: f64,
}

impl Moments {
    fn of(values: impl Iterator<Item = f64> + Clone) -> Self {
        let n = values.clone().count();
        if n == 0 {
            return Moments { mean: 0.0, std: 0.0 };
        }
        let mean = values.clone().sum::<f64>() / n as f64;
        let var = values.map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        Moments {
            mean,
            std: var.sqrt(),
        }
    }

    fn within(&self, x: f64, k: f64) -> bool {
        (x - self.mean).abs() <= k * self.std
    }
}

fn tolerance_factor(n: usize) -> f64 {
    TOLERANCE_FACTORS[n.saturating_sub(1).min(TOLERANCE_FACTORS.len() - 1)]
}

/// Table factor, narrowed so `mean ± k·std` stays inside `[0, domain_width]`.
fn length_tolerance_factor(lengths: &Moments, n: usize, domain_width: f64) -> f64 {
    let k = tolerance_factor(n);
    if lengths.std > 0.0 {
        k.min(lengths.mean / lengths.std)
            .min((domain_width - lengths.mean) / lengths.std)
    } else {
        k
    }
}

/// Point separating the left-endpoint and right-endpoint distributions.
///
/// With both spreads non-zero and unequal this is where the two normal
/// densities cross; root 1 is taken when it lies in `[mean_l, mean_r]`,
/// otherwise root 2.
fn barrier(left: &Moments, right: &Moments) -> f64 {
    let (ml, sl) = (left.mean, left.std);
    let (mr, sr) = (right.mean, right.std);

    if sl == sr {
        (ml + mr) / 2.0
    } else if sl == 0.0 {
        ml + BARRIER_OFFSET
    } else if sr == 0.0 {
        mr - BARRIER_OFFSET
    } else {
        let (vl, vr) = (sl * sl, sr * sr);
        let disc = ((ml - mr).powi(2) + 2.0 * (vl - vr) * (sl / sr).ln()).max(0.0);
        let spread = sl * sr * disc.sqrt();
        let base = mr * vl - ml * vr;
        let b1 = (base + spread) / (vl - vr);
        let b2 = (base - spread) / (vl - vr);
        if (ml..=mr).contains(&b1) {
            b1
        } else {
            b2
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ivs(pairs: &[(f64, f64)]) -> Vec<Interval> {
        pairs.iter().map(|&(l, r)| Interval::new(l, r)).collect()
    }

    fn pool(pairs: &[(f64, f64)]) -> Vec<Candidate> {
        ivs(pairs).iter().map(Candidate::from).collect()
    }

    fn is_subsequence(sub: &[Interval], full: &[Interval]) -> bool {
        let mut it = full.iter();
        sub.iter().all(|s| it.any(|f| f == s))
    }

    fn normal_pdf(x: f64, mean: f64, std: f64) -> f64 {
        let z = (x - mean) / std;
        (-0.5 * z * z).exp() / (std * (2.0 * std::f64::consts::PI).sqrt())
    }

    fn survey() -> Vec<Interval> {
        ivs(&[
            (2.0, 5.0),
            (2.5, 6.0),
            (1.5, 5.5),
            (3.0, 6.5),
            (2.0, 6.0),
            (9.0, 9.5),
            (2.2, 5.8),
            (1.8, 6.2),
            (0.5, 9.0),
            (2.6, 5.4),
            (3.1, 6.1),
            (2.4, 5.9),
        ])
    }

    #[test]
    fn repeated_interval_survives_and_outlier_goes() {
        let mut input = vec![Interval::new(2.0, 4.0); 20];
        input.push(Interval::new(9.9, 10.0));

        let out = IntervalFilter::default().clean(&input);
        assert_eq!(out.intervals, vec![Interval::new(2.0, 4.0); 20]);
        assert_eq!(out.report.input, 21);
        assert_eq!(out.report.after_endpoint_iqr, 20);
        assert_eq!(out.report.after_reasonable, 20);
        assert!(out.issues.is_empty());
    }

    #[test]
    fn output_is_ordered_subsequence_of_input() {
        let input = survey();
        let out = clean(&input);
        assert!(out.len() <= input.len());
        assert!(is_subsequence(&out, &input));
        assert!(!out.contains(&Interval::new(9.0, 9.5)));
    }

    #[test]
    fn repeated_cleaning_reaches_fixed_point() {
        let mut current = survey();
        for _ in 0..current.len() + 1 {
            let next = clean(&current);
            if next.len() == current.len() {
                break;
            }
            current = next;
        }
        assert_eq!(clean(&current), current);
    }

    #[test]
    fn input_is_not_mutated() {
        let input = survey();
        let copy = input.clone();
        let _ = clean(&input);
        assert_eq!(input, copy);
    }

    #[test]
    fn tiny_populations_skip_all_stages() {
        let out = IntervalFilter::default().clean(&[]);
        assert!(out.intervals.is_empty());
        assert_eq!(
            out.issues,
            vec![DataIssue::InsufficientData {
                stage: Stage::EndpointIqr,
                remaining: 0
            }]
        );

        let single = ivs(&[(3.0, 4.0)]);
        let out = IntervalFilter::default().clean(&single);
        assert_eq!(out.intervals, single);
        assert_eq!(out.report, FilterReport::new(1));
    }

    #[test]
    fn stage_that_leaves_one_interval_ends_cleaning() {
        // Left fence [2, 2] drops the last two, right fence [4, 4] the first two.
        let input = ivs(&[(2.0, 3.0), (2.0, 9.0), (2.0, 4.0), (0.5, 4.0), (3.5, 4.0)]);
        let out = IntervalFilter::default().clean(&input);
        assert_eq!(out.intervals, ivs(&[(2.0, 4.0)]));
        assert_eq!(out.report.input, 5);
        assert_eq!(out.report.after_endpoint_iqr, 1);
        assert_eq!(out.report.after_length_iqr, 1);
        assert_eq!(out.report.after_reasonable, 1);
        assert_eq!(
            out.issues,
            vec![DataIssue::InsufficientData {
                stage: Stage::LengthIqr,
                remaining: 1
            }]
        );
    }

    #[test]
    fn endpoint_iqr_stage_count_is_reported() {
        let input = ivs(&[(2.0, 4.0), (2.0, 4.0), (2.0, 4.0), (2.0, 4.0), (2.0, 9.0)]);
        let out = IntervalFilter::default().clean(&input);
        assert_eq!(out.report.after_endpoint_iqr, 4);
        assert_eq!(out.intervals, vec![Interval::new(2.0, 4.0); 4]);
    }

    #[test]
    fn quartile_successor_is_clamped_on_small_samples() {
        for n in 1..=4usize {
            let sorted: Vec<f64> = (0..n).map(|i| i as f64).collect();
            let (q25, q75) = paired_quartiles(&sorted);
            assert!(q25 <= q75, "n = {n}");
            assert!(q75 <= (n - 1) as f64, "n = {n}");
        }
        assert_eq!(paired_quartiles(&[5.0]), (5.0, 5.0));
        assert_eq!(paired_quartiles(&[1.0, 2.0, 3.0, 4.0]), (2.5, 4.0));
        assert_eq!(order_statistic_quartiles(&[1.0, 2.0, 3.0, 4.0]), (2.0, 4.0));
    }

    #[test]
    fn endpoint_iqr_rejects_left_outlier() {
        let mut p = pool(&[(2.0, 5.0); 7]);
        p.push(Candidate::from(&Interval::new(0.1, 5.0)));
        endpoint_iqr(&mut p);
        assert_eq!(p.len(), 7);
        assert!(p.iter().all(|c| c.interval.left == 2.0));
    }

    #[test]
    fn length_iqr_uses_paired_quartiles() {
        let mut p = pool(&[(3.0, 4.0); 11]);
        p.push(Candidate::from(&Interval::new(2.0, 8.0)));
        // NN = 3 and 9: q25 = q75 = (1 + 1) / 2, so the fence is [1, 1].
        length_iqr(&mut p);
        assert_eq!(p.len(), 11);
        assert!(p.iter().all(|c| c.length == 1.0));

        // NN + 1 lands on the outlier and pulls q75 halfway to it.
        assert_eq!(paired_quartiles(&[1.0, 1.0, 1.0, 1.0, 6.0]), (1.0, 3.5));
    }

    #[test]
    fn tolerance_factor_lookup() {
        assert_eq!(tolerance_factor(1), 32.019);
        assert_eq!(tolerance_factor(3), 8.380);
        assert_eq!(tolerance_factor(20), 2.31);
        assert_eq!(tolerance_factor(25), 2.208);
        assert_eq!(tolerance_factor(400), 2.208);
    }

    #[test]
    fn length_factor_is_capped_by_domain() {
        let m = Moments {
            mean: 1.0,
            std: 1.0,
        };
        assert_eq!(length_tolerance_factor(&m, 10, 10.0), 1.0);

        let m = Moments {
            mean: 9.0,
            std: 0.5,
        };
        assert_eq!(length_tolerance_factor(&m, 10, 10.0), 2.0);

        let flat = Moments {
            mean: 2.0,
            std: 0.0,
        };
        assert_eq!(length_tolerance_factor(&flat, 10, 10.0), 2.839);
    }

    #[test]
    fn endpoint_tolerance_keeps_zero_spread() {
        let mut p = pool(&[(2.0, 4.0); 5]);
        endpoint_tolerance(&mut p);
        assert_eq!(p.len(), 5);
    }

    #[test]
    fn barrier_special_cases() {
        let l = Moments {
            mean: 2.0,
            std: 1.0,
        };
        let r = Moments {
            mean: 6.0,
            std: 1.0,
        };
        assert_eq!(barrier(&l, &r), 4.0);

        let flat_l = Moments {
            mean: 2.0,
            std: 0.0,
        };
        assert_relative_eq!(barrier(&flat_l, &r), 2.01);

        let flat_r = Moments {
            mean: 6.0,
            std: 0.0,
        };
        assert_relative_eq!(barrier(&l, &flat_r), 5.99);
    }

    #[test]
    fn barrier_is_density_crossing() {
        let l = Moments {
            mean: 3.0,
            std: 1.0,
        };
        let r = Moments {
            mean: 7.0,
            std: 2.0,
        };
        let b = barrier(&l, &r);
        assert!((3.0..=7.0).contains(&b));
        assert_relative_eq!(
            normal_pdf(b, 3.0, 1.0),
            normal_pdf(b, 7.0, 2.0),
            max_relative = 1e-9
        );
    }

    #[test]
    fn reasonable_rejects_overlapping_answers() {
        // Means 2 and 5, equal spread, barrier 3.5.
        let mut p = pool(&[(0.0, 3.0), (4.0, 7.0)]);
        reasonable(&mut p);
        assert!(p.is_empty());

        // Means 2 and 6, barrier 4.
        let mut p = pool(&[(1.0, 7.0), (3.0, 5.0)]);
        reasonable(&mut p);
        assert_eq!(p.len(), 2);
    }
}
