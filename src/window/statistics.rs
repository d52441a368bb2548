// Duration statistics for windows and breakdowns
//
// Moments (mean, population standard deviation) use trueno's SIMD vector
// kernels over the sample shifted by its minimum, so f32 only carries the
// spread and not the magnitude. Order statistics use linear interpolation
// between closest ranks over the sorted sample, the default method of numpy
// and R-7.

use serde::{Deserialize, Serialize};

/// Summary statistics over a set of durations (milliseconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationSummary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl DurationSummary {
    /// Summarize a sample; `None` for an empty sample
    pub fn from_durations(durations: &[f64]) -> Option<Self> {
        if durations.is_empty() {
            return None;
        }

        let moments = Moments::of(durations);
        let sorted = sorted_copy(durations);

        Some(Self {
            count: durations.len(),
            mean: moments.mean,
            std_dev: moments.std_dev,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            p50: percentile_sorted(&sorted, 50.0),
            p75: percentile_sorted(&sorted, 75.0),
            p90: percentile_sorted(&sorted, 90.0),
            p95: percentile_sorted(&sorted, 95.0),
            p99: percentile_sorted(&sorted, 99.0),
        })
    }

    /// Median (P50)
    pub fn median(&self) -> f64 {
        self.p50
    }
}

/// Mean and population standard deviation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub mean: f64,
    pub std_dev: f64,
}

impl Moments {
    /// Compute moments with trueno; both are 0.0 for an empty sample
    ///
    /// The mean is kept inside `[min, max]` and the standard deviation is
    /// finite and non-negative.
    pub fn of(durations: &[f64]) -> Self {
        if durations.is_empty() {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
            };
        }

        let min = durations.iter().copied().fold(f64::INFINITY, f64::min);
        let max = durations.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let shifted: Vec<f32> = durations.iter().map(|&d| (d - min) as f32).collect();
        let v = trueno::Vector::from_slice(&shifted);

        let offset = f64::from(v.mean().unwrap_or(0.0));
        let mean = if offset.is_finite() {
            (min + offset).max(min).min(max)
        } else {
            min
        };

        // E[x^2] - E[x]^2 can round below zero for near-constant samples
        let std_dev = f64::from(v.stddev().unwrap_or(0.0));
        let std_dev = if std_dev.is_finite() && std_dev > 0.0 {
            std_dev
        } else {
            0.0
        };

        Self { mean, std_dev }
    }
}

/// Mean of a sample, `None` when empty
pub fn mean(durations: &[f64]) -> Option<f64> {
    if durations.is_empty() {
        None
    } else {
        Some(Moments::of(durations).mean)
    }
}

/// Percentile (0-100) of an unsorted sample, `None` when empty
pub fn percentile(durations: &[f64], pct: f64) -> Option<f64> {
    if durations.is_empty() {
        return None;
    }
    Some(percentile_sorted(&sorted_copy(durations), pct))
}

/// Linear-interpolation percentile over an ascending, non-empty sample
///
/// The rank is `pct/100 * (n-1)`; values between ranks are interpolated.
pub fn percentile_sorted(sorted: &[f64], pct: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }

    let pct = pct.clamp(0.0, 100.0);
    let index = (pct / 100.0) * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted[lower]
    } else {
        let weight = index - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}

fn sorted_copy(durations: &[f64]) -> Vec<f64> {
    let mut sorted = durations.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}
