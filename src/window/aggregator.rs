// Fixed-width time window aggregation
//
// Requests are bucketed by start time into contiguous half-open windows
// `[origin + k*w, origin + (k+1)*w)`, where `origin` is the earliest start.
// Only non-empty windows are produced, in ascending order. Windows are built
// lazily so a caller can stop between windows without losing finished ones.

use crate::request::CorrelatedRequest;
use crate::window::statistics::{mean, percentile, DurationSummary};
use serde::{Deserialize, Serialize};

/// Default window width in seconds
pub const DEFAULT_WINDOW_SECONDS: u64 = 5;

/// Auth P95 is only reported with at least this many auth samples
pub const MIN_AUTH_P95_SAMPLES: usize = 5;

/// Throughput and latency statistics for one time bucket
///
/// `window_start`/`window_end` are seconds since the earliest request start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub window_start: f64,
    pub window_end: f64,
    pub request_count: usize,
    pub requests_per_second: f64,
    pub mean: f64,
    pub median: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub auth_request_count: usize,
    /// `None` when the window has no auth requests
    pub auth_mean: Option<f64>,
    /// `None` when the window has too few auth requests
    pub auth_p95: Option<f64>,
}

/// Builds [`TimeWindow`]s from completed requests
#[derive(Debug, Clone)]
pub struct WindowAggregator {
    window_seconds: u64,
    min_auth_p95_samples: usize,
}

impl Default for WindowAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SECONDS)
    }
}

impl WindowAggregator {
    pub fn new(window_seconds: u64) -> Self {
        Self {
            window_seconds,
            min_auth_p95_samples: MIN_AUTH_P95_SAMPLES,
        }
    }

    /// Override the minimum auth sample count for `auth_p95`
    pub fn with_min_auth_p95_samples(mut self, samples: usize) -> Self {
        self.min_auth_p95_samples = samples;
        self
    }

    pub fn window_seconds(&self) -> u64 {
        self.window_seconds
    }

    /// Lazily iterate over non-empty windows
    ///
    /// Requests without a start time cannot be placed and are skipped. A zero
    /// window width yields no windows.
    pub fn windows<'a>(&self, requests: &'a [CorrelatedRequest]) -> Windows<'a> {
        let mut timed: Vec<&'a CorrelatedRequest> =
            requests.iter().filter(|r| r.start_time.is_some()).collect();

        let untimed = requests.len() - timed.len();
        if untimed > 0 {
            tracing::debug!(untimed, "requests without start time skipped by windowing");
        }

        if self.window_seconds == 0 {
            tracing::warn!("window width of 0 seconds; no windows produced");
            timed.clear();
        }

        // Stable: equal start times keep their correlation order
        timed.sort_by_key(|r| r.start_time);

        let offsets = match timed.first().and_then(|r| r.start_time) {
            Some(origin) => timed
                .iter()
                .map(|r| r.offset_seconds(origin).unwrap_or(0.0))
                .collect(),
            None => Vec::new(),
        };

        Windows {
            timed,
            offsets,
            cursor: 0,
            width: self.window_seconds as f64,
            min_auth_p95_samples: self.min_auth_p95_samples,
        }
    }

    /// Collect all non-empty windows
    pub fn aggregate(&self, requests: &[CorrelatedRequest]) -> Vec<TimeWindow> {
        self.windows(requests).collect()
    }
}

/// Iterator over non-empty windows, ascending by `window_start`
#[derive(Debug)]
pub struct Windows<'a> {
    timed: Vec<&'a CorrelatedRequest>,
    offsets: Vec<f64>,
    cursor: usize,
    width: f64,
    min_auth_p95_samples: usize,
}

impl Windows<'_> {
    fn bucket(&self, offset: f64) -> u64 {
        (offset / self.width).floor() as u64
    }
}

impl Iterator for Windows<'_> {
    type Item = TimeWindow;

    fn next(&mut self) -> Option<TimeWindow> {
        if self.cursor >= self.timed.len() {
            return None;
        }

        let bucket = self.bucket(self.offsets[self.cursor]);
        let first = self.cursor;
        while self.cursor < self.timed.len() && self.bucket(self.offsets[self.cursor]) == bucket {
            self.cursor += 1;
        }
        let members = &self.timed[first..self.cursor];

        let durations: Vec<f64> = members.iter().map(|r| r.duration).collect();
        let auth_durations: Vec<f64> = members
            .iter()
            .filter(|r| r.is_auth)
            .map(|r| r.duration)
            .collect();

        let summary = DurationSummary::from_durations(&durations)?;
        let window_start = bucket as f64 * self.width;

        let auth_p95 = if auth_durations.len() >= self.min_auth_p95_samples {
            percentile(&auth_durations, 95.0)
        } else {
            None
        };

        Some(TimeWindow {
            window_start,
            window_end: window_start + self.width,
            request_count: summary.count,
            requests_per_second: summary.count as f64 / self.width,
            mean: summary.mean,
            median: summary.median(),
            p50: summary.p50,
            p75: summary.p75,
            p90: summary.p90,
            p95: summary.p95,
            p99: summary.p99,
            std_dev: summary.std_dev,
            min: summary.min,
            max: summary.max,
            auth_request_count: auth_durations.len(),
            auth_mean: mean(&auth_durations),
            auth_p95,
        })
    }
}

/// Aggregate requests into windows of `window_seconds`
pub fn aggregate(requests: &[CorrelatedRequest], window_seconds: u64) -> Vec<TimeWindow> {
    WindowAggregator::new(window_seconds).aggregate(requests)
}
