use crate::breakdown::Breakdown;
use crate::correlator::DiagnosticCounts;
use crate::request::CorrelatedRequest;
use crate::warmup::WarmupSummary;
use crate::window::{LoadLevelSummary, TimeWindow};
use serde::{Deserialize, Serialize};

/// Everything one analysis run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub counts: DiagnosticCounts,
    /// Requests that survived correlation, before warm-up filtering
    pub correlated_count: usize,
    pub warmup: WarmupSummary,
    pub window_seconds: u64,
    pub windows: Vec<TimeWindow>,
    pub load_levels: Vec<LoadLevelSummary>,
    pub breakdown: Breakdown,
    /// Requests retained after warm-up filtering, in correlation order
    pub requests: Vec<CorrelatedRequest>,
}

impl AnalysisReport {
    /// Requests counted across all windows
    pub fn windowed_request_count(&self) -> usize {
        self.windows.iter().map(|w| w.request_count).sum()
    }

    /// Window with the highest request rate; the earliest wins ties
    pub fn peak_window(&self) -> Option<&TimeWindow> {
        self.windows.iter().fold(None, |best, w| match best {
            Some(b) if b.requests_per_second >= w.requests_per_second => Some(b),
            _ => Some(w),
        })
    }

    pub fn coldstart_count(&self) -> usize {
        self.requests.iter().filter(|r| r.is_coldstart).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start: f64, count: usize) -> TimeWindow {
        TimeWindow {
            window_start: start,
            window_end: start + 5.0,
            request_count: count,
            requests_per_second: count as f64 / 5.0,
            mean: 1.0,
            median: 1.0,
            p50: 1.0,
            p75: 1.0,
            p90: 1.0,
            p95: 1.0,
            p99: 1.0,
            std_dev: 0.0,
            min: 1.0,
            max: 1.0,
            auth_request_count: 0,
            auth_mean: None,
            auth_p95: None,
        }
    }

    fn report(windows: Vec<TimeWindow>) -> AnalysisReport {
        AnalysisReport {
            counts: DiagnosticCounts::default(),
            correlated_count: 0,
            warmup: WarmupSummary {
                applied: false,
                warmup_seconds: 60,
                excluded_count: 0,
                cutoff: None,
            },
            window_seconds: 5,
            windows,
            load_levels: Vec::new(),
            breakdown: Breakdown::default(),
            requests: Vec::new(),
        }
    }

    #[test]
    fn test_peak_window_prefers_earliest_on_tie() {
        let r = report(vec![window(0.0, 3), window(5.0, 7), window(10.0, 7)]);
        assert_eq!(r.peak_window().map(|w| w.window_start), Some(5.0));
        assert_eq!(r.windowed_request_count(), 17);
    }

    #[test]
    fn test_empty_report() {
        let r = report(Vec::new());
        assert!(r.peak_window().is_none());
        assert_eq!(r.coldstart_count(), 0);
    }
}
