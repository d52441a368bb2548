// Grouping windows by offered load
//
// Windows are binned by their request rate so latency can be compared across
// load levels of a ramped stress run.

use crate::window::aggregator::TimeWindow;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request-rate band of a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadLevel {
    /// Up to 50 requests per second
    Low,
    /// Above 50, up to 150
    Medium,
    /// Above 150, up to 300
    High,
    /// Above 300
    VeryHigh,
}

impl LoadLevel {
    pub const ALL: [LoadLevel; 4] = [
        LoadLevel::Low,
        LoadLevel::Medium,
        LoadLevel::High,
        LoadLevel::VeryHigh,
    ];

    pub fn for_rate(requests_per_second: f64) -> Self {
        if requests_per_second <= 50.0 {
            LoadLevel::Low
        } else if requests_per_second <= 150.0 {
            LoadLevel::Medium
        } else if requests_per_second <= 300.0 {
            LoadLevel::High
        } else {
            LoadLevel::VeryHigh
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoadLevel::Low => "Low (0-50 RPS)",
            LoadLevel::Medium => "Medium (50-150 RPS)",
            LoadLevel::High => "High (150-300 RPS)",
            LoadLevel::VeryHigh => "Very High (300+ RPS)",
        }
    }
}

impl fmt::Display for LoadLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Averaged window latencies for one load level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadLevelSummary {
    pub level: LoadLevel,
    pub window_count: usize,
    pub mean_requests_per_second: f64,
    pub mean_of_mean: f64,
    pub mean_of_p95: f64,
    pub mean_of_p99: f64,
}

/// Summarize windows per load level, omitting levels with no windows
pub fn summarize_load_levels(windows: &[TimeWindow]) -> Vec<LoadLevelSummary> {
    LoadLevel::ALL
        .iter()
        .filter_map(|&level| {
            let members: Vec<&TimeWindow> = windows
                .iter()
                .filter(|w| LoadLevel::for_rate(w.requests_per_second) == level)
                .collect();
            if members.is_empty() {
                return None;
            }

            let n = members.len() as f64;
            let avg = |f: fn(&TimeWindow) -> f64| members.iter().map(|w| f(w)).sum::<f64>() / n;

            Some(LoadLevelSummary {
                level,
                window_count: members.len(),
                mean_requests_per_second: avg(|w| w.requests_per_second),
                mean_of_mean: avg(|w| w.mean),
                mean_of_p95: avg(|w| w.p95),
                mean_of_p99: avg(|w| w.p99),
            })
        })
        .collect()
}
