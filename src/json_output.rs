//! JSON output format for analysis reports

use crate::analysis::AnalysisReport;
use crate::breakdown::Breakdown;
use crate::correlator::DiagnosticCounts;
use crate::request::CorrelatedRequest;
use crate::warmup::WarmupSummary;
use crate::window::{LoadLevelSummary, TimeWindow};
use serde::{Deserialize, Serialize};

/// Headline numbers of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSummary {
    /// Raw entries read
    pub entries: u64,
    /// Requests produced by correlation
    pub correlated: usize,
    /// Requests left after warm-up filtering
    pub retained: usize,
    /// Requests removed as warm-up traffic
    pub excluded_warmup: usize,
    /// Non-empty windows
    pub windows: usize,
    /// Retained requests flagged as cold starts
    pub coldstarts: usize,
    /// Highest window request rate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_requests_per_second: Option<f64>,
}

/// Top-level JSON document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonOutput {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    pub summary: JsonSummary,
    pub diagnostics: DiagnosticCounts,
    pub warmup: WarmupSummary,
    pub window_seconds: u64,
    pub windows: Vec<TimeWindow>,
    pub load_levels: Vec<LoadLevelSummary>,
    pub breakdown: Breakdown,
    /// Individual requests (only with --include-requests)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests: Option<Vec<CorrelatedRequest>>,
}

impl JsonOutput {
    /// Build the document from a finished report
    pub fn from_report(report: &AnalysisReport, include_requests: bool) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "loadscope-json-v1".to_string(),
            summary: JsonSummary {
                entries: report.counts.entries_seen,
                correlated: report.correlated_count,
                retained: report.requests.len(),
                excluded_warmup: report.warmup.excluded_count,
                windows: report.windows.len(),
                coldstarts: report.coldstart_count(),
                peak_requests_per_second: report.peak_window().map(|w| w.requests_per_second),
            },
            diagnostics: report.counts.clone(),
            warmup: report.warmup.clone(),
            window_seconds: report.window_seconds,
            windows: report.windows.clone(),
            load_levels: report.load_levels.clone(),
            breakdown: report.breakdown.clone(),
            requests: include_requests.then(|| report.requests.clone()),
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
