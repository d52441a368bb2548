//! End-to-end load analysis
//!
//! Runs the pipeline stages in order: correlate raw entries, drop warm-up
//! traffic, then aggregate windows and breakdowns over what remains.

mod report;

pub use report::AnalysisReport;

use crate::breakdown::breakdown;
use crate::classifier::ClassifierTables;
use crate::config::AnalysisConfig;
use crate::correlator::correlate_with_ceiling;
use crate::marker::RawLogEntry;
use crate::request::CorrelatedRequest;
use crate::warmup::{filter_warmup, WarmupSummary};
use crate::window::{summarize_load_levels, WindowAggregator};

/// Analysis engine holding the configuration and classifier tables
///
/// No state survives between [`LoadAnalyzer::analyze`] calls, so one analyzer
/// can process several batches.
#[derive(Debug, Clone)]
pub struct LoadAnalyzer {
    config: AnalysisConfig,
    tables: ClassifierTables,
}

impl LoadAnalyzer {
    pub fn new(config: AnalysisConfig, tables: ClassifierTables) -> Self {
        Self { config, tables }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn tables(&self) -> &ClassifierTables {
        &self.tables
    }

    /// Analyze one batch of raw entries in recorded order
    pub fn analyze(&self, entries: &[RawLogEntry]) -> AnalysisReport {
        let correlation =
            correlate_with_ceiling(entries, &self.tables, self.config.duration_ceiling_ms);
        let correlated_count = correlation.requests.len();

        let (requests, warmup) = self.apply_warmup(correlation.requests);

        let windowed: Vec<CorrelatedRequest> = requests
            .iter()
            .filter(|r| self.config.windows_kind(r.kind))
            .cloned()
            .collect();

        let windows = WindowAggregator::new(self.config.window_seconds)
            .with_min_auth_p95_samples(self.config.min_auth_p95_samples)
            .aggregate(&windowed);
        let load_levels = summarize_load_levels(&windows);
        let breakdown = breakdown(&requests);

        tracing::info!(
            entries = correlation.counts.entries_seen,
            correlated = correlated_count,
            retained = requests.len(),
            windows = windows.len(),
            "analysis complete"
        );

        AnalysisReport {
            counts: correlation.counts,
            correlated_count,
            warmup,
            window_seconds: self.config.window_seconds,
            windows,
            load_levels,
            breakdown,
            requests,
        }
    }

    fn apply_warmup(
        &self,
        requests: Vec<CorrelatedRequest>,
    ) -> (Vec<CorrelatedRequest>, WarmupSummary) {
        if !self.config.exclude_warmup {
            tracing::debug!("warm-up exclusion disabled");
            let summary = WarmupSummary {
                applied: false,
                warmup_seconds: self.config.warmup_seconds,
                excluded_count: 0,
                cutoff: None,
            };
            return (requests, summary);
        }

        let filtered = filter_warmup(requests, self.config.warmup_seconds);
        let summary = filtered.summary(self.config.warmup_seconds);
        (filtered.retained, summary)
    }
}
