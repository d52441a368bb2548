//! Human-readable report tables

use crate::analysis::AnalysisReport;
use crate::window::DurationSummary;
use std::collections::BTreeMap;
use std::fmt;

/// Renders an [`AnalysisReport`] as plain-text tables
pub struct TextReport<'a> {
    report: &'a AnalysisReport,
}

impl<'a> TextReport<'a> {
    pub fn new(report: &'a AnalysisReport) -> Self {
        Self { report }
    }

    fn write_counts(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.report;
        let c = &r.counts;
        writeln!(f, "=== Correlation ===")?;
        writeln!(f, "  Entries:               {}", c.entries_seen)?;
        writeln!(f, "  Entries skipped:       {}", c.entries_skipped)?;
        writeln!(f, "  Markers:               {}", c.markers_seen)?;
        writeln!(f, "  Requests correlated:   {}", r.correlated_count)?;
        writeln!(f, "  Orphaned ends:         {}", c.orphaned_ends)?;
        writeln!(f, "  Discarded durations:   {}", c.discarded_durations)?;
        writeln!(f, "  Overwritten begins:    {}", c.overwritten_begins)?;
        writeln!(f, "  Unterminated pending:  {}", c.unterminated_pending)?;
        writeln!(f)?;

        writeln!(f, "=== Warm-up ===")?;
        if r.warmup.applied {
            writeln!(
                f,
                "  Excluded {} requests in the first {}s",
                r.warmup.excluded_count, r.warmup.warmup_seconds
            )?;
        } else {
            writeln!(f, "  Not applied")?;
        }
        writeln!(f, "  Retained:              {}", r.requests.len())?;
        writeln!(f, "  Cold starts:           {}", r.coldstart_count())?;
        writeln!(f)
    }

    fn write_windows(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.report;
        writeln!(f, "=== Windows ({}s) ===", r.window_seconds)?;
        if r.windows.is_empty() {
            return writeln!(f, "  No windows.\n");
        }

        writeln!(
            f,
            "   start      rps   count      mean       p50       p95       p99   auth  auth_mean   auth_p95"
        )?;
        writeln!(
            f,
            "-------- -------- ------- --------- --------- --------- --------- ------ ---------- ----------"
        )?;
        for w in &r.windows {
            writeln!(
                f,
                "{:>8.1} {:>8.2} {:>7} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>6} {:>10} {:>10}",
                w.window_start,
                w.requests_per_second,
                w.request_count,
                w.mean,
                w.p50,
                w.p95,
                w.p99,
                w.auth_request_count,
                optional(w.auth_mean),
                optional(w.auth_p95),
            )?;
        }
        writeln!(f)?;

        if !r.load_levels.is_empty() {
            writeln!(f, "=== Load Levels ===")?;
            for level in &r.load_levels {
                writeln!(
                    f,
                    "  {:<22} {:>4} windows  mean {:>9.2} ms  p95 {:>9.2} ms  p99 {:>9.2} ms",
                    level.level.label(),
                    level.window_count,
                    level.mean_of_mean,
                    level.mean_of_p95,
                    level.mean_of_p99,
                )?;
            }
            writeln!(f)?;
        }

        Ok(())
    }

    fn write_breakdown(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.report.breakdown;
        if b.is_empty() {
            return Ok(());
        }

        write_group(f, "Categories", &b.by_category)?;
        write_group(f, "Endpoints", &b.by_endpoint)?;
        if !b.by_function.is_empty() {
            write_group(f, "Functions", &b.by_function)?;
        }

        writeln!(f, "=== Auth vs Non-auth ===")?;
        for (label, summary) in [("auth", &b.auth), ("non-auth", &b.non_auth)] {
            match summary {
                Some(s) => write_summary_row(f, label, s)?,
                None => writeln!(f, "{label:<28} {:>7}", 0)?,
            }
        }
        writeln!(f)?;

        if !b.function_calls.is_empty() {
            writeln!(f, "=== Function Invocations ===")?;
            for (name, counts) in &b.function_calls {
                writeln!(
                    f,
                    "  {:<28} {:>7} calls {:>5} cold",
                    name, counts.invocations, counts.coldstarts
                )?;
            }
        }

        Ok(())
    }
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_counts(f)?;
        self.write_windows(f)?;
        self.write_breakdown(f)
    }
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

fn write_group(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    group: &BTreeMap<String, DurationSummary>,
) -> fmt::Result {
    writeln!(f, "=== {title} ===")?;
    writeln!(
        f,
        "{:<28} {:>7} {:>9} {:>9} {:>9} {:>9}",
        "name", "count", "mean", "p50", "p95", "p99"
    )?;
    for (name, summary) in group {
        write_summary_row(f, name, summary)?;
    }
    writeln!(f)
}

fn write_summary_row(f: &mut fmt::Formatter<'_>, name: &str, s: &DurationSummary) -> fmt::Result {
    writeln!(
        f,
        "{:<28} {:>7} {:>9.2} {:>9.2} {:>9.2} {:>9.2}",
        name, s.count, s.mean, s.p50, s.p95, s.p99
    )
}

/// Render the report as text
pub fn render(report: &AnalysisReport) -> String {
    TextReport::new(report).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::LoadAnalyzer;
    use crate::classifier::ClassifierTables;
    use crate::config::AnalysisConfig;
    use serde_json::json;

    #[test]
    fn test_render_empty_report() {
        let analyzer =
            LoadAnalyzer::new(AnalysisConfig::default(), ClassifierTables::embedded().unwrap());
        let text = render(&analyzer.analyze(&[]));
        assert!(text.contains("=== Correlation ==="));
        assert!(text.contains("Not applied"));
        assert!(text.contains("No windows."));
        assert!(!text.contains("=== Categories ==="));
    }

    #[test]
    fn test_render_with_requests() {
        let entries = vec![
            json!({"__logentry__": {
                "timestamp": {"__datetime__": "2024-05-01T12:00:00"},
                "data": {"timestamp": 0, "event": {"contextId": "a", "type": "before", "url": "/cart"}}
            }}),
            json!({"__logentry__": {
                "timestamp": {"__datetime__": "2024-05-01T12:00:01"},
                "data": {"timestamp": 25, "event": {"contextId": "a", "type": "after"}}
            }}),
        ];
        let config = AnalysisConfig {
            exclude_warmup: false,
            ..AnalysisConfig::default()
        };
        let analyzer = LoadAnalyzer::new(config, ClassifierTables::embedded().unwrap());
        let text = render(&analyzer.analyze(&entries));

        assert!(text.contains("=== Windows (5s) ==="));
        assert!(text.contains("Low (0-50 RPS)"));
        assert!(text.contains("Shopping Cart"));
        assert!(text.contains("25.00"));
    }
}
