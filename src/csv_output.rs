//! CSV output format for spreadsheet analysis and plotting

use crate::request::CorrelatedRequest;
use crate::window::TimeWindow;

const WINDOW_HEADER: &str = "window_start,window_end,request_count,requests_per_second,\
mean,median,p75,p90,p95,p99,std_dev,min,max,auth_request_count,auth_mean,auth_p95";

const REQUEST_HEADER: &str =
    "context_id,kind,start_time,duration_ms,endpoint,category,is_auth,is_coldstart,function";

/// Escape CSV field (handle commas, quotes, newlines)
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Not-computed statistics become empty cells
fn optional(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.3}")).unwrap_or_default()
}

/// One row per time window
#[derive(Debug, Default)]
pub struct CsvWindowOutput {
    windows: Vec<TimeWindow>,
}

impl CsvWindowOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_window(&mut self, window: TimeWindow) {
        self.windows.push(window);
    }

    fn format_window(w: &TimeWindow) -> String {
        [
            format!("{:.3}", w.window_start),
            format!("{:.3}", w.window_end),
            w.request_count.to_string(),
            format!("{:.3}", w.requests_per_second),
            format!("{:.3}", w.mean),
            format!("{:.3}", w.median),
            format!("{:.3}", w.p75),
            format!("{:.3}", w.p90),
            format!("{:.3}", w.p95),
            format!("{:.3}", w.p99),
            format!("{:.3}", w.std_dev),
            format!("{:.3}", w.min),
            format!("{:.3}", w.max),
            w.auth_request_count.to_string(),
            optional(w.auth_mean),
            optional(w.auth_p95),
        ]
        .join(",")
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str(WINDOW_HEADER);
        output.push('\n');

        for window in &self.windows {
            output.push_str(&Self::format_window(window));
            output.push('\n');
        }

        output
    }
}

impl FromIterator<TimeWindow> for CsvWindowOutput {
    fn from_iter<I: IntoIterator<Item = TimeWindow>>(iter: I) -> Self {
        Self {
            windows: iter.into_iter().collect(),
        }
    }
}

/// One row per retained request
#[derive(Debug, Default)]
pub struct CsvRequestOutput {
    requests: Vec<CorrelatedRequest>,
}

impl CsvRequestOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_request(&mut self, request: CorrelatedRequest) {
        self.requests.push(request);
    }

    fn format_request(r: &CorrelatedRequest) -> String {
        let kind = match r.kind {
            crate::request::RequestKind::Request => "request",
            crate::request::RequestKind::Span => "span",
            crate::request::RequestKind::Measure => "measure",
        };

        [
            escape_field(&r.context_id),
            kind.to_string(),
            r.start_time.map(|t| t.to_rfc3339()).unwrap_or_default(),
            format!("{:.3}", r.duration),
            escape_field(&r.endpoint),
            escape_field(&r.category),
            r.is_auth.to_string(),
            r.is_coldstart.to_string(),
            r.function_name.as_deref().map(escape_field).unwrap_or_default(),
        ]
        .join(",")
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str(REQUEST_HEADER);
        output.push('\n');

        for request in &self.requests {
            output.push_str(&Self::format_request(request));
            output.push('\n');
        }

        output
    }
}

impl FromIterator<CorrelatedRequest> for CsvRequestOutput {
    fn from_iter<I: IntoIterator<Item = CorrelatedRequest>>(iter: I) -> Self {
        Self {
            requests: iter.into_iter().collect(),
        }
    }
}
