//! Completed request records produced by correlation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a completed record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    /// A `before`/`after` pair around a whole request
    Request,
    /// A `start:`/`end:` performance-mark pair
    Span,
    /// A `measure:` mark with a precomputed duration
    Measure,
}

/// A begin/end pair (or a measure) resolved into one latency observation
///
/// Immutable once handed out by the correlator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedRequest {
    pub context_id: String,
    pub kind: RequestKind,
    /// Milliseconds, always in `(0, ceiling)`
    pub duration: f64,
    pub endpoint: String,
    pub category: String,
    pub is_auth: bool,
    pub is_coldstart: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
}

impl CorrelatedRequest {
    /// Start time as seconds since `origin`, if the record carries one
    pub fn offset_seconds(&self, origin: DateTime<Utc>) -> Option<f64> {
        let delta = self.start_time? - origin;
        Some(match delta.num_microseconds() {
            Some(us) => us as f64 / 1_000_000.0,
            None => delta.num_milliseconds() as f64 / 1_000.0,
        })
    }
}
