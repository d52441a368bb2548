//! Marker parsing for raw collector log entries
//!
//! Turns one loosely structured log entry into zero or more typed
//! [`MarkerEvent`]s. Entries that carry no recognizable telemetry are common
//! (platform noise, application logs) and simply yield nothing.
//!
//! Recognized envelope:
//!
//! ```text
//! {"__logentry__": {
//!     "timestamp": {"__datetime__": "2024-05-01T12:00:00.123456"},
//!     "data": {
//!         "timestamp": 1714564800123,          // logical clock for before/after
//!         "now": 1714564800125,                // clock for perf marks
//!         "fn": {"name": "frontend"},
//!         "event": {
//!             "contextId": "ctx-1", "type": "before", "url": "/frontend/cart",
//!             "coldstart": true,
//!             "perf": {"mark": "start:rpcOut:getcart:ab12", "duration": 12.5}
//!         }}}}
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One raw entry from the collected batch, shape unknown until parsed
pub type RawLogEntry = Value;

/// Mark id shared by every `before`/`after` request marker
pub const REQUEST_MARK_ID: &str = "request";

/// What a marker contributes to correlation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerKind {
    /// `type: before` on a request context
    RequestBefore,
    /// `type: after` on a request context
    RequestAfter,
    /// `start:<kind>:<name>` performance mark
    SpanStart,
    /// `end:<kind>:<name>` performance mark
    SpanEnd,
    /// `measure:<name>` mark with its duration already computed
    InstantMeasure { duration_ms: f64 },
}

impl MarkerKind {
    /// Opens an interval that a later marker closes
    pub fn is_begin(&self) -> bool {
        matches!(self, MarkerKind::RequestBefore | MarkerKind::SpanStart)
    }

    /// Closes an interval opened by an earlier marker
    pub fn is_end(&self) -> bool {
        matches!(self, MarkerKind::RequestAfter | MarkerKind::SpanEnd)
    }
}

/// Optional facts carried alongside a marker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    pub coldstart: bool,
}

/// A typed marker extracted from a raw entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerEvent {
    pub kind: MarkerKind,
    /// Groups all markers of one logical request (the context id)
    pub correlation_key: String,
    /// Distinguishes concurrent spans inside one context
    pub mark_id: String,
    /// Clock value in milliseconds, monotonic within one collection run
    pub timestamp: f64,
    /// Wall-clock time the entry was logged, if present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wall_clock: Option<DateTime<Utc>>,
    pub payload: MarkerPayload,
}

/// Parse a single raw entry into marker events
///
/// Never fails: foreign or malformed entries produce an empty vector. One entry
/// may produce both a request marker and a perf marker.
pub fn parse_entry(entry: &RawLogEntry) -> Vec<MarkerEvent> {
    let mut markers = Vec::new();

    let Some(log) = entry.get("__logentry__") else {
        return markers;
    };
    let Some(data) = log.get("data") else {
        return markers;
    };
    let Some(event) = data.get("event").filter(|e| e.is_object()) else {
        return markers;
    };

    let wall_clock = log.get("timestamp").and_then(wall_clock_of);
    let context_id = event.get("contextId").and_then(Value::as_str);
    let coldstart = event
        .get("coldstart")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let fn_name = data
        .get("fn")
        .and_then(|f| f.get("name"))
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    if let Some(ctx) = context_id {
        if let Some(marker) = request_marker(ctx, data, event, wall_clock, coldstart, &fn_name) {
            markers.push(marker);
        }
    }

    if let Some(perf) = event.get("perf") {
        if let Some(marker) = perf_marker(context_id.unwrap_or(""), data, perf, wall_clock, coldstart)
        {
            markers.push(marker);
        }
    }

    markers
}

/// Context id of an entry flagged as a cold start, if any
pub fn coldstart_context(entry: &RawLogEntry) -> Option<String> {
    let event = entry.get("__logentry__")?.get("data")?.get("event")?;
    if !event.get("coldstart").and_then(Value::as_bool).unwrap_or(false) {
        return None;
    }
    event
        .get("contextId")
        .and_then(Value::as_str)
        .filter(|ctx| !ctx.is_empty())
        .map(str::to_string)
}

fn request_marker(
    ctx: &str,
    data: &Value,
    event: &Value,
    wall_clock: Option<DateTime<Utc>>,
    coldstart: bool,
    fn_name: &Option<String>,
) -> Option<MarkerEvent> {
    let kind = match event.get("type").and_then(Value::as_str)? {
        "before" => MarkerKind::RequestBefore,
        "after" => MarkerKind::RequestAfter,
        _ => return None,
    };
    let timestamp = data.get("timestamp").and_then(Value::as_f64)?;

    let url = match kind {
        MarkerKind::RequestBefore => event
            .get("url")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };

    Some(MarkerEvent {
        kind,
        correlation_key: ctx.to_string(),
        mark_id: REQUEST_MARK_ID.to_string(),
        timestamp,
        wall_clock,
        payload: MarkerPayload {
            url,
            function_name: fn_name.clone(),
            coldstart,
        },
    })
}

fn perf_marker(
    ctx: &str,
    data: &Value,
    perf: &Value,
    wall_clock: Option<DateTime<Utc>>,
    coldstart: bool,
) -> Option<MarkerEvent> {
    let mark = perf.get("mark").and_then(Value::as_str)?;
    let now = data.get("now").and_then(Value::as_f64);

    let (kind, mark_id, timestamp) = if let Some(name) = mark.strip_prefix("measure:") {
        let duration_ms = perf.get("duration").and_then(Value::as_f64)?;
        if name.is_empty() || duration_ms < 0.0 {
            return None;
        }
        (
            MarkerKind::InstantMeasure { duration_ms },
            name,
            now.unwrap_or(0.0),
        )
    } else if let Some(suffix) = mark.strip_prefix("start:") {
        (MarkerKind::SpanStart, span_suffix(suffix)?, now?)
    } else if let Some(suffix) = mark.strip_prefix("end:") {
        (MarkerKind::SpanEnd, span_suffix(suffix)?, now?)
    } else {
        return None;
    };

    Some(MarkerEvent {
        kind,
        correlation_key: ctx.to_string(),
        mark_id: mark_id.to_string(),
        timestamp,
        wall_clock,
        payload: MarkerPayload {
            url: None,
            function_name: Some(function_name_for_mark(kind, mark_id)),
            coldstart,
        },
    })
}

/// `<kind>:<name>` with both parts present
fn span_suffix(suffix: &str) -> Option<&str> {
    let (kind, name) = suffix.split_once(':')?;
    if kind.is_empty() || name.is_empty() {
        return None;
    }
    Some(suffix)
}

/// Function a span or measure is attributed to
///
/// RPC spans (`rpcOut:<fn>:<call>`, `rpcIn:<fn>:<call>`) name the function in
/// their second segment; other spans (`get:/cart`) are keyed by the whole id.
/// Measures keep only the last `/` segment of their name.
fn function_name_for_mark(kind: MarkerKind, mark_id: &str) -> String {
    match kind {
        MarkerKind::InstantMeasure { .. } => mark_id
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(mark_id)
            .to_string(),
        _ => {
            let mut parts = mark_id.split(':');
            match (parts.next(), parts.next()) {
                (Some("rpcOut" | "rpcIn"), Some(function)) if !function.is_empty() => {
                    function.to_string()
                }
                _ => mark_id.to_string(),
            }
        }
    }
}

fn wall_clock_of(value: &Value) -> Option<DateTime<Utc>> {
    parse_datetime(value.get("__datetime__")?.as_str()?)
}

/// Parse an ISO-8601 wall-clock string; values without an offset are UTC
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
