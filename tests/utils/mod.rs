// Integration test utilities
//
// Builders for raw collector entries in the `__logentry__` envelope.

#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde_json::{json, Value};

/// Fixed start of every synthetic run
pub fn run_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// Wall-clock string `offset_ms` after the run start, without an offset suffix
pub fn wall_clock(offset_ms: i64) -> String {
    (run_start() + TimeDelta::milliseconds(offset_ms))
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// A `before`/`after` request marker
pub fn request_entry(offset_ms: i64, ctx: &str, kind: &str, clock: f64, url: Option<&str>) -> Value {
    let mut event = json!({"contextId": ctx, "type": kind});
    if let Some(url) = url {
        event["url"] = json!(url);
    }
    json!({
        "__logentry__": {
            "timestamp": {"__datetime__": wall_clock(offset_ms)},
            "data": {"timestamp": clock, "event": event}
        }
    })
}

/// A performance mark (`start:`, `end:` or `measure:`)
pub fn perf_entry(offset_ms: i64, ctx: &str, mark: &str, now: f64, duration: Option<f64>) -> Value {
    let mut perf = json!({"mark": mark});
    if let Some(duration) = duration {
        perf["duration"] = json!(duration);
    }
    json!({
        "__logentry__": {
            "timestamp": {"__datetime__": wall_clock(offset_ms)},
            "data": {"now": now, "event": {"contextId": ctx, "perf": perf}}
        }
    })
}

/// An entry that only flags `ctx` as a cold start
pub fn coldstart_entry(offset_ms: i64, ctx: &str) -> Value {
    json!({
        "__logentry__": {
            "timestamp": {"__datetime__": wall_clock(offset_ms)},
            "data": {"event": {"contextId": ctx, "coldstart": true}}
        }
    })
}

/// Begin and end entries of one request starting `offset_ms` into the run
pub fn request_pair(offset_ms: i64, ctx: &str, url: &str, duration_ms: f64) -> [Value; 2] {
    let begin = offset_ms as f64;
    [
        request_entry(offset_ms, ctx, "before", begin, Some(url)),
        request_entry(
            offset_ms + duration_ms as i64,
            ctx,
            "after",
            begin + duration_ms,
            None,
        ),
    ]
}

/// A ramp: `per_second[i]` requests during second `i`, evenly spaced
pub fn ramp(per_second: &[u32], url: &str, duration_ms: f64) -> Vec<Value> {
    let mut entries = Vec::new();
    for (second, &count) in per_second.iter().enumerate() {
        for i in 0..count {
            let offset = second as i64 * 1_000 + i64::from(i) * 1_000 / i64::from(count);
            let ctx = format!("ramp-{second}-{i}");
            entries.extend(request_pair(offset, &ctx, url, duration_ms));
        }
    }
    entries
}
