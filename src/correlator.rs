//! Begin/end marker correlation
//!
//! Reduces paired markers to completed [`CorrelatedRequest`]s. The only
//! mutable state is the pending-marker table, owned by one [`Correlator`]
//! instance. Keys never interact, so a caller may shard input by correlation
//! key and run one correlator per shard.
//!
//! Anomalies are counted, never raised:
//! - an end marker with no pending begin is an orphan
//! - a second begin for an open key replaces the first (last write wins)
//! - durations outside `(0, ceiling)` are discarded
//! - begins still open at end of input are dropped as unterminated

use crate::classifier::ClassifierTables;
use crate::marker::{coldstart_context, parse_entry, MarkerEvent, MarkerKind, RawLogEntry};
use crate::request::{CorrelatedRequest, RequestKind};
use chrono::{DateTime, Utc};
use fnv::{FnvHashMap, FnvHashSet};
use serde::{Deserialize, Serialize};

/// Durations at or above this many milliseconds are treated as outliers
pub const DURATION_CEILING_MS: f64 = 60_000.0;

/// Endpoint reported when neither a URL nor a function name is known
pub const UNKNOWN_ENDPOINT: &str = "unknown";

/// Counters describing everything correlation skipped or dropped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticCounts {
    /// Raw entries examined
    pub entries_seen: u64,
    /// Entries with no recognizable marker
    pub entries_skipped: u64,
    /// Marker events produced by the parser
    pub markers_seen: u64,
    /// End markers with no pending begin
    pub orphaned_ends: u64,
    /// Pairs or measures whose duration fell outside `(0, ceiling)`
    pub discarded_durations: u64,
    /// Begin markers that replaced a still-open begin for the same key
    pub overwritten_begins: u64,
    /// Begin markers never closed before end of input
    pub unterminated_pending: u64,
}

/// Result of correlating one batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Correlation {
    pub requests: Vec<CorrelatedRequest>,
    pub counts: DiagnosticCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PendingKey {
    correlation_key: String,
    mark_id: String,
}

/// An open begin/start marker waiting for its end
#[derive(Debug, Clone)]
struct PendingMarker {
    kind: RequestKind,
    timestamp: f64,
    wall_clock: Option<DateTime<Utc>>,
    url: Option<String>,
    function_name: Option<String>,
}

/// Stateful begin/end matcher for one ingestion stream
#[derive(Debug)]
pub struct Correlator<'t> {
    tables: &'t ClassifierTables,
    ceiling_ms: f64,
    pending: FnvHashMap<PendingKey, PendingMarker>,
    coldstart_contexts: FnvHashSet<String>,
    completed: Vec<CorrelatedRequest>,
    counts: DiagnosticCounts,
}

impl<'t> Correlator<'t> {
    /// Create a correlator using the default outlier ceiling
    pub fn new(tables: &'t ClassifierTables) -> Self {
        Self::with_ceiling(tables, DURATION_CEILING_MS)
    }

    /// Create a correlator with a custom outlier ceiling in milliseconds
    pub fn with_ceiling(tables: &'t ClassifierTables, ceiling_ms: f64) -> Self {
        Self {
            tables,
            ceiling_ms,
            pending: FnvHashMap::default(),
            coldstart_contexts: FnvHashSet::default(),
            completed: Vec::new(),
            counts: DiagnosticCounts::default(),
        }
    }

    /// Parse and ingest one raw entry
    pub fn ingest_entry(&mut self, entry: &RawLogEntry) {
        self.counts.entries_seen += 1;

        let markers = parse_entry(entry);
        if markers.is_empty() {
            // Flag-only entries carry no marker for `ingest` to read
            if let Some(ctx) = coldstart_context(entry) {
                self.coldstart_contexts.insert(ctx);
            }
            self.counts.entries_skipped += 1;
            return;
        }
        for marker in markers {
            self.ingest(marker);
        }
    }

    /// Ingest one marker event
    pub fn ingest(&mut self, event: MarkerEvent) {
        self.counts.markers_seen += 1;

        if event.payload.coldstart && !event.correlation_key.is_empty() {
            self.coldstart_contexts
                .insert(event.correlation_key.clone());
        }

        match event.kind {
            MarkerKind::InstantMeasure { duration_ms } => {
                let function_name = event.payload.function_name.clone();
                let endpoint = function_name
                    .clone()
                    .unwrap_or_else(|| event.mark_id.clone());
                self.emit(
                    event.correlation_key,
                    RequestKind::Measure,
                    duration_ms,
                    endpoint,
                    (event.wall_clock, event.wall_clock),
                    None,
                    function_name,
                );
            }
            MarkerKind::RequestBefore | MarkerKind::SpanStart => self.open(event),
            MarkerKind::RequestAfter | MarkerKind::SpanEnd => self.close(event),
        }
    }

    fn open(&mut self, event: MarkerEvent) {
        let kind = match event.kind {
            MarkerKind::RequestBefore => RequestKind::Request,
            _ => RequestKind::Span,
        };
        let key = PendingKey {
            correlation_key: event.correlation_key,
            mark_id: event.mark_id,
        };
        let marker = PendingMarker {
            kind,
            timestamp: event.timestamp,
            wall_clock: event.wall_clock,
            url: event.payload.url,
            function_name: event.payload.function_name,
        };

        if self.pending.insert(key, marker).is_some() {
            self.counts.overwritten_begins += 1;
            tracing::trace!("begin marker replaced an open one (last write wins)");
        }
    }

    fn close(&mut self, event: MarkerEvent) {
        let key = PendingKey {
            correlation_key: event.correlation_key,
            mark_id: event.mark_id,
        };

        // Removed whether or not the duration turns out valid
        let Some(begin) = self.pending.remove(&key) else {
            self.counts.orphaned_ends += 1;
            tracing::debug!(
                context = %key.correlation_key,
                mark = %key.mark_id,
                "orphaned end marker"
            );
            return;
        };

        let duration = event.timestamp - begin.timestamp;
        let endpoint = self.endpoint_for(&begin, &key.mark_id);
        let function_name = begin
            .function_name
            .or(event.payload.function_name);

        self.emit(
            key.correlation_key,
            begin.kind,
            duration,
            endpoint,
            (begin.wall_clock, event.wall_clock),
            begin.url,
            function_name,
        );
    }

    fn endpoint_for(&self, begin: &PendingMarker, mark_id: &str) -> String {
        match begin.kind {
            RequestKind::Request => begin
                .url
                .as_deref()
                .and_then(|url| self.tables.endpoint_for_url(url))
                .or_else(|| begin.function_name.clone())
                .unwrap_or_else(|| UNKNOWN_ENDPOINT.to_string()),
            _ => begin
                .function_name
                .clone()
                .unwrap_or_else(|| mark_id.to_string()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn emit(
        &mut self,
        context_id: String,
        kind: RequestKind,
        duration: f64,
        endpoint: String,
        (start_time, end_time): (Option<DateTime<Utc>>, Option<DateTime<Utc>>),
        source_url: Option<String>,
        function_name: Option<String>,
    ) {
        if !(duration > 0.0 && duration < self.ceiling_ms) {
            self.counts.discarded_durations += 1;
            tracing::debug!(
                context = %context_id,
                duration,
                "discarded out-of-range duration"
            );
            return;
        }

        let category = self.tables.categorize(&endpoint).to_string();
        let is_auth = self.tables.is_auth(&endpoint);

        self.completed.push(CorrelatedRequest {
            context_id,
            kind,
            duration,
            endpoint,
            category,
            is_auth,
            is_coldstart: false,
            start_time,
            end_time,
            source_url,
            function_name,
        });
    }

    /// Number of begin markers currently waiting for an end
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Counters accumulated so far
    pub fn counts(&self) -> &DiagnosticCounts {
        &self.counts
    }

    /// End the stream: drop unterminated begins and resolve cold starts
    ///
    /// A context is a cold start if any of its entries carried the flag, even
    /// one seen after its pair resolved.
    pub fn finish(mut self) -> Correlation {
        self.counts.unterminated_pending = self.pending.len() as u64;
        self.pending.clear();

        for request in &mut self.completed {
            request.is_coldstart = self.coldstart_contexts.contains(&request.context_id);
        }

        tracing::debug!(
            completed = self.completed.len(),
            orphaned = self.counts.orphaned_ends,
            discarded = self.counts.discarded_durations,
            unterminated = self.counts.unterminated_pending,
            "correlation finished"
        );

        Correlation {
            requests: self.completed,
            counts: self.counts,
        }
    }
}

/// Correlate a batch of raw entries in their recorded order
pub fn correlate(entries: &[RawLogEntry], tables: &ClassifierTables) -> Correlation {
    correlate_with_ceiling(entries, tables, DURATION_CEILING_MS)
}

/// [`correlate`] with a custom outlier ceiling in milliseconds
pub fn correlate_with_ceiling(
    entries: &[RawLogEntry],
    tables: &ClassifierTables,
    ceiling_ms: f64,
) -> Correlation {
    let mut correlator = Correlator::with_ceiling(tables, ceiling_ms);
    for entry in entries {
        correlator.ingest_entry(entry);
    }
    correlator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::{MarkerPayload, REQUEST_MARK_ID};
    use serde_json::{json, Value};

    fn tables() -> ClassifierTables {
        ClassifierTables::embedded().unwrap()
    }

    fn marker(kind: MarkerKind, key: &str, mark_id: &str, ts: f64) -> MarkerEvent {
        MarkerEvent {
            kind,
            correlation_key: key.to_string(),
            mark_id: mark_id.to_string(),
            timestamp: ts,
            wall_clock: None,
            payload: MarkerPayload::default(),
        }
    }

    fn before(key: &str, ts: f64, url: &str) -> MarkerEvent {
        let mut m = marker(MarkerKind::RequestBefore, key, REQUEST_MARK_ID, ts);
        m.payload.url = Some(url.to_string());
        m
    }

    fn after(key: &str, ts: f64) -> MarkerEvent {
        marker(MarkerKind::RequestAfter, key, REQUEST_MARK_ID, ts)
    }

    fn raw(ts: u64, event: Value) -> Value {
        json!({"__logentry__": {"data": {"timestamp": ts, "event": event}}})
    }

    #[test]
    fn test_begin_end_pair_yields_duration() {
        let tables = tables();
        let mut c = Correlator::new(&tables);
        c.ingest(before("ctx", 100.0, "/frontend/cart"));
        c.ingest(after("ctx", 180.0));

        let result = c.finish();
        assert_eq!(result.requests.len(), 1);
        let r = &result.requests[0];
        assert_eq!(r.duration, 80.0);
        assert_eq!(r.kind, RequestKind::Request);
        assert_eq!(r.endpoint, "cart");
        assert_eq!(r.category, "Shopping Cart");
        assert!(!r.is_auth);
        assert_eq!(r.source_url.as_deref(), Some("/frontend/cart"));
    }

    #[test]
    fn test_orphan_end_is_counted() {
        let tables = tables();
        let mut c = Correlator::new(&tables);
        c.ingest(after("ctx", 180.0));

        let result = c.finish();
        assert!(result.requests.is_empty());
        assert_eq!(result.counts.orphaned_ends, 1);
    }

    #[test]
    fn test_duplicate_begin_last_write_wins() {
        let tables = tables();
        let mut c = Correlator::new(&tables);
        c.ingest(before("ctx", 10.0, "/a"));
        c.ingest(before("ctx", 50.0, "/b"));
        c.ingest(after("ctx", 60.0));

        let result = c.finish();
        assert_eq!(result.requests.len(), 1);
        assert_eq!(result.requests[0].duration, 10.0);
        assert_eq!(result.requests[0].endpoint, "b");
        assert_eq!(result.counts.overwritten_begins, 1);
    }

    #[test]
    fn test_outlier_duration_discarded_and_state_released() {
        let tables = tables();
        let mut c = Correlator::new(&tables);
        c.ingest(before("ctx", 0.0, "/a"));
        c.ingest(after("ctx", 70_000.0));
        assert_eq!(c.pending_len(), 0);

        // A second end for the same key is now an orphan
        c.ingest(after("ctx", 70_001.0));

        let result = c.finish();
        assert!(result.requests.is_empty());
        assert_eq!(result.counts.discarded_durations, 1);
        assert_eq!(result.counts.orphaned_ends, 1);
    }

    #[test]
    fn test_non_positive_duration_discarded() {
        let tables = tables();
        let mut c = Correlator::new(&tables);
        c.ingest(before("a", 50.0, "/x"));
        c.ingest(after("a", 50.0));
        c.ingest(before("b", 50.0, "/x"));
        c.ingest(after("b", 40.0));

        let result = c.finish();
        assert!(result.requests.is_empty());
        assert_eq!(result.counts.discarded_durations, 2);
    }

    #[test]
    fn test_custom_ceiling() {
        let tables = tables();
        let mut c = Correlator::with_ceiling(&tables, 100.0);
        c.ingest(before("a", 0.0, "/x"));
        c.ingest(after("a", 100.0));
        c.ingest(before("b", 0.0, "/x"));
        c.ingest(after("b", 99.0));

        let result = c.finish();
        assert_eq!(result.requests.len(), 1);
        assert_eq!(result.requests[0].duration, 99.0);
    }

    #[test]
    fn test_unterminated_begins_dropped_at_finish() {
        let tables = tables();
        let mut c = Correlator::new(&tables);
        c.ingest(before("a", 1.0, "/x"));
        c.ingest(marker(MarkerKind::SpanStart, "b", "rpcOut:getcart:1", 2.0));
        assert_eq!(c.pending_len(), 2);

        let result = c.finish();
        assert!(result.requests.is_empty());
        assert_eq!(result.counts.unterminated_pending, 2);
    }

    #[test]
    fn test_concurrent_spans_in_one_context() {
        let tables = tables();
        let mut c = Correlator::new(&tables);
        let mut start_cart = marker(MarkerKind::SpanStart, "ctx", "rpcOut:getcart:1", 0.0);
        start_cart.payload.function_name = Some("getcart".to_string());
        let mut start_pay = marker(MarkerKind::SpanStart, "ctx", "rpcOut:payment:2", 5.0);
        start_pay.payload.function_name = Some("payment".to_string());

        c.ingest(start_cart);
        c.ingest(start_pay);
        c.ingest(marker(MarkerKind::SpanEnd, "ctx", "rpcOut:payment:2", 25.0));
        c.ingest(marker(MarkerKind::SpanEnd, "ctx", "rpcOut:getcart:1", 30.0));

        let result = c.finish();
        let durations: Vec<(String, f64)> = result
            .requests
            .iter()
            .map(|r| (r.endpoint.clone(), r.duration))
            .collect();
        assert_eq!(
            durations,
            vec![("payment".to_string(), 20.0), ("getcart".to_string(), 30.0)]
        );
        assert!(result.requests.iter().all(|r| r.kind == RequestKind::Span));
    }

    #[test]
    fn test_instant_measure_emits_without_state() {
        let tables = tables();
        let mut c = Correlator::new(&tables);
        let mut m = marker(
            MarkerKind::InstantMeasure { duration_ms: 12.5 },
            "ctx",
            "login",
            0.0,
        );
        m.payload.function_name = Some("login".to_string());
        c.ingest(m);
        assert_eq!(c.pending_len(), 0);

        let result = c.finish();
        assert_eq!(result.requests.len(), 1);
        assert_eq!(result.requests[0].kind, RequestKind::Measure);
        assert_eq!(result.requests[0].duration, 12.5);
        assert!(result.requests[0].is_auth);
    }

    #[test]
    fn test_zero_duration_measure_discarded() {
        let tables = tables();
        let mut c = Correlator::new(&tables);
        c.ingest(marker(
            MarkerKind::InstantMeasure { duration_ms: 0.0 },
            "ctx",
            "x",
            0.0,
        ));
        assert_eq!(c.finish().counts.discarded_durations, 1);
    }

    #[test]
    fn test_request_without_url_falls_back_to_function_name() {
        let tables = tables();
        let mut c = Correlator::new(&tables);
        let mut b = marker(MarkerKind::RequestBefore, "ctx", REQUEST_MARK_ID, 0.0);
        b.payload.function_name = Some("checkout".to_string());
        c.ingest(b);
        c.ingest(after("ctx", 5.0));
        c.ingest(marker(MarkerKind::RequestBefore, "ctx2", REQUEST_MARK_ID, 0.0));
        c.ingest(after("ctx2", 5.0));

        let result = c.finish();
        assert_eq!(result.requests[0].endpoint, "checkout");
        assert_eq!(result.requests[1].endpoint, UNKNOWN_ENDPOINT);
        assert_eq!(result.requests[1].category, "Other");
    }

    #[test]
    fn test_coldstart_flag_resolved_at_finish() {
        let tables = tables();
        let entries = vec![
            raw(100, json!({"contextId": "warm", "type": "before", "url": "/a"})),
            raw(110, json!({"contextId": "warm", "type": "after"})),
            raw(100, json!({"contextId": "cold", "type": "before", "url": "/b"})),
            raw(150, json!({"contextId": "cold", "type": "after"})),
            // Flag arrives after the pair already resolved
            json!({"__logentry__": {"data": {"event": {"contextId": "cold", "coldstart": true}}}}),
        ];

        let result = correlate(&entries, &tables);
        assert_eq!(result.requests.len(), 2);
        assert!(!result.requests[0].is_coldstart);
        assert!(result.requests[1].is_coldstart);
        // The flag-only entry has no marker
        assert_eq!(result.counts.entries_skipped, 1);
    }

    #[test]
    fn test_coldstart_flag_on_marker_entry() {
        let tables = tables();
        let entries = vec![
            raw(100, json!({"contextId": "cold", "type": "before", "url": "/b", "coldstart": true})),
            raw(150, json!({"contextId": "cold", "type": "after"})),
        ];

        let result = correlate(&entries, &tables);
        assert_eq!(result.requests.len(), 1);
        assert!(result.requests[0].is_coldstart);
        assert_eq!(result.counts.entries_skipped, 0);
    }

    #[test]
    fn test_ingest_marker_records_coldstart() {
        let tables = tables();
        let mut c = Correlator::new(&tables);
        let mut b = before("ctx", 0.0, "/cart");
        b.payload.coldstart = true;
        c.ingest(b);
        c.ingest(after("ctx", 5.0));

        assert!(c.finish().requests[0].is_coldstart);
    }

    #[test]
    fn test_correlate_counts_entries() {
        let tables = tables();
        let entries = vec![
            json!({"unrelated": true}),
            raw(100, json!({"contextId": "c", "type": "before", "url": "/login"})),
            json!("garbage"),
            raw(180, json!({"contextId": "c", "type": "after"})),
        ];

        let result = correlate(&entries, &tables);
        assert_eq!(result.counts.entries_seen, 4);
        assert_eq!(result.counts.entries_skipped, 2);
        assert_eq!(result.counts.markers_seen, 2);
        assert_eq!(result.requests.len(), 1);
        assert_eq!(result.requests[0].duration, 80.0);
        assert!(result.requests[0].is_auth);
    }

    #[test]
    fn test_correlate_is_deterministic() {
        let tables = tables();
        let entries: Vec<Value> = (0..50)
            .flat_map(|i| {
                let ctx = format!("ctx-{}", i % 7);
                vec![
                    raw(i * 10, json!({"contextId": ctx, "type": "before", "url": "/cart"})),
                    raw(i * 10 + 3 + i % 4, json!({"contextId": ctx, "type": "after"})),
                ]
            })
            .collect();

        assert_eq!(correlate(&entries, &tables), correlate(&entries, &tables));
    }
}
