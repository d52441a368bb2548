//! Latency breakdowns over the retained request set
//!
//! Groups durations by endpoint, category, and function name, and splits
//! the auth subset from everything else. Maps are ordered by key so reports
//! are stable across runs.

use crate::request::CorrelatedRequest;
use crate::window::DurationSummary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Invocation counters for one function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCounts {
    pub invocations: u64,
    pub coldstarts: u64,
}

/// Duration summaries grouped several ways
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub by_endpoint: BTreeMap<String, DurationSummary>,
    pub by_category: BTreeMap<String, DurationSummary>,
    /// Only records that name a function contribute
    pub by_function: BTreeMap<String, DurationSummary>,
    pub auth: Option<DurationSummary>,
    pub non_auth: Option<DurationSummary>,
    pub function_calls: BTreeMap<String, FunctionCounts>,
}

impl Breakdown {
    pub fn is_empty(&self) -> bool {
        self.by_endpoint.is_empty()
    }
}

/// Build every breakdown in one pass over `requests`
pub fn breakdown(requests: &[CorrelatedRequest]) -> Breakdown {
    let mut by_endpoint: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    let mut by_category: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    let mut by_function: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    let mut function_calls: BTreeMap<String, FunctionCounts> = BTreeMap::new();
    let mut auth = Vec::new();
    let mut non_auth = Vec::new();

    for req in requests {
        by_endpoint
            .entry(req.endpoint.as_str())
            .or_default()
            .push(req.duration);
        by_category
            .entry(req.category.as_str())
            .or_default()
            .push(req.duration);

        if let Some(name) = req.function_name.as_deref() {
            by_function.entry(name).or_default().push(req.duration);

            let counts = function_calls.entry(name.to_string()).or_default();
            counts.invocations += 1;
            if req.is_coldstart {
                counts.coldstarts += 1;
            }
        }

        if req.is_auth {
            auth.push(req.duration);
        } else {
            non_auth.push(req.duration);
        }
    }

    Breakdown {
        by_endpoint: summarize(by_endpoint),
        by_category: summarize(by_category),
        by_function: summarize(by_function),
        auth: DurationSummary::from_durations(&auth),
        non_auth: DurationSummary::from_durations(&non_auth),
        function_calls,
    }
}

fn summarize(groups: BTreeMap<&str, Vec<f64>>) -> BTreeMap<String, DurationSummary> {
    groups
        .into_iter()
        .filter_map(|(key, durations)| {
            DurationSummary::from_durations(&durations).map(|s| (key.to_string(), s))
        })
        .collect()
}
