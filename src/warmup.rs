//! Warm-up exclusion
//!
//! The first seconds of a load run are dominated by cold starts and cache
//! fills. Requests that start before `t0 + warmup_seconds` are removed, where
//! `t0` is the earliest start time in the batch.

use crate::request::CorrelatedRequest;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of warm-up filtering
#[derive(Debug, Clone, PartialEq)]
pub struct WarmupFiltered {
    /// Requests kept, in their original order
    pub retained: Vec<CorrelatedRequest>,
    /// Requests removed as warm-up traffic
    pub excluded_count: usize,
    /// First instant considered steady state; `None` when no request had a
    /// start time and filtering was skipped
    pub cutoff: Option<DateTime<Utc>>,
}

impl WarmupFiltered {
    /// True when no request carried a start time, so nothing was classified
    pub fn is_noop(&self) -> bool {
        self.cutoff.is_none()
    }

    pub fn summary(&self, warmup_seconds: u64) -> WarmupSummary {
        WarmupSummary {
            applied: !self.is_noop(),
            warmup_seconds,
            excluded_count: self.excluded_count,
            cutoff: self.cutoff,
        }
    }
}

/// Serializable description of what warm-up filtering did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarmupSummary {
    pub applied: bool,
    pub warmup_seconds: u64,
    pub excluded_count: usize,
    pub cutoff: Option<DateTime<Utc>>,
}

/// Drop requests that started during the warm-up interval
///
/// Requests without a start time cannot be classified and are always kept.
pub fn filter_warmup(requests: Vec<CorrelatedRequest>, warmup_seconds: u64) -> WarmupFiltered {
    let Some(t0) = requests.iter().filter_map(|r| r.start_time).min() else {
        tracing::warn!(
            requests = requests.len(),
            "no request carries a start time; warm-up filter not applied"
        );
        return WarmupFiltered {
            retained: requests,
            excluded_count: 0,
            cutoff: None,
        };
    };

    let cutoff = i64::try_from(warmup_seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|span| t0.checked_add_signed(span))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    let total = requests.len();
    let retained: Vec<CorrelatedRequest> = requests
        .into_iter()
        .filter(|r| r.start_time.map_or(true, |start| start >= cutoff))
        .collect();
    let excluded_count = total - retained.len();

    if excluded_count > 0 {
        tracing::info!(
            excluded = excluded_count,
            warmup_seconds,
            "excluded requests from warm-up period"
        );
    }

    WarmupFiltered {
        retained,
        excluded_count,
        cutoff: Some(cutoff),
    }
}
