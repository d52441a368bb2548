// Time-Windowed Load Analysis
//
// Buckets completed requests into fixed-width windows and reports throughput
// plus latency distribution per window, for the full set and the auth subset.
//
// Windows depend only on the finalized request set, so aggregation can be
// stopped between windows without corrupting those already produced.

mod aggregator;
mod load_level;
mod statistics;

pub use aggregator::{
    aggregate, TimeWindow, WindowAggregator, Windows, DEFAULT_WINDOW_SECONDS,
    MIN_AUTH_P95_SAMPLES,
};
pub use load_level::{summarize_load_levels, LoadLevel, LoadLevelSummary};
pub use statistics::{mean, percentile, percentile_sorted, DurationSummary, Moments};
