//! loadscope - request correlation and time-windowed load analysis
//!
//! This library reconstructs per-request latencies from collected telemetry
//! (asynchronous begin/end markers and precomputed measures), classifies
//! them by endpoint, category and auth requirement, drops warm-up traffic, and
//! aggregates the rest into fixed time windows with throughput and percentile
//! statistics.
//!
//! The pipeline runs forward only:
//! raw entries → [`marker`] → [`correlator`] → [`warmup`] → [`window`].
//! [`analysis::LoadAnalyzer`] runs every stage and collects an
//! [`analysis::AnalysisReport`].

pub mod analysis;
pub mod breakdown;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod correlator;
pub mod csv_output;
pub mod input;
pub mod json_output;
pub mod marker;
pub mod request;
pub mod text_output;
pub mod warmup;
pub mod window;
