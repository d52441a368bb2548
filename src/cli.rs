//! CLI argument parsing for loadscope

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for analysis reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables (default)
    Text,
    /// JSON document for machine parsing
    Json,
    /// CSV rows for spreadsheets and plotting
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "loadscope")]
#[command(version)]
#[command(
    about = "Correlate request telemetry and report time-windowed load statistics",
    long_about = None
)]
pub struct Cli {
    /// Collected batch: a JSON array of log entries, or JSON Lines
    #[arg(value_name = "DATA_PATH")]
    pub data_path: PathBuf,

    /// Analysis settings (TOML)
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Category and auth keyword tables (TOML); embedded defaults otherwise
    #[arg(long = "classifier", value_name = "FILE")]
    pub classifier: Option<PathBuf>,

    /// Leading seconds excluded as warm-up (overrides config)
    #[arg(long = "warmup-seconds", value_name = "SECONDS")]
    pub warmup_seconds: Option<u64>,

    /// Aggregation window width (overrides config)
    #[arg(long = "window-seconds", value_name = "SECONDS")]
    pub window_seconds: Option<u64>,

    /// Keep warm-up traffic in the analysis
    #[arg(long = "include-warmup")]
    pub include_warmup: bool,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Emit individual requests (JSON: `requests` array; CSV: request rows instead of windows)
    #[arg(long = "include-requests")]
    pub include_requests: bool,

    /// Write the report here instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
