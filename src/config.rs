// Analysis configuration
//
// Every threshold the pipeline uses lives here. Values load from a TOML file
// with missing keys falling back to defaults, and CLI flags override them.

use crate::correlator::DURATION_CEILING_MS;
use crate::request::RequestKind;
use crate::window::{DEFAULT_WINDOW_SECONDS, MIN_AUTH_P95_SAMPLES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default warm-up interval in seconds
pub const DEFAULT_WARMUP_SECONDS: u64 = 60;

/// Errors from loading or validating an [`AnalysisConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("window_seconds must be positive")]
    ZeroWindow,

    #[error("duration_ceiling_ms must be a positive finite number, got {0}")]
    InvalidCeiling(f64),

    #[error("min_auth_p95_samples must be at least 1")]
    ZeroAuthSamples,

    #[error("windowed_kinds must name at least one record kind")]
    NoWindowedKinds,
}

/// Tunables for one analysis run
///
/// # Example
/// ```
/// use loadscope::config::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert_eq!(config.warmup_seconds, 60);
/// assert_eq!(config.window_seconds, 5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Leading interval excluded as warm-up traffic
    pub warmup_seconds: u64,

    /// Width of each aggregation window
    pub window_seconds: u64,

    /// Durations at or above this many milliseconds are discarded as bogus
    pub duration_ceiling_ms: f64,

    /// Auth P95 is reported only with at least this many auth samples in a window
    pub min_auth_p95_samples: usize,

    /// When false, warm-up traffic stays in the analysis
    pub exclude_warmup: bool,

    /// Record kinds that feed the time windows
    ///
    /// Spans and measures are sub-steps of a request; windowing them alongside
    /// whole requests would double count throughput.
    pub windowed_kinds: Vec<RequestKind>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            warmup_seconds: DEFAULT_WARMUP_SECONDS,
            window_seconds: DEFAULT_WINDOW_SECONDS,
            duration_ceiling_ms: DURATION_CEILING_MS,
            min_auth_p95_samples: MIN_AUTH_P95_SAMPLES,
            exclude_warmup: true,
            windowed_kinds: vec![RequestKind::Request],
        }
    }
}

impl AnalysisConfig {
    /// Load from a TOML file; absent keys keep their defaults
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_seconds == 0 {
            return Err(ConfigError::ZeroWindow);
        }

        if !self.duration_ceiling_ms.is_finite() || self.duration_ceiling_ms <= 0.0 {
            return Err(ConfigError::InvalidCeiling(self.duration_ceiling_ms));
        }

        if self.min_auth_p95_samples == 0 {
            return Err(ConfigError::ZeroAuthSamples);
        }

        if self.windowed_kinds.is_empty() {
            return Err(ConfigError::NoWindowedKinds);
        }

        Ok(())
    }

    /// Whether records of `kind` feed the time windows
    pub fn windows_kind(&self, kind: RequestKind) -> bool {
        self.windowed_kinds.contains(&kind)
    }
}
