//! Reading collected batches from disk
//!
//! A batch is either one JSON array of entries or JSON Lines (one entry per
//! line). Malformed lines in JSON Lines input are skipped, matching how the
//! parser treats foreign entries.

use crate::marker::RawLogEntry;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to read batch {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("batch is not a valid JSON array: {0}")]
    InvalidArray(#[source] serde_json::Error),
}

/// Load a batch file
pub fn read_batch<P: AsRef<Path>>(path: P) -> Result<Vec<RawLogEntry>, BatchError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| BatchError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_batch(&content)
}

/// Parse batch content, detecting the array or JSON Lines layout
pub fn parse_batch(content: &str) -> Result<Vec<RawLogEntry>, BatchError> {
    if content.trim_start().starts_with('[') {
        return serde_json::from_str(content).map_err(BatchError::InvalidArray);
    }

    let mut entries: Vec<RawLogEntry> = Vec::new();
    let mut malformed = 0usize;
    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match serde_json::from_str(line) {
            Ok(entry) => entries.push(entry),
            Err(_) => malformed += 1,
        }
    }

    if malformed > 0 {
        tracing::warn!(malformed, "skipped malformed JSON Lines entries");
    }
    Ok(entries)
}
