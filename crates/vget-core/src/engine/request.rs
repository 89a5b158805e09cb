//! Download request accepted by the engine.

use std::path::PathBuf;
use std::time::Duration;

use crate::checksum;
use crate::fetcher::ChaosPlan;

use super::error::EngineError;

/// Hard cap on fetcher parallelism, independent of what the caller asks for.
pub const MAX_PARALLELISM: usize = 64;

/// Everything the engine needs for one run. Immutable once accepted;
/// ambient configuration is the caller's concern.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// Direct HTTP/HTTPS URL of the target.
    pub url: String,
    /// Final location of the merged file.
    pub output_path: PathBuf,
    /// Number of concurrent segment fetchers. Clamped to the file length.
    pub parallelism: usize,
    /// Attempt budget per segment, including the first attempt.
    pub max_retries: u32,
    /// Expected SHA-256 of the merged output, lowercase or uppercase hex.
    pub expected_digest: Option<String>,
    /// Compute and compare the digest after merging.
    pub verify: bool,
    /// Leave the staging directory in place after a successful run.
    pub keep_segments: bool,
    /// Deterministic fault injection; `None` for real runs.
    pub chaos: Option<ChaosPlan>,
    /// Aggregator sampling cadence.
    pub progress_interval: Duration,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output_path: output_path.into(),
            parallelism: 8,
            max_retries: 3,
            expected_digest: None,
            verify: false,
            keep_segments: false,
            chaos: None,
            progress_interval: crate::progress::DEFAULT_TICK,
        }
    }

    /// Checks the request shape and makes sure the output directory exists,
    /// creating it if needed.
    pub(super) fn validate(&self) -> Result<(), EngineError> {
        let parsed = url::Url::parse(&self.url)
            .map_err(|e| EngineError::InvalidRequest(format!("url: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(EngineError::InvalidRequest(format!(
                "unsupported scheme: {}",
                parsed.scheme()
            )));
        }
        if self.parallelism == 0 || self.parallelism > MAX_PARALLELISM {
            return Err(EngineError::InvalidRequest(format!(
                "parallelism must be in 1..={}, got {}",
                MAX_PARALLELISM, self.parallelism
            )));
        }
        if self.max_retries == 0 {
            return Err(EngineError::InvalidRequest(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if let Some(digest) = &self.expected_digest {
            if !checksum::is_hex_digest(digest) {
                return Err(EngineError::InvalidRequest(format!(
                    "expected digest must be 64 hex characters, got {:?}",
                    digest
                )));
            }
        }
        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    EngineError::InvalidRequest(format!(
                        "output directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        Ok(())
    }
}
