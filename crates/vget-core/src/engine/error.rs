//! Structured error taxonomy for a download run.

use thiserror::Error;

use crate::probe::ProbeError;

use super::report::DownloadReport;

/// One exhausted segment: index and the error from its final attempt.
#[derive(Debug, Clone)]
pub struct SegmentFailure {
    pub index: usize,
    pub last_error: String,
}

impl std::fmt::Display for SegmentFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "segment {}: {}", self.index, self.last_error)
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// Request rejected before any work was done.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// HEAD probe failed; no work was done.
    #[error("probe failed: {0}")]
    ProbeFailed(#[from] ProbeError),

    /// At least one segment exhausted its retry budget. The staging
    /// directory is preserved for diagnosis.
    #[error("{} segment(s) failed after exhausting retries; consider --retries={}", failures.len(), recommended_retries)]
    SegmentsExhausted {
        failures: Vec<SegmentFailure>,
        /// Suggested budget for the operator's next run.
        recommended_retries: u32,
    },

    /// Merge-stage I/O failure; the temp output was unlinked.
    #[error("merge failed: {0}")]
    MergeIo(String),

    /// The merged file's digest does not match the expected one. The file
    /// is retained for inspection; the full report rides along so callers
    /// still see timings and digests.
    #[error("verification failed: expected {expected}, got {actual}")]
    VerificationFailed {
        expected: String,
        actual: String,
        report: Box<DownloadReport>,
    },

    /// Cooperative cancellation. Nothing was merged; staging is left as-is.
    #[error("download cancelled")]
    Cancelled,

    /// A worker task died (panic or runtime shutdown).
    #[error("runtime failure: {0}")]
    Runtime(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_message_names_count_and_recommendation() {
        let err = EngineError::SegmentsExhausted {
            failures: vec![SegmentFailure {
                index: 1,
                last_error: "transfer stalled for 5s".to_string(),
            }],
            recommended_retries: 6,
        };
        let msg = err.to_string();
        assert!(msg.contains("1 segment(s)"));
        assert!(msg.contains("--retries=6"));
    }

    #[test]
    fn segment_failure_display() {
        let f = SegmentFailure {
            index: 3,
            last_error: "HTTP 503".to_string(),
        };
        assert_eq!(f.to_string(), "segment 3: HTTP 503");
    }
}
