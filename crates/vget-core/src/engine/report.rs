//! Result record produced at engine exit.

use std::path::PathBuf;
use std::time::Duration;

use crate::status::SegmentStatus;

/// Pipeline stage for timing entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Merge,
    Verify,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Stage::Fetch => "fetch",
            Stage::Merge => "merge",
            Stage::Verify => "verify",
        })
    }
}

/// Wall-clock duration of one executed stage. Stages that never ran have
/// no entry.
#[derive(Debug, Clone, Copy)]
pub struct StageTiming {
    pub stage: Stage,
    pub duration: Duration,
}

/// Summary of a completed run (or, boxed inside `VerificationFailed`, of a
/// run that merged fine but failed the digest comparison).
#[derive(Debug, Clone)]
pub struct DownloadReport {
    pub url: String,
    pub output_path: PathBuf,
    /// Effective fetcher count after clamping to the file length.
    pub parallelism: usize,
    pub timings: Vec<StageTiming>,
    /// Final slot states, indexed by segment.
    pub segments: Vec<SegmentStatus>,
    /// SHA-256 of the merged output, when verification ran.
    pub local_digest: Option<String>,
    pub expected_digest: Option<String>,
    /// `Some(true)` / `Some(false)` when verification ran, `None` when the
    /// request did not opt in or no expected digest was available.
    pub verified: Option<bool>,
}

impl DownloadReport {
    pub fn timing(&self, stage: Stage) -> Option<Duration> {
        self.timings
            .iter()
            .find(|t| t.stage == stage)
            .map(|t| t.duration)
    }

    /// Total retries across all segments.
    pub fn total_retries(&self) -> u32 {
        self.segments.iter().map(|s| s.retries).sum()
    }
}
