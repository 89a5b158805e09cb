//! Engine entry point: probe, plan, fetch, aggregate, merge, verify.
//!
//! Runs one `DownloadRequest` to completion. Fetchers execute on blocking
//! threads (one per segment); the aggregator runs as a tokio task beside
//! them; the merge runs strictly after every fetcher has terminated.

mod error;
mod report;
mod request;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::checksum;
use crate::control::CancelToken;
use crate::fetcher;
use crate::merge::{self, MergeError};
use crate::probe::{self, ProbeError};
use crate::progress::{self, ProgressSnapshot};
use crate::retry::RetryPolicy;
use crate::segmenter;
use crate::staging::StagingArea;
use crate::status::StatusTable;

pub use error::{EngineError, SegmentFailure};
pub use report::{DownloadReport, Stage, StageTiming};
pub use request::{DownloadRequest, MAX_PARALLELISM};

pub use crate::fetcher::ChaosPlan;

/// Runs a segmented download to completion.
///
/// `progress_tx`, when given, receives one `ProgressSnapshot` per
/// aggregator tick and a final one after the last fetcher terminates.
/// Cancellation via `cancel` is observed at every suspension point and
/// returns `EngineError::Cancelled` without merging; the staging directory
/// is preserved on both failure and cancellation so partial state can be
/// inspected.
pub async fn run(
    request: DownloadRequest,
    cancel: CancelToken,
    progress_tx: Option<mpsc::Sender<ProgressSnapshot>>,
) -> Result<DownloadReport, EngineError> {
    request.validate()?;
    if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }

    let meta = {
        let url = request.url.clone();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || probe::probe(&url, &cancel))
            .await
            .map_err(|e| EngineError::Runtime(format!("probe task: {}", e)))?
    };
    let meta = match meta {
        Ok(meta) => meta,
        Err(ProbeError::Cancelled) => return Err(EngineError::Cancelled),
        Err(e) => return Err(EngineError::ProbeFailed(e)),
    };
    tracing::info!(
        url = %request.url,
        total_bytes = meta.total_len,
        accept_ranges = meta.accept_ranges,
        "origin probed"
    );

    let parallelism = (request.parallelism as u64).min(meta.total_len) as usize;
    let staging = StagingArea::prepare(&request.output_path)
        .map_err(|e| EngineError::Runtime(format!("staging: {}", e)))?;
    let segments = segmenter::plan_segments(meta.total_len, parallelism, staging.dir());
    let status = StatusTable::new(segments.len());
    let policy = RetryPolicy::with_attempts(request.max_retries);

    let mut timings = Vec::new();
    let fetch_started = Instant::now();
    let done = Arc::new(AtomicBool::new(false));

    let aggregator = progress_tx.map(|tx| {
        tokio::spawn(progress::run_aggregator(
            segments.iter().map(|s| s.path.clone()).collect(),
            status.clone(),
            meta.total_len,
            request.progress_interval,
            fetch_started,
            Arc::clone(&done),
            tx,
        ))
    });

    let fetch_join = {
        let url = request.url.clone();
        let segments = segments.clone();
        let status = status.clone();
        let cancel = cancel.clone();
        let chaos = request.chaos;
        tokio::task::spawn_blocking(move || {
            fetcher::fetch_all(&url, &segments, policy, &status, &cancel, chaos);
        })
        .await
    };
    done.store(true, Ordering::Relaxed);
    if let Some(handle) = aggregator {
        let _ = handle.await;
    }
    fetch_join.map_err(|e| EngineError::Runtime(format!("fetch task: {}", e)))?;
    timings.push(StageTiming {
        stage: Stage::Fetch,
        duration: fetch_started.elapsed(),
    });

    if cancel.is_cancelled() {
        tracing::info!(url = %request.url, "download cancelled; staging preserved");
        return Err(EngineError::Cancelled);
    }
    if !status.all_succeeded() {
        let failures: Vec<SegmentFailure> = status
            .failures()
            .into_iter()
            .map(|(index, last_error)| SegmentFailure { index, last_error })
            .collect();
        if failures.is_empty() {
            return Err(EngineError::Runtime(
                "fetch workers exited without a final status".to_string(),
            ));
        }
        for failure in &failures {
            tracing::error!(index = failure.index, error = %failure.last_error, "segment failed");
        }
        return Err(EngineError::SegmentsExhausted {
            failures,
            recommended_retries: request.max_retries.saturating_mul(2),
        });
    }

    let merge_started = Instant::now();
    let merge_result = {
        let segments = segments.clone();
        let output = request.output_path.clone();
        let cancel = cancel.clone();
        let total = meta.total_len;
        tokio::task::spawn_blocking(move || {
            merge::merge_segments(&segments, &output, total, &cancel)
        })
        .await
        .map_err(|e| EngineError::Runtime(format!("merge task: {}", e)))?
    };
    match merge_result {
        Ok(()) => {}
        Err(MergeError::Cancelled) => return Err(EngineError::Cancelled),
        Err(e) => return Err(EngineError::MergeIo(e.to_string())),
    }
    timings.push(StageTiming {
        stage: Stage::Merge,
        duration: merge_started.elapsed(),
    });
    tracing::info!(path = %request.output_path.display(), "merge complete");

    if request.keep_segments {
        tracing::debug!(path = %staging.dir().display(), "keeping segment files");
    } else if let Err(e) = staging.remove() {
        tracing::warn!(path = %staging.dir().display(), error = %e, "could not remove staging directory");
    }

    let mut report = DownloadReport {
        url: request.url.clone(),
        output_path: request.output_path.clone(),
        parallelism,
        timings,
        segments: status.snapshot(),
        local_digest: None,
        expected_digest: request.expected_digest.clone(),
        verified: None,
    };

    if request.verify {
        if let Some(expected) = request.expected_digest.clone() {
            let verify_started = Instant::now();
            let local = {
                let path = request.output_path.clone();
                tokio::task::spawn_blocking(move || checksum::sha256_file(&path))
                    .await
                    .map_err(|e| EngineError::Runtime(format!("verify task: {}", e)))?
                    .map_err(|e| EngineError::Runtime(format!("verify: {}", e)))?
            };
            report.timings.push(StageTiming {
                stage: Stage::Verify,
                duration: verify_started.elapsed(),
            });
            let matches = checksum::digests_match(&expected, &local);
            report.local_digest = Some(local.clone());
            report.verified = Some(matches);
            if !matches {
                tracing::error!(expected = %expected, actual = %local, "digest mismatch; merged file retained");
                return Err(EngineError::VerificationFailed {
                    expected,
                    actual: local,
                    report: Box::new(report),
                });
            }
            tracing::info!("digest verified");
        }
    }

    Ok(report)
}
