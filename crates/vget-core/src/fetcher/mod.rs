//! Concurrent segment fetchers.
//!
//! One worker thread per segment, each with its own curl easy handle per
//! attempt, so there is no shared connection pool to saturate and no
//! head-of-line blocking between segments. Each worker owns its segment
//! file and its status slot; faults are retried with a fixed backoff until
//! the attempt budget runs out. Cancellation is observed between attempts,
//! during backoff, and mid-transfer.

pub mod attempt;
pub mod chaos;

use std::time::Duration;

use crate::control::CancelToken;
use crate::retry::{RetryDecision, RetryPolicy, SegmentError};
use crate::segmenter::Segment;
use crate::status::StatusTable;

pub use chaos::ChaosPlan;

/// Per-attempt wall-clock cap for normal runs. Large segments on slow links
/// are protected by the low-speed abort instead, so this is only a safety
/// net against a completely stuck transfer.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(3600);

/// Downloads every segment concurrently, updating `status` as attempts
/// succeed or fail. Blocks until all workers have terminated; outcomes are
/// read from the status table.
pub fn fetch_all(
    url: &str,
    segments: &[Segment],
    policy: RetryPolicy,
    status: &StatusTable,
    cancel: &CancelToken,
    chaos: Option<ChaosPlan>,
) {
    let attempt_timeout = if chaos.is_some() {
        chaos::ATTEMPT_TIMEOUT
    } else {
        ATTEMPT_TIMEOUT
    };
    std::thread::scope(|scope| {
        for segment in segments {
            scope.spawn(move || {
                fetch_segment(url, segment, policy, status, cancel, chaos, attempt_timeout);
            });
        }
    });
}

/// Retry loop for one segment. Owns the segment file and status slot for
/// the duration of the download.
fn fetch_segment(
    url: &str,
    segment: &Segment,
    policy: RetryPolicy,
    status: &StatusTable,
    cancel: &CancelToken,
    chaos: Option<ChaosPlan>,
    attempt_timeout: Duration,
) {
    let mut retries = 0u32;
    loop {
        if cancel.is_cancelled() {
            return;
        }
        let injected = chaos.and_then(|plan| chaos::inject(plan, segment.index, retries + 1, cancel));
        let result = match injected {
            Some(err) => Err(err),
            None => attempt::fetch_one(url, segment, cancel, attempt_timeout),
        };
        match result {
            Ok(()) => {
                tracing::debug!(index = segment.index, retries, "segment complete");
                status.mark_succeeded(segment.index, retries);
                return;
            }
            // Leave the slot as the aggregator last saw it; the engine
            // reports Cancelled for the whole run.
            Err(SegmentError::Cancelled) => return,
            Err(err) => {
                retries += 1;
                match policy.decide(retries) {
                    RetryDecision::NoRetry => {
                        tracing::warn!(index = segment.index, retries, error = %err, "segment exhausted retry budget");
                        status.mark_failed(segment.index, retries, err.to_string());
                        return;
                    }
                    RetryDecision::RetryAfter(backoff) => {
                        tracing::debug!(index = segment.index, retries, error = %err, "segment attempt failed, backing off");
                        status.mark_retrying(segment.index, retries, err.to_string());
                        if !cancel.sleep_interruptible(backoff) {
                            return;
                        }
                    }
                }
            }
        }
    }
}
