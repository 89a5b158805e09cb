//! Deterministic fault injection for exercising the retry and reporting
//! paths against a well-behaved origin.
//!
//! Two canonical faults: segment 0 fails its first attempt with a synthetic
//! HTTP error, and segment 1 stalls for the whole attempt window on every
//! attempt. Injected faults flow through exactly the same retry, status and
//! reporting machinery as real ones.

use std::time::Duration;

use crate::control::CancelToken;
use crate::retry::SegmentError;

/// Per-attempt wall-clock cap while chaos is active.
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Which faults to inject. The CLI's `--chaos` switches on both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChaosPlan {
    /// Segment 0's first attempt fails with HTTP 503.
    pub fail_first: bool,
    /// Every attempt on segment 1 stalls and times out.
    pub stall: bool,
}

impl ChaosPlan {
    /// Both canonical faults.
    pub fn all() -> Self {
        Self {
            fail_first: true,
            stall: true,
        }
    }
}

/// Returns the injected fault for this attempt, or `None` to let the real
/// transfer run. `attempt` is 1-based.
pub(super) fn inject(
    plan: ChaosPlan,
    index: usize,
    attempt: u32,
    cancel: &CancelToken,
) -> Option<SegmentError> {
    if plan.fail_first && index == 0 && attempt == 1 {
        tracing::debug!(index, attempt, "injecting synthetic HTTP 503");
        return Some(SegmentError::Http(503));
    }
    if plan.stall && index == 1 {
        tracing::debug!(index, attempt, "injecting stalled attempt");
        if !cancel.sleep_interruptible(ATTEMPT_TIMEOUT) {
            return Some(SegmentError::Cancelled);
        }
        return Some(SegmentError::Stalled {
            waited: ATTEMPT_TIMEOUT,
        });
    }
    None
}
