//! Cooperative cancellation for a single download run.
//!
//! One token is threaded through every suspension point: the HEAD probe,
//! each range GET (via curl's progress callback), backoff sleeps, the
//! aggregator tick loop, and the merge copy loop. Setting the token drops
//! in-flight transfers and unwinds the engine with a `Cancelled` error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Granularity of interruptible sleeps. Bounds how long a backoff or a
/// synthetic stall keeps running after cancellation is requested.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Shared cancellation flag. Cheap to clone; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Sleep for `duration`, waking early if cancellation is requested.
    /// Returns `true` if the full duration elapsed, `false` on cancellation.
    pub fn sleep_interruptible(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}
