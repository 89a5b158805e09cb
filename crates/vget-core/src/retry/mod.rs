//! Retry and backoff policy for segment fetches.
//!
//! Every per-attempt fault is retryable; a segment only becomes `Failed`
//! when the attempt budget runs out. Backoff between attempts is a fixed
//! delay, interruptible by cancellation.

mod error;
mod policy;

pub use error::SegmentError;
pub use policy::{RetryDecision, RetryPolicy};
