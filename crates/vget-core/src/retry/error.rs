//! Segment download error type.

use std::fmt;
use std::time::Duration;

/// Error from a single segment fetch attempt. Every variant except
/// `Cancelled` is retryable until the attempt budget is exhausted.
#[derive(Debug)]
pub enum SegmentError {
    /// Curl reported an error (timeout, connection, TLS, etc.).
    Curl(curl::Error),
    /// HTTP response had a non-2xx status.
    Http(u32),
    /// Transfer completed but the on-disk segment length does not match the
    /// planned range. Enables retry instead of silent corruption.
    SizeMismatch { expected: u64, actual: u64 },
    /// Segment file could not be created or written.
    Io(std::io::Error),
    /// The attempt made no progress for the whole attempt window.
    Stalled { waited: Duration },
    /// Cancellation was requested mid-attempt. Not retried.
    Cancelled,
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentError::Curl(e) => write!(f, "{}", e),
            SegmentError::Http(code) => write!(f, "HTTP {}", code),
            SegmentError::SizeMismatch { expected, actual } => {
                write!(f, "size mismatch: expected {} bytes, got {}", expected, actual)
            }
            SegmentError::Io(e) => write!(f, "io: {}", e),
            SegmentError::Stalled { waited } => {
                write!(f, "transfer stalled for {:.0?}", waited)
            }
            SegmentError::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for SegmentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SegmentError::Curl(e) => Some(e),
            SegmentError::Io(e) => Some(e),
            _ => None,
        }
    }
}
