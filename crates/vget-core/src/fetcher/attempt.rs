//! Single range GET attempt: stream one segment's bytes to its file.

use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::control::CancelToken;
use crate::retry::SegmentError;
use crate::segmenter::Segment;

/// Receive buffer handed to libcurl. Body chunks arrive at most this large.
const RECV_BUFFER: usize = 512 * 1024;

/// Fetches `segment` with a `Range: bytes=start-end` GET, writing the body
/// to the segment file. Any stale partial file from a prior attempt is
/// unlinked first. On success the file is synced and its length validated
/// against the planned range; every exit path releases the file and the
/// transfer deterministically.
pub fn fetch_one(
    url: &str,
    segment: &Segment,
    cancel: &CancelToken,
    attempt_timeout: Duration,
) -> Result<(), SegmentError> {
    remove_stale(&segment.path)?;
    let file = File::options()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&segment.path)
        .map_err(SegmentError::Io)?;
    let file = Arc::new(file);

    let bytes_written = Arc::new(AtomicU64::new(0));
    let write_error: Arc<Mutex<Option<std::io::Error>>> = Arc::new(Mutex::new(None));

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(SegmentError::Curl)?;
    easy.follow_location(true).map_err(SegmentError::Curl)?;
    easy.max_redirections(10).map_err(SegmentError::Curl)?;
    easy.connect_timeout(Duration::from_secs(30))
        .map_err(SegmentError::Curl)?;
    // Prefer low-speed abort over a tight wall-clock timeout: kill the
    // attempt if throughput drops below 1 KiB/s for 60s.
    easy.low_speed_limit(1024).map_err(SegmentError::Curl)?;
    easy.low_speed_time(Duration::from_secs(60))
        .map_err(SegmentError::Curl)?;
    easy.timeout(attempt_timeout).map_err(SegmentError::Curl)?;
    easy.range(&segment.range_value()).map_err(SegmentError::Curl)?;
    // Many parallel streams to one host: no Nagle, no Expect: 100-continue
    // round-trip, large receive buffer.
    easy.tcp_nodelay(true).map_err(SegmentError::Curl)?;
    easy.buffer_size(RECV_BUFFER).map_err(SegmentError::Curl)?;
    let mut list = curl::easy::List::new();
    list.append("Expect:").map_err(SegmentError::Curl)?;
    easy.http_headers(list).map_err(SegmentError::Curl)?;
    easy.progress(true).map_err(SegmentError::Curl)?;

    {
        let file_cb = Arc::clone(&file);
        let bytes_cb = Arc::clone(&bytes_written);
        let error_cb = Arc::clone(&write_error);
        let cancel_cb = cancel.clone();
        let mut transfer = easy.transfer();
        transfer
            .write_function(move |data| {
                let off = bytes_cb.fetch_add(data.len() as u64, Ordering::Relaxed);
                match write_at(&file_cb, off, data) {
                    Ok(()) => Ok(data.len()),
                    Err(e) => {
                        let _ = error_cb.lock().unwrap().replace(e);
                        Ok(0) // aborts the transfer as a write error
                    }
                }
            })
            .map_err(SegmentError::Curl)?;
        transfer
            .progress_function(move |_, _, _, _| !cancel_cb.is_cancelled())
            .map_err(SegmentError::Curl)?;
        if let Err(e) = transfer.perform() {
            if e.is_aborted_by_callback() {
                return Err(SegmentError::Cancelled);
            }
            if e.is_write_error() {
                if let Some(io_err) = write_error.lock().unwrap().take() {
                    return Err(SegmentError::Io(io_err));
                }
            }
            return Err(SegmentError::Curl(e));
        }
    }

    let code = easy.response_code().map_err(SegmentError::Curl)?;
    if !(200..300).contains(&code) {
        return Err(SegmentError::Http(code));
    }

    file.sync_all().map_err(SegmentError::Io)?;
    let actual = std::fs::metadata(&segment.path)
        .map_err(SegmentError::Io)?
        .len();
    let expected = segment.len();
    if actual != expected {
        return Err(SegmentError::SizeMismatch { expected, actual });
    }
    Ok(())
}

/// Unlink a partial file left by a prior attempt. Missing is fine.
fn remove_stale(path: &Path) -> Result<(), SegmentError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SegmentError::Io(e)),
    }
}

/// Positioned write that does not move a shared cursor; safe to call from
/// the write callback while other threads write their own files.
#[cfg(unix)]
fn write_at(file: &File, offset: u64, data: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(data, offset)
}

#[cfg(not(unix))]
fn write_at(file: &File, offset: u64, data: &[u8]) -> std::io::Result<()> {
    use std::io::{Seek, SeekFrom, Write};
    let mut f = file.try_clone()?;
    f.seek(SeekFrom::Start(offset))?;
    f.write_all(data)
}
