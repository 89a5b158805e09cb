//! Merge stage: concatenate segment files into the final output.
//!
//! Segments are copied in strict index order — completion order is
//! irrelevant and never consulted. The output is assembled in
//! `<output>.tmp`, preallocated to the full length, then atomically
//! renamed over the final path. On any error the temp file is unlinked.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::control::CancelToken;
use crate::segmenter::Segment;

/// Copy buffer for the segment -> output stream.
const COPY_BUFFER: usize = 1024 * 1024;

/// Suffix of the in-progress output file.
pub const TEMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("segment {0} file is missing")]
    MissingSegment(usize),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cancelled")]
    Cancelled,
}

impl MergeError {
    fn io(context: impl Into<String>) -> impl FnOnce(std::io::Error) -> MergeError {
        let context = context.into();
        move |source| MergeError::Io { context, source }
    }
}

/// Path of the in-progress file: appends `.tmp` to the final path.
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Concatenates all segment files into `output_path`. Blocking; call from
/// `spawn_blocking` when used from async code. Segment files are left in
/// place — staging cleanup is the engine's decision.
pub fn merge_segments(
    segments: &[Segment],
    output_path: &Path,
    total_len: u64,
    cancel: &CancelToken,
) -> Result<(), MergeError> {
    for segment in segments {
        if !segment.path.is_file() {
            return Err(MergeError::MissingSegment(segment.index));
        }
    }

    let tmp = temp_path(output_path);
    let result = write_merged(segments, &tmp, total_len, cancel);
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
        return result;
    }

    // Replace any previous output, then atomically publish the new one.
    match std::fs::remove_file(output_path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            let _ = std::fs::remove_file(&tmp);
            return Err(MergeError::io(format!("unlink {}", output_path.display()))(e));
        }
    }
    if let Err(e) = std::fs::rename(&tmp, output_path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(MergeError::io(format!(
            "rename {} to {}",
            tmp.display(),
            output_path.display()
        ))(e));
    }
    Ok(())
}

fn write_merged(
    segments: &[Segment],
    tmp: &Path,
    total_len: u64,
    cancel: &CancelToken,
) -> Result<(), MergeError> {
    let mut out = File::options()
        .write(true)
        .create(true)
        .truncate(true)
        .open(tmp)
        .map_err(MergeError::io(format!("create {}", tmp.display())))?;
    if !try_fallocate(&out, total_len) {
        tracing::debug!(bytes = total_len, "extent reservation unavailable, sizing output with set_len");
        out.set_len(total_len)
            .map_err(MergeError::io(format!("reserve {}", tmp.display())))?;
    }

    let mut buf = vec![0u8; COPY_BUFFER];
    for segment in segments {
        let mut input = File::open(&segment.path)
            .map_err(MergeError::io(format!("open segment {}", segment.index)))?;
        loop {
            if cancel.is_cancelled() {
                return Err(MergeError::Cancelled);
            }
            let n = input
                .read(&mut buf)
                .map_err(MergeError::io(format!("read segment {}", segment.index)))?;
            if n == 0 {
                break;
            }
            out.write_all(&buf[..n])
                .map_err(MergeError::io(format!("write segment {}", segment.index)))?;
        }
        // input closed here before the next segment is opened
    }

    out.flush()
        .map_err(MergeError::io(format!("flush {}", tmp.display())))?;
    out.sync_all()
        .map_err(MergeError::io(format!("sync {}", tmp.display())))?;
    Ok(())
}

/// Best-effort extent reservation for the merge output. False means the
/// caller must size the file some other way.
#[cfg(unix)]
fn try_fallocate(file: &File, len: u64) -> bool {
    use std::os::unix::io::AsRawFd;
    unsafe { libc::posix_fallocate(file.as_raw_fd(), 0, len as libc::off_t) == 0 }
}

#[cfg(not(unix))]
fn try_fallocate(_file: &File, _len: u64) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::plan_segments;

    fn write_segments(dir: &Path, body: &[u8], n: usize) -> Vec<Segment> {
        let segments = plan_segments(body.len() as u64, n, dir);
        for s in &segments {
            let chunk = &body[s.start as usize..=s.end as usize];
            std::fs::write(&s.path, chunk).unwrap();
        }
        segments
    }

    #[test]
    fn temp_path_appends_tmp() {
        assert_eq!(
            temp_path(Path::new("/data/image.vhd")),
            Path::new("/data/image.vhd.tmp")
        );
    }

    #[test]
    fn merge_concatenates_in_index_order() {
        let dir = tempfile::tempdir().unwrap();
        let body: Vec<u8> = (0u8..=255).cycle().take(4096 + 37).collect();
        let segments = write_segments(dir.path(), &body, 4);
        let output = dir.path().join("out.bin");

        merge_segments(&segments, &output, body.len() as u64, &CancelToken::new()).unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), body);
        assert!(!temp_path(&output).exists());
    }

    #[test]
    fn merge_overwrites_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let body = b"fresh content".to_vec();
        let segments = write_segments(dir.path(), &body, 2);
        let output = dir.path().join("out.bin");
        std::fs::write(&output, b"old content that is longer").unwrap();

        merge_segments(&segments, &output, body.len() as u64, &CancelToken::new()).unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), body);
    }

    #[test]
    fn merge_fails_on_missing_segment() {
        let dir = tempfile::tempdir().unwrap();
        let body = vec![7u8; 1000];
        let segments = write_segments(dir.path(), &body, 4);
        std::fs::remove_file(&segments[2].path).unwrap();
        let output = dir.path().join("out.bin");

        let err = merge_segments(&segments, &output, 1000, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, MergeError::MissingSegment(2)));
        assert!(!output.exists());
        assert!(!temp_path(&output).exists());
    }

    #[test]
    fn merge_cancelled_unlinks_temp() {
        let dir = tempfile::tempdir().unwrap();
        let body = vec![1u8; 512];
        let segments = write_segments(dir.path(), &body, 1);
        let output = dir.path().join("out.bin");
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = merge_segments(&segments, &output, 512, &cancel).unwrap_err();
        assert!(matches!(err, MergeError::Cancelled));
        assert!(!output.exists());
        assert!(!temp_path(&output).exists());
    }
}
