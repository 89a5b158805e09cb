//! Staging directory holding per-segment files during a run.
//!
//! Lives at `<output_dir>/.segments`. A stale directory left behind by a
//! previous run is removed when the run starts. On success the directory is
//! removed unless the caller asked to keep the segments; on failure and on
//! cancellation it is left in place so the partial state can be inspected.

use std::io;
use std::path::{Path, PathBuf};

/// Directory name under the output file's parent.
const STAGING_DIR_NAME: &str = ".segments";

#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    /// Create a fresh staging directory next to `output_path`, removing any
    /// stale one from an earlier run.
    pub fn prepare(output_path: &Path) -> io::Result<Self> {
        let parent = output_path.parent().unwrap_or_else(|| Path::new("."));
        let dir = parent.join(STAGING_DIR_NAME);
        if dir.exists() {
            tracing::debug!(path = %dir.display(), "removing stale staging directory");
            std::fs::remove_dir_all(&dir)?;
        }
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Remove the staging directory and everything in it. Missing is fine.
    pub fn remove(&self) -> io::Result<()> {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("image.vhd");
        let staging = StagingArea::prepare(&output).unwrap();
        assert!(staging.dir().is_dir());
        assert_eq!(staging.dir(), dir.path().join(".segments"));
    }

    #[test]
    fn prepare_removes_stale_contents() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("image.vhd");
        let stale = dir.path().join(".segments");
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::write(stale.join("segment_0"), b"leftover").unwrap();

        let staging = StagingArea::prepare(&output).unwrap();
        assert!(staging.dir().is_dir());
        assert!(!staging.dir().join("segment_0").exists());
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("image.vhd");
        let staging = StagingArea::prepare(&output).unwrap();
        staging.remove().unwrap();
        assert!(!staging.dir().exists());
        staging.remove().unwrap();
    }
}
