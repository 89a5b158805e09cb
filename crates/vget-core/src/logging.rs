//! Logging setup.
//!
//! The CLI repaints a terminal region while downloading, so log lines must
//! not interleave with the redraw: tracing output goes to a file under the
//! XDG state directory. Stderr logging exists only as a fallback for
//! environments without a writable state dir.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vget_core=debug,vget_cli=debug"))
}

/// Where log lines go: `~/.local/state/vget/vget.log`.
pub fn log_file() -> Result<PathBuf> {
    let state = xdg::BaseDirectories::with_prefix("vget")?.get_state_home();
    Ok(state.join("vget.log"))
}

/// Route tracing output to the log file, appending across runs. Returns the
/// file's path so the caller can point the user at it. On error, use
/// `init_stderr` instead.
pub fn init() -> Result<PathBuf> {
    let path = log_file()?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create log dir {}", dir.display()))?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {}", path.display()))?;

    // A mutex-guarded file is writer enough: a run emits a handful of
    // lines, nowhere near contention territory.
    tracing_subscriber::fmt()
        .with_env_filter(default_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .compact()
        .init();
    Ok(path)
}

/// Stderr logging, used when the log file cannot be opened. Lines will
/// interleave with the progress redraw.
pub fn init_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(default_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .compact()
        .init();
}
