//! Progress aggregation: a timed sampling loop running alongside the
//! fetchers.
//!
//! Each tick stats every segment file, snapshots the status table, and
//! emits one `ProgressSnapshot` over a channel. The loop never mutates
//! download state and swallows all I/O errors — a file that is missing,
//! mid-unlink by a retrying fetcher, or still growing simply contributes
//! what can be observed this tick.

mod snapshot;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::status::StatusTable;

pub use snapshot::{ProgressSnapshot, SegmentCell};

/// Default sampling cadence.
pub const DEFAULT_TICK: Duration = Duration::from_millis(400);

/// Runs until `done` is set, emitting one snapshot per tick and a final
/// snapshot before returning. Exits early if the receiver goes away.
pub async fn run_aggregator(
    segment_paths: Vec<PathBuf>,
    status: StatusTable,
    total_bytes: u64,
    tick: Duration,
    started: Instant,
    done: Arc<AtomicBool>,
    tx: mpsc::Sender<ProgressSnapshot>,
) {
    loop {
        let finished = done.load(Ordering::Relaxed);
        let snap = sample(&segment_paths, &status, total_bytes, started);
        if finished {
            let _ = tx.send(snap).await;
            return;
        }
        // Drop the tick on a full channel rather than stall the loop.
        if tx.try_send(snap).is_err() && tx.is_closed() {
            return;
        }
        tokio::time::sleep(tick).await;
    }
}

/// Builds one snapshot from current on-disk sizes and the status table.
fn sample(
    segment_paths: &[PathBuf],
    status: &StatusTable,
    total_bytes: u64,
    started: Instant,
) -> ProgressSnapshot {
    let on_disk: u64 = segment_paths
        .iter()
        .map(|p| std::fs::metadata(p).map(|m| m.len()).unwrap_or(0))
        .sum();
    let cells = status.snapshot().iter().map(SegmentCell::from).collect();
    ProgressSnapshot {
        bytes_done: on_disk.min(total_bytes),
        total_bytes,
        elapsed_secs: started.elapsed().as_secs_f64(),
        cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::SegmentState;

    #[test]
    fn sample_counts_existing_files_and_clamps() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("segment_0");
        let b = dir.path().join("segment_1");
        std::fs::write(&a, vec![0u8; 300]).unwrap();
        // segment_1 missing: contributes 0
        let status = StatusTable::new(2);
        let snap = sample(&[a.clone(), b], &status, 250, Instant::now());
        assert_eq!(snap.bytes_done, 250, "clamped to total");
        assert_eq!(snap.cells.len(), 2);
        assert_eq!(snap.cells[0].state, SegmentState::Pending);
    }

    #[test]
    fn sample_reflects_status_table() {
        let dir = tempfile::tempdir().unwrap();
        let status = StatusTable::new(2);
        status.mark_retrying(0, 2, "HTTP 500".into());
        status.mark_succeeded(1, 0);
        let snap = sample(
            &[dir.path().join("x"), dir.path().join("y")],
            &status,
            100,
            Instant::now(),
        );
        assert_eq!(snap.cells[0].state, SegmentState::Retrying);
        assert_eq!(snap.cells[0].retries, 2);
        assert_eq!(snap.cells[1].state, SegmentState::Succeeded);
    }

    #[tokio::test]
    async fn aggregator_emits_final_snapshot_when_done() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segment_0");
        std::fs::write(&path, vec![0u8; 64]).unwrap();
        let status = StatusTable::new(1);
        status.mark_succeeded(0, 0);
        let done = Arc::new(AtomicBool::new(true));
        let (tx, mut rx) = mpsc::channel(4);
        run_aggregator(
            vec![path],
            status,
            64,
            Duration::from_millis(10),
            Instant::now(),
            done,
            tx,
        )
        .await;
        let last = rx.recv().await.expect("final snapshot");
        assert_eq!(last.bytes_done, 64);
        assert_eq!(last.cells[0].state, SegmentState::Succeeded);
        assert!(rx.recv().await.is_none(), "sender dropped after final snapshot");
    }
}
