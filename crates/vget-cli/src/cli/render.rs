//! Terminal rendering: live progress redraw and the final summary table.
//!
//! The live view is a stats line plus a heatmap grid, one cell per segment.
//! Each redraw clears the previously drawn region and repaints it in a
//! single write, so the terminal region stays stable instead of scrolling.

use std::io::Write;
use std::time::Duration;

use tokio::sync::mpsc;

use vget_core::engine::DownloadReport;
use vget_core::progress::{ProgressSnapshot, SegmentCell};
use vget_core::status::{SegmentState, SegmentStatus};

const MIB: f64 = 1_048_576.0;

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Consumes snapshots until the engine drops the sender, repainting the
/// progress region on each one. The last frame is left on screen.
pub async fn render_loop(mut rx: mpsc::Receiver<ProgressSnapshot>, columns: usize) {
    let mut drawn_lines = 0usize;
    while let Some(snapshot) = rx.recv().await {
        let frame = frame_lines(&snapshot, columns);
        let mut out = String::new();
        if drawn_lines > 0 {
            // Move to the top of the previously drawn region and clear it.
            out.push_str(&format!("\x1b[{}A\r\x1b[J", drawn_lines));
        }
        for line in &frame {
            out.push_str(line);
            out.push('\n');
        }
        drawn_lines = frame.len();
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(out.as_bytes());
        let _ = stdout.flush();
    }
}

/// Builds the lines of one progress frame: stats first, then the heatmap.
fn frame_lines(snapshot: &ProgressSnapshot, columns: usize) -> Vec<String> {
    let mut lines = vec![stats_line(snapshot)];
    lines.extend(heatmap_lines(&snapshot.cells, columns));
    lines
}

fn stats_line(snapshot: &ProgressSnapshot) -> String {
    let done = snapshot
        .cells
        .iter()
        .filter(|c| c.state == SegmentState::Succeeded)
        .count();
    format!(
        "  {:.1} / {:.1} MiB ({:5.1}%)  {:.2} MiB/s  ETA {}  [{}/{} segments]",
        snapshot.bytes_done as f64 / MIB,
        snapshot.total_bytes as f64 / MIB,
        snapshot.fraction() * 100.0,
        snapshot.bytes_per_sec() / MIB,
        snapshot
            .eta_secs()
            .map(format_secs)
            .unwrap_or_else(|| "--".to_string()),
        done,
        snapshot.cells.len()
    )
}

/// Rows of colored cells, `columns` per row. Each cell shows the segment's
/// retry count; color encodes state.
fn heatmap_lines(cells: &[SegmentCell], columns: usize) -> Vec<String> {
    let columns = columns.max(1);
    cells
        .chunks(columns)
        .map(|row| {
            let mut line = String::from("  ");
            for cell in row {
                line.push_str(cell_color(cell.state));
                line.push(cell_char(cell));
                line.push_str(RESET);
                line.push(' ');
            }
            line.pop();
            line
        })
        .collect()
}

fn cell_char(cell: &SegmentCell) -> char {
    match cell.state {
        SegmentState::Pending => '\u{b7}', // ·
        _ if cell.retries > 9 => '+',
        _ => char::from_digit(cell.retries, 10).unwrap_or('+'),
    }
}

fn cell_color(state: SegmentState) -> &'static str {
    match state {
        SegmentState::Succeeded => GREEN,
        SegmentState::Retrying => YELLOW,
        SegmentState::Failed => RED,
        SegmentState::Pending => DIM,
    }
}

fn format_secs(secs: f64) -> String {
    if secs >= 90.0 {
        format!("{:.0}m{:02.0}s", (secs / 60.0).floor(), secs % 60.0)
    } else {
        format!("{:.0}s", secs)
    }
}

fn format_duration(d: Duration) -> String {
    format_secs(d.as_secs_f64())
}

/// Final summary: stage timings, per-segment outcomes, digests.
pub fn print_summary(report: &DownloadReport, columns: usize) {
    println!(
        "\n{} -> {} ({} segments)",
        report.url,
        report.output_path.display(),
        report.parallelism
    );
    for timing in &report.timings {
        println!("  {:<7} {}", timing.stage, format_duration(timing.duration));
    }

    let succeeded = report
        .segments
        .iter()
        .filter(|s| s.state == SegmentState::Succeeded)
        .count();
    println!(
        "  segments: {}/{} succeeded, {} total retries",
        succeeded,
        report.segments.len(),
        report.total_retries()
    );
    let cells: Vec<SegmentCell> = report.segments.iter().map(SegmentCell::from).collect();
    for line in heatmap_lines(&cells, columns) {
        println!("{}", line);
    }
    for status in failed_segments(&report.segments) {
        println!("{}", status);
    }

    if let Some(local) = &report.local_digest {
        println!("  sha256:   {}", local);
    }
    if let Some(expected) = &report.expected_digest {
        println!("  expected: {}", expected);
    }
    match report.verified {
        Some(true) => println!("  verified: yes"),
        Some(false) => println!("  verified: NO — digest mismatch"),
        None => {}
    }
}

/// Failure lines for the summary, one per failed segment.
fn failed_segments(segments: &[SegmentStatus]) -> Vec<String> {
    segments
        .iter()
        .enumerate()
        .filter(|(_, s)| s.state == SegmentState::Failed)
        .map(|(i, s)| {
            format!(
                "  segment {} failed after {} retries: {}",
                i,
                s.retries,
                s.last_error.as_deref().unwrap_or("unknown error")
            )
        })
        .collect()
}
