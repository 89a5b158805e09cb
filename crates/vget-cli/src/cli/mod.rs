//! CLI for the vget segmented downloader.

mod render;

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;

use vget_core::checksum::sidecar;
use vget_core::config;
use vget_core::engine::{self, ChaosPlan, DownloadRequest, EngineError};
use vget_core::CancelToken;

/// Download one large file over parallel HTTP range requests.
#[derive(Debug, Parser)]
#[command(name = "vget")]
#[command(about = "Parallel segmented downloader for large disk images", long_about = None)]
pub struct Cli {
    /// Direct HTTP/HTTPS URL of the file to download.
    url: String,

    /// Destination path for the merged file.
    output: PathBuf,

    /// Number of parallel segment fetchers (default from config).
    #[arg(short = 'n', long, value_name = "N")]
    threads: Option<usize>,

    /// Expected SHA-256 of the file (64 hex chars); implies verification.
    #[arg(long, value_name = "HEX")]
    hash: Option<String>,

    /// Fetch the expected digest from `<url>.sha256` and verify against it.
    #[arg(long)]
    verify: bool,

    /// Attempts per segment before giving up (default from config).
    #[arg(long, value_name = "N")]
    retries: Option<u32>,

    /// Keep the per-segment staging directory after a successful run.
    #[arg(long)]
    keep_segments: bool,

    /// Inject deterministic faults into segments 0 and 1 (testing).
    #[arg(long)]
    chaos: bool,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_or_init()?;
    tracing::debug!(config = ?cfg, "loaded config");

    let mut request = DownloadRequest::new(cli.url.clone(), cli.output);
    request.parallelism = cli.threads.unwrap_or(cfg.default_parallelism);
    request.max_retries = cli.retries.unwrap_or(cfg.default_retries);
    request.keep_segments = cli.keep_segments;
    request.progress_interval = cfg.progress_interval();
    if cli.chaos {
        request.chaos = Some(ChaosPlan::all());
    }

    if let Some(hash) = cli.hash {
        request.expected_digest = Some(hash);
        request.verify = true;
    } else if cli.verify {
        let url = cli.url.clone();
        let digest =
            tokio::task::spawn_blocking(move || sidecar::fetch_expected_digest(&url)).await?;
        match digest {
            Some(d) => {
                tracing::info!(digest = %d, "expected digest fetched from sidecar");
                request.expected_digest = Some(d);
            }
            None => println!("No digest sidecar at <url>.sha256; downloading without verification."),
        }
        request.verify = true;
    }

    // Ctrl-C requests cooperative cancellation; the engine unwinds with
    // a Cancelled error instead of the process dying mid-write.
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, cancelling");
                cancel.cancel();
            }
        });
    }

    let (progress_tx, progress_rx) = tokio::sync::mpsc::channel(16);
    let renderer = tokio::spawn(render::render_loop(progress_rx, cfg.heatmap_columns));

    let result = engine::run(request, cancel, Some(progress_tx)).await;
    let _ = renderer.await;

    match result {
        Ok(report) => {
            render::print_summary(&report, cfg.heatmap_columns);
            Ok(())
        }
        Err(EngineError::VerificationFailed {
            expected,
            actual,
            report,
        }) => {
            render::print_summary(&report, cfg.heatmap_columns);
            bail!("verification failed: expected {}, got {}", expected, actual);
        }
        Err(EngineError::SegmentsExhausted {
            failures,
            recommended_retries,
        }) => {
            eprintln!("Failed segments:");
            for failure in &failures {
                eprintln!("  {}", failure);
            }
            bail!(
                "{} segment(s) failed after exhausting retries; try --retries={}",
                failures.len(),
                recommended_retries
            );
        }
        Err(err) => Err(err.into()),
    }
}
