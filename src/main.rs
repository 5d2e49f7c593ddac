//! CLI entry point for the tunefetch tool.

use std::io::{self, IsTerminal, Read};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};
use tunefetch::{
    DownloadQueue, QueueConfig, QueueError, TrackRequest, TransferWorker, download, library,
};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    // Read input: from positional args or stdin
    let urls: Vec<String> = if args.urls.is_empty() {
        if io::stdin().is_terminal() {
            info!("No input provided. Pipe URLs via stdin or pass as arguments.");
            info!("Example: echo 'https://cdn.example.com/track.mp3' | tunefetch");
            return Ok(());
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect()
    } else {
        args.urls.clone()
    };

    if urls.is_empty() {
        info!("No URLs found in input");
        return Ok(());
    }

    info!(tracks = urls.len(), output_dir = %args.output_dir.display(), "starting downloads");

    let worker = Arc::new(TransferWorker::new(&args.output_dir));
    let config = QueueConfig {
        max_retries: u32::from(args.max_retries),
        ..QueueConfig::default()
    };
    let queue = DownloadQueue::new(worker, config);

    // Enqueue everything up front; the queue serializes the transfers
    let mut handles = Vec::new();
    for (index, url) in urls.iter().enumerate() {
        let id = format!("track-{}", index + 1);
        let title = download::filename_from_url(url).unwrap_or_else(|| url.clone());
        match queue.add_to_queue(TrackRequest {
            id,
            title,
            source_url: url.clone(),
        }) {
            Ok(handle) => handles.push((url.clone(), handle)),
            Err(QueueError::Duplicate { source_url }) => {
                warn!(url = %source_url, "already queued, skipping");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let use_bar = !args.quiet && !args.json && io::stderr().is_terminal();
    let mut results = Vec::new();

    // Jobs finish in submission order, so draining handles in order works
    for (url, handle) in handles {
        let (job_id, mut progress, mut done) = handle.into_parts();
        let bar = make_bar(use_bar, &job_id);

        let mut progress_open = true;
        let outcome = loop {
            tokio::select! {
                result = &mut done => {
                    break result.unwrap_or(Err(QueueError::Shutdown));
                }
                tick = progress.recv(), if progress_open => {
                    match (tick, bar.as_ref()) {
                        (Some(tick), Some(bar)) => {
                            bar.set_position(tick.percentage.clamp(0.0, 100.0) as u64);
                        }
                        (None, _) => progress_open = false,
                        _ => {}
                    }
                }
            }
        };
        if let Some(bar) = bar {
            bar.finish_and_clear();
        }

        match &outcome {
            Ok(done) => {
                info!(
                    url = %url,
                    path = %done.file_path.display(),
                    size = %library::format_bytes(done.file_size),
                    title = done.tags.title.as_deref().unwrap_or("<untagged>"),
                    "saved"
                );
            }
            Err(e) => {
                warn!(url = %url, error = %e, "failed");
            }
        }
        results.push((url, outcome));
    }

    let status = queue.get_status();
    info!(
        completed = status.total_completed,
        failed = status.total_failed,
        total_size = %library::format_bytes(library::storage_used(&args.output_dir).await.unwrap_or(0)),
        "all downloads finished"
    );

    if args.json {
        print_json_summary(&status, &results)?;
    }

    if status.total_failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn make_bar(use_bar: bool, job_id: &str) -> Option<ProgressBar> {
    if !use_bar {
        return None;
    }
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {pos}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(job_id.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    Some(bar)
}

fn print_json_summary(
    status: &tunefetch::QueueSnapshot,
    results: &[(String, Result<tunefetch::CompletedDownload, QueueError>)],
) -> Result<()> {
    let tracks: Vec<serde_json::Value> = results
        .iter()
        .map(|(url, outcome)| match outcome {
            Ok(done) => serde_json::json!({
                "url": url,
                "status": "completed",
                "file_path": done.file_path,
                "file_size": done.file_size,
                "tags": done.tags,
                "has_album_art": done.album_art.is_some(),
            }),
            Err(e) => serde_json::json!({
                "url": url,
                "status": "failed",
                "error": e.to_string(),
            }),
        })
        .collect();

    let summary = serde_json::json!({
        "queue": status,
        "tracks": tracks,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
