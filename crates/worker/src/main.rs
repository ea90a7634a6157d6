//! `studiostyle-worker` -- batch studio photo processor.
//!
//! Loads every image named on the command line (directories are expanded
//! one level), runs each through both transforms with bounded concurrency,
//! and writes the outputs of completed jobs to `--output-dir`. Failed jobs
//! are logged with their reason; they never stop the batch.
//!
//! ```text
//! studiostyle-worker [--output-dir <DIR>] <INPUTS>...
//! ```
//!
//! # Environment variables
//!
//! | Variable                | Required | Default                  | Description |
//! |-------------------------|----------|--------------------------|-------------|
//! | `GEMINI_API_KEY`        | yes      | --                       | Provider API key |
//! | `GEMINI_MODEL`          | no       | `gemini-2.5-flash-image` | Image model |
//! | `GEMINI_API_URL`        | no       | public v1beta endpoint   | Provider base URL |
//! | `PROVIDER_TIMEOUT_SECS` | no       | --                       | Per-request HTTP timeout |
//! | `CONCURRENCY_LIMIT`     | no       | `3`                      | Jobs processed at once |
//! | `JOB_DEADLINE_SECS`     | no       | --                       | Wall-clock budget per job |
//! | `OUTPUT_DIR`            | no       | `processed`              | Same as `--output-dir` |

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use studiostyle_events::EventBus;
use studiostyle_pipeline::export::export_completed;
use studiostyle_pipeline::intake::collect_image_files;
use studiostyle_pipeline::{JobBoard, QueueStats, Scheduler, SchedulerConfig};
use studiostyle_provider::{GeminiApi, ProviderConfig, TransformClient};
use tokio::sync::{broadcast, watch};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "studiostyle-worker")]
#[command(about = "Remove backgrounds and add studio white backgrounds to a batch of photos")]
struct Args {
    /// Image files or directories of images to process.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Where processed images are written.
    #[arg(long, env = "OUTPUT_DIR", default_value = "processed")]
    output_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "studiostyle_worker=info,studiostyle_pipeline=info,studiostyle_provider=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let provider_config = ProviderConfig::from_env().context("Invalid provider configuration")?;
    let scheduler_config = SchedulerConfig::from_env().context("Invalid scheduler configuration")?;

    tracing::info!(
        model = %provider_config.model,
        concurrency_limit = scheduler_config.concurrency_limit(),
        output_dir = %args.output_dir.display(),
        "Starting studiostyle-worker",
    );

    let api = GeminiApi::new(provider_config).context("Failed to build provider client")?;
    let events = Arc::new(EventBus::default());
    let scheduler = Scheduler::builder(scheduler_config, TransformClient::new(Arc::new(api)))
        .event_bus(Arc::clone(&events))
        .build();

    tokio::spawn(log_events(events.subscribe()));
    tokio::spawn(log_stats(scheduler.watch()));

    let sources = collect_image_files(&args.inputs).await;
    if sources.is_empty() {
        anyhow::bail!("No images found in the given paths");
    }

    let ids = scheduler.submit(sources);
    tracing::info!(count = ids.len(), "Batch submitted");

    let board = scheduler.wait_until_settled().await;
    log_failures(&board);
    let summary = export_completed(&board, &args.output_dir, chrono::Utc::now()).await;

    scheduler.previews().revoke_all();
    scheduler.shutdown().await;

    let stats = board.stats();
    tracing::info!(
        completed = stats.completed,
        failed = stats.failed,
        files_written = summary.written.len(),
        export_failures = summary.failed.len(),
        "Batch finished",
    );

    if !summary.failed.is_empty() {
        anyhow::bail!(
            "Failed to export {} of {} completed jobs",
            summary.failed.len(),
            stats.completed
        );
    }
    Ok(())
}

fn log_failures(board: &JobBoard) {
    for job in board.jobs().iter().rev() {
        if let Some(reason) = job.failure_reason() {
            tracing::warn!(
                job_id = %job.id(),
                name = %job.source().name,
                reason,
                "Job failed",
            );
        }
    }
}

async fn log_events(mut rx: broadcast::Receiver<studiostyle_events::JobEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => tracing::debug!(event = %json, "Job event"),
                Err(e) => tracing::warn!(error = %e, "Failed to serialize job event"),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event log lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Log a status line whenever the per-status counts change.
async fn log_stats(mut rx: watch::Receiver<JobBoard>) {
    let mut last = QueueStats::default();
    while rx.changed().await.is_ok() {
        let stats = rx.borrow_and_update().stats();
        if stats == last {
            continue;
        }
        last = stats;
        if stats.has_active_work() {
            tracing::info!(
                pending = stats.pending,
                processing = stats.processing,
                completed = stats.completed,
                failed = stats.failed,
                limit = stats.concurrency_limit,
                "Processing {} of {} images",
                stats.processing,
                stats.total(),
            );
        }
    }
}
