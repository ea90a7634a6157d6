//! Writing a completed job's outputs to disk.

use std::path::{Path, PathBuf};

use studiostyle_core::error::CoreError;
use studiostyle_core::job::{Job, OutputVariant};
use studiostyle_core::naming::{variant_filename, OUTPUT_EXTENSION};
use studiostyle_core::job::JobStatus;
use studiostyle_core::types::{JobId, Timestamp};
use tokio::io::AsyncWriteExt;

use crate::board::JobBoard;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Write both outputs of a completed job into `dir`.
///
/// Names follow [`variant_filename`] for `now`; an existing file is
/// never overwritten, a `-N` suffix is added instead. Returns the written
/// paths in [`OutputVariant::ALL`] order.
pub async fn export_job(
    job: &Job,
    dir: &Path,
    now: Timestamp,
) -> Result<Vec<PathBuf>, ExportError> {
    let results = job.results().ok_or_else(|| {
        CoreError::Validation(format!(
            "Job {} has no outputs to export (status: {})",
            job.id(),
            job.status()
        ))
    })?;

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ExportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    let mut written = Vec::with_capacity(OutputVariant::ALL.len());
    for variant in OutputVariant::ALL {
        let name = variant_filename(now, variant, OUTPUT_EXTENSION);
        let path = write_new(dir, &name, results.get(variant)).await?;
        tracing::debug!(job_id = %job.id(), path = %path.display(), "Output written");
        written.push(path);
    }
    Ok(written)
}

/// Outcome of exporting a whole board.
#[derive(Debug, Default)]
pub struct ExportSummary {
    /// Every file written, oldest job first.
    pub written: Vec<PathBuf>,
    /// Completed jobs whose export failed.
    pub failed: Vec<(JobId, ExportError)>,
}

/// Export every completed job on `board`, oldest submission first.
///
/// A failed export is logged and recorded; the remaining jobs are still
/// exported.
pub async fn export_completed(board: &JobBoard, dir: &Path, now: Timestamp) -> ExportSummary {
    let mut completed: Vec<&Job> = board
        .jobs()
        .iter()
        .filter(|job| job.status() == JobStatus::Completed)
        .collect();
    completed.sort_by_key(|job| job.seq());

    let mut summary = ExportSummary::default();
    for job in completed {
        match export_job(job, dir, now).await {
            Ok(paths) => {
                tracing::info!(
                    job_id = %job.id(),
                    name = %job.source().name,
                    files = paths.len(),
                    "Outputs exported",
                );
                summary.written.extend(paths);
            }
            Err(e) => {
                tracing::error!(job_id = %job.id(), error = %e, "Failed to export job outputs");
                summary.failed.push((job.id().clone(), e));
            }
        }
    }
    summary
}

/// Write `bytes` to `dir/name`, or `dir/stem-N.ext` for the first free
/// `N`. Files are opened with `create_new`, so a name taken concurrently
/// is skipped rather than overwritten.
async fn write_new(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
    let (stem, ext) = name.rsplit_once('.').unwrap_or((name, ""));
    let mut n = 0u32;
    loop {
        let path = match (n, ext.is_empty()) {
            (0, _) => dir.join(name),
            (_, true) => dir.join(format!("{stem}-{n}")),
            (_, false) => dir.join(format!("{stem}-{n}.{ext}")),
        };
        let io_err = |source: std::io::Error| ExportError::Io {
            path: path.clone(),
            source,
        };

        let opened = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;
        match opened {
            Ok(mut file) => {
                file.write_all(bytes).await.map_err(io_err)?;
                file.flush().await.map_err(io_err)?;
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(io_err(e)),
        }
    }
}
