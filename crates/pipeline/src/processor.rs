//! Per-job processing: both transforms concurrently, all-or-nothing.

use std::time::Duration;

use bytes::Bytes;
use studiostyle_core::job::{JobResults, OutputVariant, SourceImage};
use studiostyle_provider::{ProviderError, Transform, TransformClient};

use crate::error::JobError;
use crate::fan_out;
use crate::retry::RetryPolicy;

/// Run one job to an outcome.
///
/// Consults `retry` after each failed attempt and bounds the whole run by
/// `deadline` when one is set.
pub async fn process_job(
    client: &TransformClient,
    source: &SourceImage,
    retry: &dyn RetryPolicy,
    deadline: Option<Duration>,
) -> Result<JobResults, JobError> {
    let work = run_with_retry(client, source, retry);
    match deadline {
        Some(limit) => tokio::time::timeout(limit, work)
            .await
            .map_err(|_| JobError::DeadlineExceeded(limit))?,
        None => work.await,
    }
}

async fn run_with_retry(
    client: &TransformClient,
    source: &SourceImage,
    retry: &dyn RetryPolicy,
) -> Result<JobResults, JobError> {
    let mut attempt = 1u32;
    loop {
        match run_transforms(client, source).await {
            Ok(results) => return Ok(results),
            Err(e) => match retry.next_attempt(attempt, &e) {
                Some(delay) => {
                    tracing::warn!(
                        name = %source.name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Attempt failed, retrying",
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => return Err(e),
            },
        }
    }
}

/// Issue every transform at once and join on all of them.
async fn run_transforms(
    client: &TransformClient,
    source: &SourceImage,
) -> Result<JobResults, JobError> {
    let calls = Transform::ALL.map(|transform| async move {
        client
            .run(transform, &source.bytes, &source.mime_type)
            .await
            .map(|bytes| (transform.variant(), bytes))
    });

    let outputs = fan_out::all_or_first_error(calls).await?;
    collect_results(outputs)
}

fn collect_results(outputs: Vec<(OutputVariant, Bytes)>) -> Result<JobResults, JobError> {
    let mut transparent = None;
    let mut white_background = None;
    for (variant, bytes) in outputs {
        match variant {
            OutputVariant::Transparent => transparent = Some(bytes),
            OutputVariant::WhiteBackground => white_background = Some(bytes),
        }
    }
    match (transparent, white_background) {
        (Some(transparent), Some(white_background)) => Ok(JobResults {
            transparent,
            white_background,
        }),
        _ => Err(JobError::Provider(ProviderError::NoImageReturned)),
    }
}
