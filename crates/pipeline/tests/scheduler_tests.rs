//! Integration tests for the job scheduler.
//!
//! Providers here are in-memory fakes keyed on the first byte of the
//! source image, so each test controls exactly when and how every job's
//! transforms finish.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use studiostyle_core::job::{JobStatus, SourceImage};
use studiostyle_core::types::JobId;
use studiostyle_events::{JobEvent, JobEventKind};
use studiostyle_pipeline::{JobBoard, Scheduler, SchedulerConfig};
use studiostyle_provider::{ProviderError, TransformClient, TransformProvider};
use tokio::sync::Semaphore;

// ---------------------------------------------------------------------------
// Fakes and helpers
// ---------------------------------------------------------------------------

/// Output for a call: the instruction's first word plus the job's tag.
fn output_for(image: &[u8], instruction: &str) -> Bytes {
    let word = instruction.split_whitespace().next().unwrap_or("");
    Bytes::from(format!("{word}:{}", image[0]))
}

/// Completes instantly for every job.
struct InstantProvider;

#[async_trait]
impl TransformProvider for InstantProvider {
    async fn generate(
        &self,
        image: &[u8],
        _mime_type: &str,
        instruction: &str,
    ) -> Result<Bytes, ProviderError> {
        tokio::task::yield_now().await;
        Ok(output_for(image, instruction))
    }
}

/// Each tagged job blocks until the test releases it.
struct GatedProvider {
    gates: HashMap<u8, Arc<Semaphore>>,
}

impl GatedProvider {
    fn new(tags: impl IntoIterator<Item = u8>) -> Self {
        Self {
            gates: tags
                .into_iter()
                .map(|tag| (tag, Arc::new(Semaphore::new(0))))
                .collect(),
        }
    }

    /// Let both transforms of job `tag` finish.
    fn release(&self, tag: u8) {
        self.gates[&tag].add_permits(2);
    }
}

#[async_trait]
impl TransformProvider for GatedProvider {
    async fn generate(
        &self,
        image: &[u8],
        _mime_type: &str,
        instruction: &str,
    ) -> Result<Bytes, ProviderError> {
        if let Some(gate) = self.gates.get(&image[0]) {
            gate.acquire()
                .await
                .map_err(|e| ProviderError::Other(e.to_string()))?
                .forget();
        }
        Ok(output_for(image, instruction))
    }
}

/// Fails every call for one tagged job.
struct FailingFor(u8);

#[async_trait]
impl TransformProvider for FailingFor {
    async fn generate(
        &self,
        image: &[u8],
        _mime_type: &str,
        instruction: &str,
    ) -> Result<Bytes, ProviderError> {
        tokio::task::yield_now().await;
        if image[0] == self.0 {
            return Err(ProviderError::Other("quota exceeded".into()));
        }
        Ok(output_for(image, instruction))
    }
}

/// Panics for one tagged job.
struct PanicsFor(u8);

#[async_trait]
impl TransformProvider for PanicsFor {
    async fn generate(
        &self,
        image: &[u8],
        _mime_type: &str,
        instruction: &str,
    ) -> Result<Bytes, ProviderError> {
        tokio::task::yield_now().await;
        if image[0] == self.0 {
            panic!("decoder blew up");
        }
        Ok(output_for(image, instruction))
    }
}

/// Never returns.
struct StallingProvider;

#[async_trait]
impl TransformProvider for StallingProvider {
    async fn generate(&self, _: &[u8], _: &str, _: &str) -> Result<Bytes, ProviderError> {
        std::future::pending().await
    }
}

fn image(tag: u8) -> SourceImage {
    SourceImage::new(
        format!("photo-{tag}.png"),
        chrono::Utc::now(),
        "image/png",
        vec![tag, 0xAA, 0xBB],
    )
}

fn scheduler(limit: usize, provider: Arc<dyn TransformProvider>) -> Scheduler {
    let config = SchedulerConfig::with_limit(limit).unwrap();
    Scheduler::new(config, TransformClient::new(provider))
}

/// Wait (bounded) until the board satisfies `pred`.
async fn wait_board(scheduler: &Scheduler, pred: impl FnMut(&JobBoard) -> bool) -> JobBoard {
    let mut rx = scheduler.watch();
    let board = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
        .await
        .expect("timed out waiting for board state")
        .expect("scheduler dropped")
        .clone();
    board
}

async fn settle(scheduler: &Scheduler) -> JobBoard {
    tokio::time::timeout(Duration::from_secs(5), scheduler.wait_until_settled())
        .await
        .expect("timed out waiting for jobs to settle")
}

// ---------------------------------------------------------------------------
// Test: admission respects the limit and completion admits the next job
// ---------------------------------------------------------------------------

/// Five jobs with a limit of three: the first three start, the rest wait.
/// Finishing the second admits the fourth, and the fifth keeps waiting.
#[tokio::test]
async fn completion_admits_next_pending_job() {
    let provider = Arc::new(GatedProvider::new(1..=5));
    let scheduler = scheduler(3, provider.clone());
    let ids = scheduler.submit((1..=5).map(image));

    let board = scheduler.snapshot();
    for id in &ids[..3] {
        assert_eq!(board.status(id), Some(JobStatus::Processing));
    }
    for id in &ids[3..] {
        assert_eq!(board.status(id), Some(JobStatus::Pending));
    }

    provider.release(2);
    let j4 = ids[3].clone();
    let board = wait_board(&scheduler, |b| b.status(&j4) == Some(JobStatus::Processing)).await;

    assert_eq!(board.status(&ids[1]), Some(JobStatus::Completed));
    assert_eq!(board.status(&ids[0]), Some(JobStatus::Processing));
    assert_eq!(board.status(&ids[2]), Some(JobStatus::Processing));
    assert_eq!(board.status(&ids[4]), Some(JobStatus::Pending));
    assert_eq!(board.processing_count(), 3);

    for tag in [1, 3, 4, 5] {
        provider.release(tag);
    }
    let board = settle(&scheduler).await;
    assert_eq!(board.stats().completed, 5);
    scheduler.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test: event stream
// ---------------------------------------------------------------------------

/// Every job goes Enqueued, Admitted, then a terminal event, and the
/// processing count carried by events never exceeds the limit.
#[tokio::test]
async fn events_follow_lifecycle_and_respect_limit() {
    let scheduler = scheduler(2, Arc::new(FailingFor(4)));
    let mut rx = scheduler.events().subscribe();

    let ids = scheduler.submit((1..=6).map(image));
    settle(&scheduler).await;
    scheduler.shutdown().await;

    let mut per_job: HashMap<JobId, Vec<JobEvent>> = HashMap::new();
    while let Ok(event) = rx.try_recv() {
        assert!(event.processing <= 2, "processing count exceeded limit");
        per_job.entry(event.job_id.clone()).or_default().push(event);
    }

    assert_eq!(per_job.len(), ids.len());
    for (index, id) in ids.iter().enumerate() {
        let kinds: Vec<&JobEventKind> = per_job[id].iter().map(|e| &e.kind).collect();
        assert_eq!(kinds.len(), 3, "job {id} should see exactly three events");
        assert_eq!(kinds[0], &JobEventKind::Enqueued);
        assert_eq!(kinds[1], &JobEventKind::Admitted);
        if index == 3 {
            assert!(matches!(kinds[2], JobEventKind::Failed { .. }));
        } else {
            assert_eq!(kinds[2], &JobEventKind::Completed);
        }
    }
}

/// Admission follows submission order.
#[tokio::test]
async fn jobs_are_admitted_in_submission_order() {
    let scheduler = scheduler(1, Arc::new(InstantProvider));
    let mut rx = scheduler.events().subscribe();

    let first = scheduler.submit([image(1), image(2)]);
    let second = scheduler.submit([image(3)]);
    settle(&scheduler).await;
    scheduler.shutdown().await;

    let mut admitted = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if event.kind == JobEventKind::Admitted {
            admitted.push(event.job_id);
        }
    }
    assert_eq!(admitted, vec![first[0].clone(), first[1].clone(), second[0].clone()]);
}

// ---------------------------------------------------------------------------
// Test: failure isolation
// ---------------------------------------------------------------------------

/// A provider error fails only its own job.
#[tokio::test]
async fn one_failure_does_not_affect_other_jobs() {
    let scheduler = scheduler(3, Arc::new(FailingFor(2)));
    let ids = scheduler.submit([image(1), image(2), image(3)]);

    let board = settle(&scheduler).await;
    scheduler.shutdown().await;

    assert_eq!(board.status(&ids[0]), Some(JobStatus::Completed));
    assert_eq!(board.status(&ids[2]), Some(JobStatus::Completed));

    let failed = board.get(&ids[1]).unwrap();
    assert_eq!(failed.status(), JobStatus::Failed);
    assert_eq!(failed.failure_reason(), Some("Provider error: quota exceeded"));
    assert!(failed.results().is_none());
}

/// A panic inside a provider call fails that job and frees its slot.
#[tokio::test]
async fn panicking_job_is_marked_failed() {
    let scheduler = scheduler(1, Arc::new(PanicsFor(1)));
    let ids = scheduler.submit([image(1), image(2)]);

    let board = settle(&scheduler).await;
    scheduler.shutdown().await;

    let reason = board.get(&ids[0]).and_then(|j| j.failure_reason()).unwrap();
    assert!(reason.contains("decoder blew up"), "unexpected reason: {reason}");
    assert_eq!(board.status(&ids[1]), Some(JobStatus::Completed));
    assert_eq!(board.processing_count(), 0);
}

/// A stuck job fails once the configured deadline passes.
#[tokio::test(start_paused = true)]
async fn stuck_job_fails_after_deadline() {
    let config = SchedulerConfig::with_limit(1)
        .unwrap()
        .deadline(Duration::from_secs(60));
    let scheduler = Scheduler::new(config, TransformClient::new(Arc::new(StallingProvider)));
    let ids = scheduler.submit([image(1)]);

    let board = scheduler.wait_until_settled().await;
    scheduler.shutdown().await;

    assert_eq!(
        board.get(&ids[0]).and_then(|j| j.failure_reason()),
        Some("Job exceeded its deadline of 60s")
    );
}

// ---------------------------------------------------------------------------
// Test: reconciliation
// ---------------------------------------------------------------------------

/// Extra passes with nothing to admit change nothing and emit nothing.
#[tokio::test]
async fn reconcile_is_idempotent() {
    let provider = Arc::new(GatedProvider::new(1..=3));
    let scheduler = scheduler(1, provider.clone());
    scheduler.submit((1..=3).map(image));
    let before = scheduler.stats();

    let mut rx = scheduler.events().subscribe();
    assert_eq!(scheduler.reconcile(), 0);
    assert_eq!(scheduler.reconcile(), 0);
    assert!(rx.try_recv().is_err());
    assert_eq!(scheduler.stats(), before);
    assert_eq!(before.processing, 1);
    assert_eq!(before.pending, 2);

    for tag in 1..=3 {
        provider.release(tag);
    }
    settle(&scheduler).await;
    assert_eq!(scheduler.reconcile(), 0);
    scheduler.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test: outputs and ordering
// ---------------------------------------------------------------------------

/// Completed jobs carry both outputs, each distinct from the source.
#[tokio::test]
async fn completed_job_carries_both_outputs() {
    let scheduler = scheduler(3, Arc::new(InstantProvider));
    let ids = scheduler.submit([image(7)]);

    let board = settle(&scheduler).await;
    scheduler.shutdown().await;

    let job = board.get(&ids[0]).unwrap();
    let results = job.results().unwrap();
    assert_eq!(&results.transparent[..], b"Please:7");
    assert_eq!(&results.white_background[..], b"Take:7");
    assert_ne!(results.transparent, job.source().bytes);
}

/// The job list shows the newest batch first, each batch in input order.
#[tokio::test]
async fn job_list_is_newest_batch_first() {
    let provider = Arc::new(GatedProvider::new(1..=3));
    let scheduler = scheduler(3, provider.clone());
    let first = scheduler.submit([image(1), image(2)]);
    let second = scheduler.submit([image(3)]);

    let listed: Vec<JobId> = scheduler
        .snapshot()
        .jobs()
        .iter()
        .map(|j| j.id().clone())
        .collect();
    assert_eq!(listed, vec![second[0].clone(), first[0].clone(), first[1].clone()]);

    for tag in 1..=3 {
        provider.release(tag);
    }
    settle(&scheduler).await;
    scheduler.shutdown().await;
}

/// Submitting nothing creates no jobs.
#[tokio::test]
async fn empty_submission_is_a_noop() {
    let scheduler = scheduler(3, Arc::new(InstantProvider));
    assert!(scheduler.submit(Vec::new()).is_empty());
    assert_eq!(scheduler.stats().total(), 0);
    assert!(scheduler.snapshot().is_settled());
}

/// Every constructible config admits work, so a submitted batch always
/// drains.
#[tokio::test]
async fn every_config_constructor_drains_the_queue() {
    let configs = [
        SchedulerConfig::default(),
        SchedulerConfig::with_limit(1).unwrap(),
    ];
    for config in configs {
        let scheduler = Scheduler::new(config, TransformClient::new(Arc::new(InstantProvider)));
        assert!(scheduler.config().concurrency_limit() >= 1);

        scheduler.submit([image(1), image(2)]);
        let board = settle(&scheduler).await;
        scheduler.shutdown().await;
        assert_eq!(board.stats().completed, 2);
    }
    assert!(SchedulerConfig::with_limit(0).is_err());
}
