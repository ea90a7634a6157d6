//! Concurrency-limited job scheduler.
//!
//! [`Scheduler`] owns the [`JobBoard`] behind a `tokio::sync::watch`
//! channel. Every mutation goes through the channel's `send_modify`, so
//! it reads the latest board and publishes the new one atomically, and
//! observers holding a [`watch::Receiver`] see each change.
//!
//! Admission is an explicit reconciliation pass ([`Scheduler::reconcile`])
//! run after every enqueue and after every job completion. Completion is
//! what frees a slot, so it is also what starts the next pending job.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use studiostyle_core::job::{Job, JobResults, JobStatus, SourceImage};
use studiostyle_core::types::JobId;
use studiostyle_events::{EventBus, JobEvent, JobEventKind};
use studiostyle_provider::TransformClient;
use tokio::sync::watch;
use tokio_util::task::TaskTracker;

use crate::board::{JobBoard, QueueStats};
use crate::config::SchedulerConfig;
use crate::error::JobError;
use crate::intake;
use crate::preview::PreviewStore;
use crate::processor;
use crate::retry::{NeverRetry, RetryPolicy};

/// Builder for a [`Scheduler`] with optional collaborators.
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    client: TransformClient,
    events: Option<Arc<EventBus>>,
    previews: Option<PreviewStore>,
    retry: Arc<dyn RetryPolicy>,
}

impl SchedulerBuilder {
    /// Publish lifecycle events on an existing bus.
    pub fn event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Register previews in an existing store.
    pub fn preview_store(mut self, previews: PreviewStore) -> Self {
        self.previews = Some(previews);
        self
    }

    /// Replace the default [`NeverRetry`] policy.
    pub fn retry_policy(mut self, retry: Arc<dyn RetryPolicy>) -> Self {
        self.retry = retry;
        self
    }

    pub fn build(self) -> Scheduler {
        let (board, _) = watch::channel(JobBoard::new(self.config.concurrency_limit()));
        Scheduler {
            inner: Arc::new(Inner {
                config: self.config,
                board,
                client: self.client,
                events: self.events.unwrap_or_default(),
                previews: self.previews.unwrap_or_default(),
                retry: self.retry,
                tasks: TaskTracker::new(),
            }),
        }
    }
}

/// Shared handle to the job queue. Cheap to clone.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    config: SchedulerConfig,
    board: watch::Sender<JobBoard>,
    client: TransformClient,
    events: Arc<EventBus>,
    previews: PreviewStore,
    retry: Arc<dyn RetryPolicy>,
    tasks: TaskTracker,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, client: TransformClient) -> Self {
        Self::builder(config, client).build()
    }

    pub fn builder(config: SchedulerConfig, client: TransformClient) -> SchedulerBuilder {
        SchedulerBuilder {
            config,
            client,
            events: None,
            previews: None,
            retry: Arc::new(NeverRetry),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.inner.events
    }

    pub fn previews(&self) -> &PreviewStore {
        &self.inner.previews
    }

    /// Read-only copy of the current board.
    pub fn snapshot(&self) -> JobBoard {
        self.inner.board.borrow().clone()
    }

    /// Receiver notified on every board change.
    pub fn watch(&self) -> watch::Receiver<JobBoard> {
        self.inner.board.subscribe()
    }

    pub fn stats(&self) -> QueueStats {
        self.inner.board.borrow().stats()
    }

    /// Enqueue one `Pending` job per file, newest batch first, then run a
    /// reconciliation pass.
    ///
    /// Callers filter to images beforehand. Must be called from within a
    /// Tokio runtime, since admitted jobs are spawned immediately.
    pub fn submit(&self, files: impl IntoIterator<Item = SourceImage>) -> Vec<JobId> {
        let files: Vec<SourceImage> = files.into_iter().collect();
        if files.is_empty() {
            return Vec::new();
        }

        let inner = &self.inner;
        let mut ids = Vec::with_capacity(files.len());
        inner.board.send_modify(|board| {
            let first_seq = board.reserve_seq(files.len());
            let jobs = intake::build_jobs(files, first_seq, &inner.previews);
            for job in &jobs {
                tracing::info!(
                    job_id = %job.id(),
                    name = %job.source().name,
                    size_bytes = job.source().size_bytes(),
                    "Job enqueued",
                );
                inner.events.publish(JobEvent::new(
                    job.id().clone(),
                    JobEventKind::Enqueued,
                    board.processing_count(),
                ));
                ids.push(job.id().clone());
            }
            board.prepend(jobs);
        });

        self.reconcile();
        ids
    }

    /// Admission pass: fill every free slot with the oldest pending jobs
    /// and launch them. Returns how many jobs were admitted.
    ///
    /// Idempotent: with no new pending work and no freed slot it changes
    /// nothing and notifies no one.
    pub fn reconcile(&self) -> usize {
        let inner = &self.inner;
        let mut admitted = Vec::new();
        inner.board.send_if_modified(|board| {
            admitted = board.admit_available();
            let base = board.processing_count() - admitted.len();
            for (i, job) in admitted.iter().enumerate() {
                tracing::info!(
                    job_id = %job.id(),
                    processing = base + i + 1,
                    limit = board.concurrency_limit(),
                    "Job admitted",
                );
                inner.events.publish(JobEvent::new(
                    job.id().clone(),
                    JobEventKind::Admitted,
                    base + i + 1,
                ));
            }
            !admitted.is_empty()
        });

        let count = admitted.len();
        for job in admitted {
            self.launch(job);
        }
        count
    }

    /// Resolve once no job is `Pending` or `Processing`.
    pub async fn wait_until_settled(&self) -> JobBoard {
        let mut rx = self.watch();
        let settled = rx.wait_for(JobBoard::is_settled).await.map(|b| (*b).clone());
        settled.unwrap_or_else(|_| self.snapshot())
    }

    /// Wait for every launched processing task to finish.
    pub async fn shutdown(&self) {
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        tracing::info!("Scheduler shut down");
    }

    // ---- private helpers ----

    fn launch(&self, job: Job) {
        let scheduler = self.clone();
        self.inner.tasks.spawn(async move {
            scheduler.run_job(job).await;
        });
    }

    /// Per-job task: process, record the outcome, release the slot, and
    /// trigger the next admission pass. Never lets an error or panic out.
    async fn run_job(self, job: Job) {
        let inner = &self.inner;
        let work = processor::process_job(
            &inner.client,
            job.source(),
            inner.retry.as_ref(),
            inner.config.job_deadline(),
        );
        let outcome = AssertUnwindSafe(work)
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(JobError::Panicked(panic_message(panic.as_ref()))));

        self.finish(job.id(), outcome);
        self.reconcile();
    }

    fn finish(&self, id: &JobId, outcome: Result<JobResults, JobError>) {
        let inner = &self.inner;
        let outcome = outcome.map_err(|e| e.to_string());
        inner.board.send_modify(|board| match board.finish(id, outcome) {
            Ok(JobStatus::Completed) => {
                tracing::info!(job_id = %id, "Job completed");
                inner.events.publish(JobEvent::new(
                    id.clone(),
                    JobEventKind::Completed,
                    board.processing_count(),
                ));
            }
            Ok(status) => {
                let reason = board
                    .get(id)
                    .and_then(Job::failure_reason)
                    .unwrap_or_default()
                    .to_string();
                tracing::warn!(job_id = %id, %status, reason = %reason, "Job failed");
                inner.events.publish(JobEvent::new(
                    id.clone(),
                    JobEventKind::Failed { reason },
                    board.processing_count(),
                ));
            }
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "Failed to record job outcome");
            }
        });
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
