//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] carries one [`JobEvent`] per applied status transition,
//! in the order the scheduler applied them. It is designed to be shared
//! via `Arc<EventBus>`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use studiostyle_core::job::JobStatus;
use studiostyle_core::types::JobId;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// JobEvent
// ---------------------------------------------------------------------------

/// What happened to a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEventKind {
    /// Job created by intake in `Pending`.
    Enqueued,
    /// Job took a concurrency slot.
    Admitted,
    /// Both outputs were produced.
    Completed,
    /// The job failed with the given reason.
    Failed { reason: String },
}

impl JobEventKind {
    /// Status the job holds after this event.
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Enqueued => JobStatus::Pending,
            Self::Admitted => JobStatus::Processing,
            Self::Completed => JobStatus::Completed,
            Self::Failed { .. } => JobStatus::Failed,
        }
    }
}

/// A job lifecycle event.
#[derive(Debug, Clone, Serialize)]
pub struct JobEvent {
    pub job_id: JobId,
    #[serde(flatten)]
    pub kind: JobEventKind,
    /// Jobs in `Processing` right after the transition was applied.
    pub processing: usize,
    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl JobEvent {
    pub fn new(job_id: JobId, kind: JobEventKind, processing: usize) -> Self {
        Self {
            job_id,
            kind,
            processing,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`JobEvent`].
///
/// # Usage
///
/// ```rust
/// use studiostyle_events::bus::{EventBus, JobEvent, JobEventKind};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(JobEvent::new("a.png-1-0".into(), JobEventKind::Enqueued, 0));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<JobEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: JobEvent) {
        tracing::trace!(
            job_id = %event.job_id,
            status = %event.kind.status(),
            "Publishing job event",
        );
        // Ignore the SendError -- it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
