//! The scheduler's owned state: every job plus the admitted set.
//!
//! Observers only ever see cloned [`JobBoard`] snapshots. Mutations are
//! `pub(crate)` and run inside the scheduler's single publication point,
//! so each one starts from the latest state.

use std::collections::HashSet;

use serde::Serialize;
use studiostyle_core::error::CoreError;
use studiostyle_core::job::{Job, JobResults, JobStatus};
use studiostyle_core::types::JobId;

/// Per-status counts for a status banner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub concurrency_limit: usize,
}

impl QueueStats {
    pub fn total(&self) -> usize {
        self.pending + self.processing + self.completed + self.failed
    }

    /// Whether the banner should be shown at all.
    pub fn has_active_work(&self) -> bool {
        self.pending > 0 || self.processing > 0
    }
}

/// Snapshot of every job, newest submission first.
#[derive(Debug, Clone)]
pub struct JobBoard {
    jobs: Vec<Job>,
    admitted: HashSet<JobId>,
    next_seq: u64,
    concurrency_limit: usize,
}

impl JobBoard {
    pub(crate) fn new(concurrency_limit: usize) -> Self {
        Self {
            jobs: Vec::new(),
            admitted: HashSet::new(),
            next_seq: 0,
            concurrency_limit,
        }
    }

    /// All jobs, newest submission first.
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn get(&self, id: &JobId) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id() == id)
    }

    pub fn status(&self, id: &JobId) -> Option<JobStatus> {
        self.get(id).map(Job::status)
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Jobs currently holding a slot.
    pub fn processing_count(&self) -> usize {
        self.admitted.len()
    }

    pub fn is_admitted(&self, id: &JobId) -> bool {
        self.admitted.contains(id)
    }

    /// Free slots right now.
    pub fn available_slots(&self) -> usize {
        self.concurrency_limit.saturating_sub(self.processing_count())
    }

    /// Pending jobs, oldest submission first.
    pub fn pending_fifo(&self) -> Vec<&Job> {
        let mut pending: Vec<&Job> = self
            .jobs
            .iter()
            .filter(|job| job.status() == JobStatus::Pending)
            .collect();
        pending.sort_by_key(|job| job.seq());
        pending
    }

    /// True once no job is `Pending` or `Processing`.
    pub fn is_settled(&self) -> bool {
        self.jobs.iter().all(|job| job.status().is_terminal())
    }

    pub fn stats(&self) -> QueueStats {
        let mut stats = QueueStats {
            concurrency_limit: self.concurrency_limit,
            ..QueueStats::default()
        };
        for job in &self.jobs {
            match job.status() {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    // ---- mutations (scheduler only) ----

    /// Reserve `count` consecutive sequence numbers.
    pub(crate) fn reserve_seq(&mut self, count: usize) -> u64 {
        let first = self.next_seq;
        self.next_seq += count as u64;
        first
    }

    /// Put a batch in front of the existing jobs, keeping batch order.
    pub(crate) fn prepend(&mut self, batch: Vec<Job>) {
        self.jobs.splice(0..0, batch);
    }

    /// Admit the oldest pending jobs into every free slot.
    ///
    /// Returns the admitted jobs in admission order. Running it again with
    /// no new pending work and no freed slots admits nothing.
    pub(crate) fn admit_available(&mut self) -> Vec<Job> {
        let slots = self.available_slots();
        if slots == 0 {
            return Vec::new();
        }

        let selected: Vec<JobId> = self
            .pending_fifo()
            .into_iter()
            .take(slots)
            .map(|job| job.id().clone())
            .collect();

        let mut admitted = Vec::with_capacity(selected.len());
        for id in selected {
            let Some(job) = self.jobs.iter_mut().find(|job| job.id() == &id) else {
                continue;
            };
            if job.admit().is_ok() {
                self.admitted.insert(id);
                admitted.push(job.clone());
            }
        }
        admitted
    }

    /// Record a job's outcome and release its slot.
    pub(crate) fn finish(
        &mut self,
        id: &JobId,
        outcome: Result<JobResults, String>,
    ) -> Result<JobStatus, CoreError> {
        let job = self
            .jobs
            .iter_mut()
            .find(|job| job.id() == id)
            .ok_or_else(|| CoreError::NotFound(id.clone()))?;

        let applied = match outcome {
            Ok(results) => job.complete(results),
            Err(reason) => job.fail(reason),
        };
        // The slot is released even if the transition was refused.
        self.admitted.remove(id);
        applied.map(|()| job.status())
    }
}
