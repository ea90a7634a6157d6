//! Job record and status state machine.
//!
//! A job moves `Pending -> Processing -> Completed | Failed` and never
//! leaves a terminal state. The outputs and failure reason live inside
//! [`JobState`] so they can only exist alongside the matching status.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{JobId, PreviewRef, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for a concurrency slot.
    Pending,
    /// Admitted; provider calls are in flight.
    Processing,
    /// Both variants were produced.
    Completed,
    /// A provider call failed. Permanent.
    Failed,
}

impl JobStatus {
    /// Human-readable label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Queued",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Statuses reachable from `self` in one step.
    ///
    /// Terminal states return an empty slice.
    pub fn valid_transitions(self) -> &'static [JobStatus] {
        match self {
            Self::Pending => &[Self::Processing],
            Self::Processing => &[Self::Completed, Self::Failed],
            Self::Completed | Self::Failed => &[],
        }
    }

    pub fn can_transition(self, to: JobStatus) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// Validate a state transition, returning an error for invalid ones.
    pub fn validate_transition(self, to: JobStatus) -> Result<(), CoreError> {
        if self.can_transition(to) {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition { from: self, to })
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Source and outputs
// ---------------------------------------------------------------------------

/// The original file a job was created from. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub name: String,
    pub modified: Timestamp,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl SourceImage {
    pub fn new(
        name: impl Into<String>,
        modified: Timestamp,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            modified,
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// Which derivative a buffer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputVariant {
    /// Subject cut out on a transparent background.
    Transparent,
    /// Subject on studio white with a soft shadow.
    WhiteBackground,
}

impl OutputVariant {
    pub const ALL: [OutputVariant; 2] = [Self::Transparent, Self::WhiteBackground];

    /// Short slug used in output filenames.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Transparent => "transparent",
            Self::WhiteBackground => "white_bg",
        }
    }
}

/// The two output buffers of a completed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResults {
    pub transparent: Bytes,
    pub white_background: Bytes,
}

impl JobResults {
    pub fn get(&self, variant: OutputVariant) -> &Bytes {
        match variant {
            OutputVariant::Transparent => &self.transparent,
            OutputVariant::WhiteBackground => &self.white_background,
        }
    }
}

/// Status together with the data that only exists in that status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Processing,
    Completed(JobResults),
    Failed { reason: String },
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Pending => JobStatus::Pending,
            Self::Processing => JobStatus::Processing,
            Self::Completed(_) => JobStatus::Completed,
            Self::Failed { .. } => JobStatus::Failed,
        }
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// One submitted image and its processing state.
#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,
    seq: u64,
    source: SourceImage,
    preview: PreviewRef,
    submitted_at: Timestamp,
    state: JobState,
}

impl Job {
    /// Create a job in `Pending`.
    ///
    /// `seq` is the intake sequence number; admission order follows it.
    pub fn new(id: JobId, seq: u64, source: SourceImage, preview: PreviewRef) -> Self {
        Self {
            id,
            seq,
            source,
            preview,
            submitted_at: chrono::Utc::now(),
            state: JobState::Pending,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn source(&self) -> &SourceImage {
        &self.source
    }

    pub fn preview(&self) -> PreviewRef {
        self.preview
    }

    pub fn submitted_at(&self) -> Timestamp {
        self.submitted_at
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn status(&self) -> JobStatus {
        self.state.status()
    }

    /// Outputs, present only when `Completed`.
    pub fn results(&self) -> Option<&JobResults> {
        match &self.state {
            JobState::Completed(results) => Some(results),
            _ => None,
        }
    }

    /// Failure message, present only when `Failed`.
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.state {
            JobState::Failed { reason } => Some(reason),
            _ => None,
        }
    }

    /// `Pending -> Processing`.
    pub fn admit(&mut self) -> Result<(), CoreError> {
        self.transition(JobState::Processing)
    }

    /// `Processing -> Completed`.
    pub fn complete(&mut self, results: JobResults) -> Result<(), CoreError> {
        self.transition(JobState::Completed(results))
    }

    /// `Processing -> Failed`.
    ///
    /// An empty reason is replaced so a failed job always explains itself.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), CoreError> {
        let mut reason = reason.into();
        if reason.trim().is_empty() {
            reason = "An unknown error occurred".to_string();
        }
        self.transition(JobState::Failed { reason })
    }

    fn transition(&mut self, next: JobState) -> Result<(), CoreError> {
        self.status().validate_transition(next.status())?;
        self.state = next;
        Ok(())
    }
}
