use crate::job::JobStatus;
use crate::types::JobId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
}
