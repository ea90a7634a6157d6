//! Retry-policy hook consulted after a failed processing attempt.

use std::time::Duration;

use crate::error::JobError;

/// Decides whether a failed attempt is retried.
pub trait RetryPolicy: Send + Sync {
    /// `attempt` is the 1-based number of the attempt that just failed.
    /// Return the delay before the next attempt, or `None` to give up.
    fn next_attempt(&self, attempt: u32, error: &JobError) -> Option<Duration>;
}

/// The default: every failure is terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetry;

impl RetryPolicy for NeverRetry {
    fn next_attempt(&self, _attempt: u32, _error: &JobError) -> Option<Duration> {
        None
    }
}
