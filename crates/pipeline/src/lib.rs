//! Job intake and the concurrency-limited scheduler.
//!
//! [`Scheduler`] owns every job and admits `Pending` work in submission
//! order whenever a slot is free. Each admitted job runs both transforms
//! concurrently and lands in `Completed` or `Failed`; its completion
//! triggers the next reconciliation pass.

pub mod board;
pub mod config;
pub mod error;
pub mod export;
pub mod fan_out;
pub mod intake;
pub mod preview;
pub mod processor;
pub mod retry;
pub mod scheduler;

pub use board::{JobBoard, QueueStats};
pub use config::SchedulerConfig;
pub use error::{IntakeError, JobError};
pub use retry::{NeverRetry, RetryPolicy};
pub use scheduler::{Scheduler, SchedulerBuilder};
