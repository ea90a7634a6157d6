use std::path::PathBuf;
use std::time::Duration;

use studiostyle_provider::ProviderError;

/// Why a job failed. Its `Display` text becomes the job's failure reason.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Job exceeded its deadline of {}s", .0.as_secs())]
    DeadlineExceeded(Duration),

    #[error("Processing task panicked: {0}")]
    Panicked(String),
}

/// Why a file never became a job.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("'{name}' is not an image (content type: {mime})")]
    Rejected { name: String, mime: String },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
