use std::fmt;

use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Opaque job identifier, assigned once at intake.
///
/// Built from the file name, its modification time, and a random suffix
/// so two submissions of the same file still get distinct ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh id: `{name}-{modified_ms}-{random hex}`.
    pub fn generate(name: &str, modified: Timestamp) -> Self {
        let suffix: u64 = rand::random();
        Self(format!("{name}-{}-{suffix:016x}", modified.timestamp_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Revocable display handle for a job's original image.
///
/// Rendered as `preview://<uuid>`. It never carries the bytes itself; a
/// preview store resolves it while it is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreviewRef(uuid::Uuid);

impl PreviewRef {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for PreviewRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PreviewRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "preview://{}", self.0)
    }
}
