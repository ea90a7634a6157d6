use std::time::Duration;

use studiostyle_core::error::CoreError;

/// Default number of jobs allowed in `Processing` at once.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 3;

/// Scheduler configuration.
///
/// Fields are private so a zero limit, which would leave every job
/// `Pending` forever, cannot be constructed.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    concurrency_limit: usize,
    job_deadline: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            job_deadline: None,
        }
    }
}

impl SchedulerConfig {
    /// Config with the given limit and no deadline.
    pub fn with_limit(concurrency_limit: usize) -> Result<Self, CoreError> {
        if concurrency_limit == 0 {
            return Err(CoreError::Validation(
                "Concurrency limit must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            concurrency_limit,
            job_deadline: None,
        })
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.job_deadline = Some(deadline);
        self
    }

    /// Upper bound on jobs in `Processing`. Always at least 1.
    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Optional wall-clock budget per job. `None` lets a stuck provider
    /// call hold its slot indefinitely.
    pub fn job_deadline(&self) -> Option<Duration> {
        self.job_deadline
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var             | Default |
    /// |---------------------|---------|
    /// | `CONCURRENCY_LIMIT` | `3`     |
    /// | `JOB_DEADLINE_SECS` | unset   |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let limit = match var("CONCURRENCY_LIMIT") {
            Some(raw) => parse_limit(&raw)?,
            None => DEFAULT_CONCURRENCY_LIMIT,
        };
        let mut config = Self::with_limit(limit)?;

        if let Some(raw) = var("JOB_DEADLINE_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                CoreError::Validation(format!("JOB_DEADLINE_SECS must be a valid u64, got '{raw}'"))
            })?;
            config = config.deadline(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

fn parse_limit(raw: &str) -> Result<usize, CoreError> {
    raw.trim().parse().map_err(|_| {
        CoreError::Validation(format!("CONCURRENCY_LIMIT must be a positive integer, got '{raw}'"))
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<SchedulerConfig, CoreError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SchedulerConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn default_limit_is_three() {
        let config = SchedulerConfig::default();
        assert_eq!(config.concurrency_limit(), 3);
        assert!(config.job_deadline().is_none());
    }

    #[test]
    fn zero_limit_is_rejected() {
        assert_matches!(SchedulerConfig::with_limit(0), Err(CoreError::Validation(_)));
    }

    #[test]
    fn zero_limit_from_env_is_rejected() {
        assert_matches!(
            from_pairs(&[("CONCURRENCY_LIMIT", "0")]),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn env_values_are_applied() {
        let vars = [("CONCURRENCY_LIMIT", "5"), ("JOB_DEADLINE_SECS", "90")];
        let config = from_pairs(&vars).unwrap();
        assert_eq!(config.concurrency_limit(), 5);
        assert_eq!(config.job_deadline(), Some(Duration::from_secs(90)));

        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.concurrency_limit(), DEFAULT_CONCURRENCY_LIMIT);
        assert!(config.job_deadline().is_none());
    }

    #[test]
    fn limit_parsing() {
        assert_eq!(parse_limit(" 5 ").unwrap(), 5);
        assert!(parse_limit("-1").is_err());
        assert!(parse_limit("three").is_err());
    }
}
