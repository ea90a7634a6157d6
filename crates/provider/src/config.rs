use std::fmt;
use std::time::Duration;

use studiostyle_core::error::CoreError;

/// Default model used for both transforms.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

/// Default REST base URL.
pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Provider configuration loaded from environment variables.
#[derive(Clone)]
pub struct ProviderConfig {
    /// API key sent as `x-goog-api-key`.
    pub api_key: String,
    /// Model name, e.g. `gemini-2.5-flash-image`.
    pub model: String,
    /// Base URL without trailing slash.
    pub api_url: String,
    /// Per-request HTTP timeout. `None` leaves requests unbounded.
    pub request_timeout: Option<Duration>,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `GEMINI_API_KEY`        | required                   |
    /// | `GEMINI_MODEL`          | `gemini-2.5-flash-image`   |
    /// | `GEMINI_API_URL`        | public v1beta endpoint     |
    /// | `PROVIDER_TIMEOUT_SECS` | unset (no timeout)         |
    pub fn from_env() -> Result<Self, CoreError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CoreError::Validation("GEMINI_API_KEY must be set".to_string()))?;

        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());

        let api_url = std::env::var("GEMINI_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.into())
            .trim_end_matches('/')
            .to_string();

        let request_timeout = match std::env::var("PROVIDER_TIMEOUT_SECS") {
            Ok(raw) => Some(Duration::from_secs(raw.trim().parse().map_err(|_| {
                CoreError::Validation(format!(
                    "PROVIDER_TIMEOUT_SECS must be a valid u64, got '{raw}'"
                ))
            })?)),
            Err(_) => None,
        };

        Ok(Self {
            api_key,
            model,
            api_url,
            request_timeout,
        })
    }

    /// Full `generateContent` URL for the configured model.
    pub fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_url, self.model)
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
