//! Gemini client configuration.

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Gemini client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key; extraction fails at call time when absent
    pub api_key: Option<String>,
    /// Model used for `generateContent`
    pub model: String,
    /// API root, overridable for tests and proxies
    pub base_url: String,
    /// Delay between remote file state checks
    pub poll_interval: Duration,
    /// Upper bound on the total wait for the file to become active
    pub max_poll_wait: Duration,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: Duration::from_secs(5),
            max_poll_wait: Duration::from_secs(600),
            request_timeout: Duration::from_secs(300),
        }
    }
}

impl GeminiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let poll_interval_secs: u64 = std::env::var("GEMINI_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.poll_interval.as_secs());

        let max_poll_secs: u64 = std::env::var("GEMINI_MAX_POLL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_poll_wait.as_secs());

        Self {
            api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.model),
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            poll_interval: Duration::from_secs(poll_interval_secs),
            max_poll_wait: Duration::from_secs(max_poll_secs),
            request_timeout: defaults.request_timeout,
        }
    }

    /// Whether an API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_poll_wait(mut self, max_wait: Duration) -> Self {
        self.max_poll_wait = max_wait;
        self
    }
}
