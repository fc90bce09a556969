//! Worker configuration.

use std::time::Duration;

use tracing::warn;

/// Shortest poll interval the worker accepts.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Pipeline and retry worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Whether the retry worker should be started
    pub enabled: bool,
    /// How often the worker looks for due jobs
    pub poll_interval: Duration,
    /// Fixed delay before a failed job becomes due again
    pub retry_backoff: Duration,
    /// Transient failures tolerated before a job is marked FAILED
    pub max_retries: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval: Duration::from_secs(60),
            retry_backoff: Duration::from_secs(15 * 60),
            max_retries: 5,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            enabled: std::env::var("WORKER_ENABLED")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.enabled),
            poll_interval: Duration::from_secs(
                std::env::var("WORKER_POLL_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.poll_interval.as_secs()),
            )
            .max(MIN_POLL_INTERVAL),
            retry_backoff: Duration::from_secs(
                std::env::var("WORKER_RETRY_BACKOFF_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.retry_backoff.as_secs()),
            ),
            max_retries: std::env::var("WORKER_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
        }
    }

    /// Poll interval clamped to [`MIN_POLL_INTERVAL`].
    pub fn effective_poll_interval(&self) -> Duration {
        if self.poll_interval < MIN_POLL_INTERVAL {
            warn!(
                configured_ms = self.poll_interval.as_millis() as u64,
                "Worker poll interval too short, using {}s",
                MIN_POLL_INTERVAL.as_secs()
            );
            return MIN_POLL_INTERVAL;
        }
        self.poll_interval
    }

    /// Backoff as a chrono duration, for computing `next_retry_at`.
    pub fn retry_backoff_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.retry_backoff).unwrap_or(chrono::Duration::minutes(15))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_retry_policy() {
        let config = WorkerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.retry_backoff_chrono(), chrono::Duration::minutes(15));
        assert_eq!(config.max_retries, 5);
    }

    #[test]
    fn test_zero_poll_interval_is_clamped() {
        let config = WorkerConfig {
            poll_interval: Duration::ZERO,
            ..WorkerConfig::default()
        };
        assert_eq!(config.effective_poll_interval(), MIN_POLL_INTERVAL);

        let config = WorkerConfig::default();
        assert_eq!(config.effective_poll_interval(), Duration::from_secs(60));
    }
}
