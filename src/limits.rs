//! Delivery limits and retry policy.
//!
//! The attachment ceiling is enforced by the chat platform; `target_chunk_bytes`
//! sits well under it so that the duration-based chunk estimate has room for
//! bitrate variance.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Size and concurrency limits for the relay pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryLimits {
    /// Hard attachment ceiling (default: 50 MiB, the Telegram bot limit)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    /// Target chunk size for splitting (default: 40 MiB)
    #[serde(default = "default_target_chunk_bytes")]
    pub target_chunk_bytes: u64,

    /// Minimum chunk duration in seconds, to avoid over-splitting short
    /// high-bitrate clips (default: 30)
    #[serde(default = "default_min_chunk_seconds")]
    pub min_chunk_seconds: f64,

    /// Timeout for any single external tool invocation (default: 900 = 15 min)
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_seconds: u64,

    /// Maximum number of simultaneously handled messages (default: 4)
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
}

fn default_max_upload_bytes() -> u64 {
    50 * 1024 * 1024
}
fn default_target_chunk_bytes() -> u64 {
    40 * 1024 * 1024
}
fn default_min_chunk_seconds() -> f64 {
    30.0
}
fn default_tool_timeout() -> u64 {
    900
}
fn default_max_concurrent_jobs() -> usize {
    4
}

impl Default for DeliveryLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            target_chunk_bytes: default_target_chunk_bytes(),
            min_chunk_seconds: default_min_chunk_seconds(),
            tool_timeout_seconds: default_tool_timeout(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
        }
    }
}

impl DeliveryLimits {
    /// Splitting is invoked iff the artifact exceeds the hard ceiling.
    pub fn needs_split(&self, size_bytes: u64) -> bool {
        size_bytes > self.max_upload_bytes
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_seconds)
    }
}

/// Retry policy for idempotent external steps (download, probe).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including first try)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay between retries in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Backoff multiplier (delay *= multiplier after each retry)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_delay() -> u64 {
    1000
}
fn default_max_delay() -> u64 {
    30000
}
fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryPolicy {
    /// Calculate delay for a specific attempt (1-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::from_millis(self.initial_delay_ms);
        }

        let delay =
            self.initial_delay_ms as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);

        let capped = delay.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(capped)
    }

    /// Check if we should retry based on attempt count
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = DeliveryLimits::default();
        assert_eq!(limits.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(limits.target_chunk_bytes, 40 * 1024 * 1024);
        assert_eq!(limits.min_chunk_seconds, 30.0);
        assert_eq!(limits.max_concurrent_jobs, 4);
    }

    #[test]
    fn test_split_trigger_boundary() {
        let limits = DeliveryLimits::default();

        assert!(!limits.needs_split(0));
        assert!(!limits.needs_split(limits.max_upload_bytes - 1));
        // exactly at the ceiling still fits in one upload
        assert!(!limits.needs_split(limits.max_upload_bytes));
        assert!(limits.needs_split(limits.max_upload_bytes + 1));
    }

    #[test]
    fn test_retry_policy_delays() {
        let policy = RetryPolicy {
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 10000,
            ..Default::default()
        };

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(4000));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(8000));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(10000)); // Capped
    }

    #[test]
    fn test_limits_deserialize_with_partial_fields() {
        let yaml = "max_upload_bytes: 1000\n";
        let limits: DeliveryLimits = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(limits.max_upload_bytes, 1000);
        // unspecified fields fall back to defaults
        assert_eq!(limits.target_chunk_bytes, 40 * 1024 * 1024);
        assert_eq!(limits.tool_timeout_seconds, 900);
    }
}
