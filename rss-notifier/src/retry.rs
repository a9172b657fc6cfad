use backoff::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded retry policy for one outbound call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per item, the first one included.
    pub max_attempts: u32,
    #[serde(with = "millis")]
    pub initial_backoff: Duration,
    #[serde(with = "millis")]
    pub max_backoff: Duration,
    /// Added on top of the wait the sink asks for.
    #[serde(with = "millis")]
    pub rate_limit_margin: Duration,
    /// A sink asking for a longer pause than this is treated as down.
    #[serde(with = "millis")]
    pub max_rate_limit_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            rate_limit_margin: Duration::from_millis(500),
            max_rate_limit_wait: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Fresh backoff schedule for transient failures of a single item.
    /// Attempts are bounded by `max_attempts`, not by elapsed time.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_backoff,
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    /// How long to sleep after a rate-limit response, or `None` when the
    /// requested wait exceeds `max_rate_limit_wait`.
    pub fn rate_limit_delay(&self, retry_after: Duration) -> Option<Duration> {
        if retry_after > self.max_rate_limit_wait {
            return None;
        }
        Some(retry_after.saturating_add(self.rate_limit_margin))
    }

    pub fn attempts_left(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
