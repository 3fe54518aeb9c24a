use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(100);
/// Default upper bound for a single delay.
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(1);
/// Default wall-clock budget for the whole retry loop.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings for [`retry`](crate::retry) and [`retry_notify`](crate::retry_notify).
///
/// Zero durations mean "use the default" and are replaced when the retry loop
/// starts, so a partially filled policy (for example one deserialized from a
/// configuration file) behaves sensibly.
///
/// # Examples
///
/// ```
/// use dogpile_retry::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default()
///     .with_initial_interval(Duration::from_millis(500))
///     .with_max_interval(Duration::from_secs(10));
///
/// assert_eq!(policy.timeout, Duration::from_secs(60));
/// assert!(policy.backoff);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delay before the first retry; the base of the exponential growth.
    pub initial_interval: Duration,
    /// Cap applied to every delay.
    pub max_interval: Duration,
    /// Deadline for the whole loop, measured from its start.
    pub timeout: Duration,
    /// When `false`, failed attempts are retried immediately.
    pub backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            backoff: true,
        }
    }
}

impl RetryPolicy {
    /// Sets the delay before the first retry.
    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    /// Sets the cap on a single delay.
    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    /// Sets the wall-clock budget of the loop.
    ///
    /// [`Duration::MAX`] means no deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Turns exponential backoff on or off.
    pub fn with_backoff(mut self, backoff: bool) -> Self {
        self.backoff = backoff;
        self
    }

    /// Replaces zero durations with their defaults.
    pub fn normalized(mut self) -> Self {
        if self.initial_interval.is_zero() {
            self.initial_interval = DEFAULT_INITIAL_INTERVAL;
        }
        if self.max_interval.is_zero() {
            self.max_interval = DEFAULT_MAX_INTERVAL;
        }
        if self.timeout.is_zero() {
            self.timeout = DEFAULT_TIMEOUT;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.initial_interval, Duration::from_millis(100));
        assert_eq!(policy.max_interval, Duration::from_secs(1));
        assert_eq!(policy.timeout, Duration::from_secs(60));
        assert!(policy.backoff);
    }

    #[test]
    fn test_normalized_fills_zero_fields_only() {
        let policy = RetryPolicy {
            initial_interval: Duration::ZERO,
            max_interval: Duration::from_secs(3),
            timeout: Duration::ZERO,
            backoff: false,
        }
        .normalized();

        assert_eq!(policy.initial_interval, DEFAULT_INITIAL_INTERVAL);
        assert_eq!(policy.max_interval, Duration::from_secs(3));
        assert_eq!(policy.timeout, DEFAULT_TIMEOUT);
        assert!(!policy.backoff);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"backoff": false}"#).unwrap();
        assert_eq!(
            policy,
            RetryPolicy {
                backoff: false,
                ..RetryPolicy::default()
            }
        );
    }
}
