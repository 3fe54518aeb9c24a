use std::time::Duration;

/// Exponential backoff with optional jitter.
///
/// Each call to [`Backoff::next_delay`] returns the delay to wait before the
/// next attempt. The base delay starts at `min` and doubles on every attempt
/// until it reaches `max`.
///
/// # Jitter
///
/// With jitter enabled (the default), the returned delay is drawn uniformly
/// from `[base, 2 * base)` and then capped at `max`. Since the next base is
/// twice the current one, the sequence of delays never decreases, while two
/// processes started at the same moment still drift apart.
///
/// # Examples
///
/// ```
/// use dogpile_retry::Backoff;
/// use std::time::Duration;
///
/// let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(1))
///     .with_jitter(false);
///
/// assert_eq!(backoff.next_delay(), Duration::from_millis(100));
/// assert_eq!(backoff.next_delay(), Duration::from_millis(200));
/// assert_eq!(backoff.next_delay(), Duration::from_millis(400));
/// assert_eq!(backoff.next_delay(), Duration::from_millis(800));
/// assert_eq!(backoff.next_delay(), Duration::from_secs(1));
/// ```
#[derive(Debug, Clone)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    factor: u32,
    jitter: bool,
    attempt: u32,
}

impl Backoff {
    /// Growth factor applied to the base delay on every attempt.
    pub const FACTOR: u32 = 2;

    /// Creates a backoff growing from `min` to `max` with jitter enabled.
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            factor: Self::FACTOR,
            jitter: true,
            attempt: 0,
        }
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Number of delays handed out since creation or the last [`reset`](Self::reset).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Starts over from the minimum delay.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Returns the delay for the current attempt and advances to the next one.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.base_delay(self.attempt);
        self.attempt = self.attempt.saturating_add(1);

        let delay = if self.jitter && !base.is_zero() {
            let span = u64::try_from(base.as_nanos()).unwrap_or(u64::MAX);
            base.saturating_add(Duration::from_nanos(fastrand::u64(0..span)))
        } else {
            base
        };

        delay.min(self.max)
    }

    fn base_delay(&self, attempt: u32) -> Duration {
        let mut delay = self.min;
        for _ in 0..attempt {
            if delay >= self.max {
                break;
            }
            delay = delay.saturating_mul(self.factor);
        }
        delay.min(self.max)
    }
}
