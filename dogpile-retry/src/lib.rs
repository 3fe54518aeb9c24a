//! # Dogpile Retry
//!
//! A small, blocking retry loop used to make backend initialization resilient
//! to transient failures.
//!
//! ## Features
//!
//! - **Exponential backoff**: delays double from the initial interval up to a cap
//! - **Jitter**: randomized delays so independent processes don't retry in lockstep
//! - **Wall-clock timeout**: the loop gives up once its deadline has passed,
//!   however many attempts that took
//! - **Explicit abort**: an operation can declare a failure non-retryable with
//!   [`abort`], which ends the loop immediately and hands back the cause
//! - **Notification**: an observer callback runs before every sleep
//!
//! ## Example
//!
//! ```
//! use dogpile_retry::{retry_notify, Failure, RetryPolicy};
//! use std::io;
//! use std::time::Duration;
//!
//! fn connect(attempt: u32) -> io::Result<u32> {
//!     if attempt < 3 {
//!         return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "not yet"));
//!     }
//!     Ok(attempt)
//! }
//!
//! let policy = RetryPolicy::default()
//!     .with_initial_interval(Duration::from_millis(1))
//!     .with_max_interval(Duration::from_millis(5));
//!
//! let mut calls = 0;
//! let result = retry_notify(
//!     &policy,
//!     || -> Result<u32, Failure<io::Error>> {
//!         calls += 1;
//!         Ok(connect(calls)?)
//!     },
//!     |err, sleep| eprintln!("attempt failed: {err}, retrying in {sleep:?}"),
//! );
//!
//! assert_eq!(result.unwrap(), 3);
//! ```

mod backoff;
mod policy;

pub use backoff::Backoff;
pub use policy::{RetryPolicy, DEFAULT_INITIAL_INTERVAL, DEFAULT_MAX_INTERVAL, DEFAULT_TIMEOUT};

use std::thread;
use std::time::{Duration, Instant};

/// Outcome of a single failed attempt.
///
/// Any error converts into [`Failure::Transient`] through `?`, so operations
/// only need to be explicit when giving up.
#[derive(Debug)]
pub enum Failure<E> {
    /// Worth another attempt after a delay.
    Transient(E),
    /// Retrying is pointless; stop and return the cause.
    Abort(E),
}

impl<E> From<E> for Failure<E> {
    fn from(err: E) -> Self {
        Failure::Transient(err)
    }
}

/// Wraps `err` so that the retry loop stops immediately.
///
/// ```
/// use dogpile_retry::{abort, retry, RetryError, RetryPolicy};
///
/// let result: Result<(), _> = retry(&RetryPolicy::default(), || Err(abort("bad credentials")));
///
/// match result {
///     Err(RetryError::Aborted(cause)) => assert_eq!(cause, "bad credentials"),
///     other => panic!("unexpected {:?}", other),
/// }
/// ```
pub fn abort<E>(err: E) -> Failure<E> {
    Failure::Abort(err)
}

/// Why the retry loop ended without success.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// The deadline passed before any attempt succeeded.
    #[error("retry timeout after {attempts} attempts")]
    Timeout {
        attempts: u32,
        last_error: Option<E>,
    },
    /// The operation signalled a non-retryable failure.
    #[error("retry aborted: {0}")]
    Aborted(#[source] E),
}

impl<E> RetryError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RetryError::Timeout { .. })
    }

    /// Returns the cause passed to [`abort`], if the loop was aborted.
    pub fn into_abort_cause(self) -> Option<E> {
        match self {
            RetryError::Aborted(cause) => Some(cause),
            RetryError::Timeout { .. } => None,
        }
    }
}

/// Runs `operation` until it succeeds, aborts, or the policy's timeout elapses.
///
/// See [`retry_notify`] for the details; this variant has no observer.
pub fn retry<T, E, F>(policy: &RetryPolicy, operation: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Result<T, Failure<E>>,
{
    retry_notify(policy, operation, |_: &E, _| {})
}

/// Runs `operation` until it succeeds, aborts, or the policy's timeout elapses.
///
/// The deadline is computed once, on entry, and checked before every attempt.
/// A timeout too large to be represented as an [`Instant`] (such as
/// [`Duration::MAX`]) means no deadline: the loop runs until success or abort.
/// After a transient failure the next delay is computed (zero when backoff is
/// disabled, and never past the deadline), `notify` is called with the error
/// and that delay, and the calling thread sleeps.
///
/// An [`abort`]ed failure ends the loop at once with [`RetryError::Aborted`];
/// `notify` is not called for it.
pub fn retry_notify<T, E, F, N>(
    policy: &RetryPolicy,
    mut operation: F,
    mut notify: N,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Result<T, Failure<E>>,
    N: FnMut(&E, Duration),
{
    let policy = policy.normalized();
    let deadline = Instant::now().checked_add(policy.timeout);
    let mut backoff = policy
        .backoff
        .then(|| Backoff::new(policy.initial_interval, policy.max_interval));

    let mut attempts = 0u32;
    let mut last_error = None;

    loop {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            tracing::debug!(attempts, timeout = ?policy.timeout, "retry timed out");
            return Err(RetryError::Timeout {
                attempts,
                last_error,
            });
        }

        attempts = attempts.saturating_add(1);
        let err = match operation() {
            Ok(value) => return Ok(value),
            Err(Failure::Abort(cause)) => {
                tracing::debug!(attempts, "retry aborted");
                return Err(RetryError::Aborted(cause));
            }
            Err(Failure::Transient(err)) => err,
        };

        let mut sleep = backoff.as_mut().map_or(Duration::ZERO, Backoff::next_delay);
        if let Some(deadline) = deadline {
            sleep = sleep.min(deadline.saturating_duration_since(Instant::now()));
        }

        notify(&err, sleep);
        last_error = Some(err);

        if !sleep.is_zero() {
            thread::sleep(sleep);
        }
    }
}
