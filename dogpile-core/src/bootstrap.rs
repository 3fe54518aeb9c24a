use crate::{BackendRegistry, Cache, InitError, Options};
use dogpile_retry::{abort, retry_notify, Failure, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Prefix put in front of every key of a cache created by [`initialize`].
pub const DEFAULT_KEY_PREFIX: &str = "cache:";

const REDACTED_PASSWORD: &str = "xxxxx";

/// Settings for [`initialize_with`].
///
/// # Examples
///
/// ```
/// use dogpile_core::BootstrapConfig;
/// use std::time::Duration;
///
/// let config = BootstrapConfig::default();
/// assert_eq!(config.prefix, "cache:");
/// assert_eq!(config.retry.initial_interval, Duration::from_millis(500));
/// assert_eq!(config.retry.max_interval, Duration::from_secs(10));
/// assert_eq!(config.retry.timeout, Duration::from_secs(60));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Key prefix for the created cache.
    pub prefix: String,
    /// How long and how often to ping the backend before giving up.
    pub retry: RetryPolicy,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            retry: RetryPolicy::default()
                .with_initial_interval(Duration::from_millis(500))
                .with_max_interval(Duration::from_secs(10))
                .with_timeout(Duration::from_secs(60)),
        }
    }
}

/// Creates the application's cache and waits until its backend answers.
///
/// Uses the process-wide [`BackendRegistry`] and [`BootstrapConfig::default`].
/// The returned handle is meant to be created once by the application's
/// composition root and passed to whatever needs it.
///
/// ```
/// use dogpile_core::{initialize, Cache, CacheExt, MEMORY};
///
/// let cache = initialize(MEMORY, "").unwrap();
/// cache.save("k", "v", None).unwrap();
/// assert_eq!(cache.keys(&[]).unwrap(), vec!["k".to_string()]);
/// ```
pub fn initialize(backend: &str, address: &str) -> Result<Arc<dyn Cache>, InitError> {
    initialize_with(
        BackendRegistry::global(),
        backend,
        address,
        &BootstrapConfig::default(),
    )
}

/// Like [`initialize`], with an explicit registry and configuration.
///
/// The backend is pinged under `config.retry` until it answers. Errors that
/// can't be fixed by waiting (see [`CacheError::is_retryable`](crate::CacheError::is_retryable))
/// abort the retries at once. Every failed ping is logged with the address,
/// password masked. On failure no cache is returned.
pub fn initialize_with(
    registry: &BackendRegistry,
    backend: &str,
    address: &str,
    config: &BootstrapConfig,
) -> Result<Arc<dyn Cache>, InitError> {
    let options = Options::new()
        .with_address(address)
        .with_prefix(config.prefix.as_str());

    let cache = registry
        .build(backend, options)
        .map_err(|source| InitError::Create {
            backend: backend.to_string(),
            source,
        })?;

    let redacted = redact_address(address);

    retry_notify(
        &config.retry,
        || {
            cache.ping().map_err(|err| {
                if err.is_retryable() {
                    Failure::Transient(err)
                } else {
                    abort(err)
                }
            })
        },
        |err, sleep| {
            tracing::error!(
                address = %redacted,
                ?sleep,
                error = %err,
                "failed to ping cache, retrying"
            );
        },
    )
    .map_err(|source| InitError::Unreachable {
        address: redacted.clone(),
        source,
    })?;

    tracing::info!(backend, address = %redacted, "cache initialized");
    Ok(cache)
}

/// Masks the password of a URL-shaped address.
///
/// Addresses without a password, or that are not URLs, are returned unchanged.
///
/// ```
/// use dogpile_core::redact_address;
///
/// assert_eq!(
///     redact_address("redis://:s3cret@cache:6379/0"),
///     "redis://:xxxxx@cache:6379/0"
/// );
/// assert_eq!(redact_address("redis://cache:6379/0"), "redis://cache:6379/0");
/// ```
pub fn redact_address(address: &str) -> String {
    if let Ok(mut url) = Url::parse(address) {
        if url.password().is_some() && url.set_password(Some(REDACTED_PASSWORD)).is_ok() {
            return url.to_string();
        }
    }
    address.to_string()
}
