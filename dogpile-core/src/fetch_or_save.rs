use crate::{Cache, CacheError, CacheExt, Codec, KeyMutex};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

#[cfg(feature = "stats")]
use crate::FetchStats;

/// Per-call settings for [`Coordinator::fetch_or_save`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Expiration for the saved value; `None` uses the backend default.
    pub expiration: Option<Duration>,
    /// How long to wait for another caller building the same key.
    /// `None` waits as long as it takes.
    pub lock_timeout: Option<Duration>,
}

impl FetchOptions {
    /// Backend default expiration, unbounded lock wait.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the backend's default expiration for the saved value.
    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Bounds the wait for another caller building the same key.
    ///
    /// [`Duration::MAX`] waits as long as no timeout at all.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }
}

/// Stampede protection for cache fills.
///
/// A coordinator owns the lock table used to serialize builders. For any
/// `(cache instance, key)` pair at most one builder runs at a time; callers
/// arriving meanwhile wait and then read what it stored. Different keys, and
/// the same key on different cache instances, never wait for each other.
///
/// Cache instances are told apart by address. All values of a zero-sized
/// backend type share one address, so their instances share lock keys and
/// serialize each other's builders.
///
/// Most code uses the process-wide coordinator through [`fetch_or_save`];
/// separate instances are useful to isolate statistics or tests.
///
/// # Limitations
///
/// A builder that never returns blocks every other caller for its key,
/// unless they set [`FetchOptions::lock_timeout`].
#[derive(Debug, Default)]
pub struct Coordinator {
    locks: KeyMutex,
    #[cfg(feature = "stats")]
    stats: FetchStats,
}

impl Coordinator {
    /// Creates a coordinator with an empty lock table and zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide coordinator.
    pub fn global() -> &'static Coordinator {
        static INSTANCE: Lazy<Coordinator> = Lazy::new(Coordinator::new);
        &INSTANCE
    }

    /// Lock table shared by all calls on this coordinator.
    pub fn locks(&self) -> &KeyMutex {
        &self.locks
    }

    /// How calls on this coordinator were served.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &FetchStats {
        &self.stats
    }

    /// Returns the cached value for `key`, building and saving it on a miss.
    ///
    /// 1. Fetch; a hit returns at once without locking.
    /// 2. Any error other than [`CacheError::NotFound`] is returned as is.
    /// 3. On a miss, lock the key for this cache instance and fetch again:
    ///    another caller may have filled it while this one waited.
    /// 4. Still missing: run `builder` (its error is returned unchanged) and save.
    /// 5. After a successful save, fetch once more so the caller gets the value
    ///    as the cache decodes it.
    /// 6. If the save fails, log a warning and return the built value passed
    ///    through the default codec instead. Nothing is persisted.
    ///
    /// The lock is released on every path, including a panicking builder.
    pub fn fetch_or_save<C, T, E, F>(
        &self,
        cache: &C,
        key: &str,
        builder: F,
        options: &FetchOptions,
    ) -> Result<T, E>
    where
        C: Cache + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, E>,
        E: From<CacheError>,
    {
        if let Some(value) = fetch_unless_missing(cache, key)? {
            #[cfg(feature = "stats")]
            self.stats.record_hit();
            return Ok(value);
        }

        let lock_key = lock_key(cache, key);
        let _guard = match options.lock_timeout {
            Some(timeout) => self.locks.lock_for(&lock_key, timeout).ok_or_else(|| {
                CacheError::LockTimeout {
                    key: key.to_string(),
                    waited: timeout,
                }
            })?,
            None => self.locks.lock(&lock_key),
        };

        if let Some(value) = fetch_unless_missing(cache, key)? {
            tracing::trace!(key, "value built by another caller");
            #[cfg(feature = "stats")]
            self.stats.record_shared();
            return Ok(value);
        }

        tracing::debug!(key, "building value");
        let value = builder()?;
        #[cfg(feature = "stats")]
        self.stats.record_build();

        if let Err(err) = cache.save(key, &value, options.expiration) {
            tracing::warn!(
                key,
                error = %err,
                "failed to save value to cache, returning it uncached"
            );
            #[cfg(feature = "stats")]
            self.stats.record_degraded();
            return Ok(Codec::default()
                .transcode(&value)
                .map_err(CacheError::from)?);
        }

        Ok(cache.fetch(key)?)
    }
}

/// Fetch-or-save through the process-wide [`Coordinator`].
///
/// `expiration` overrides the backend's default for the saved value.
///
/// # Examples
///
/// ```
/// use dogpile_core::{fetch_or_save, CacheError, MemoryCache, Options};
///
/// let cache = MemoryCache::new(Options::new());
///
/// let first: String = fetch_or_save(&cache, "greeting", || {
///     Ok::<_, CacheError>("hello".to_string())
/// }, None).unwrap();
///
/// // served from the cache, the builder does not run again
/// let second: String = fetch_or_save(&cache, "greeting", || -> Result<String, CacheError> {
///     unreachable!()
/// }, None).unwrap();
///
/// assert_eq!(first, second);
/// ```
pub fn fetch_or_save<C, T, E, F>(
    cache: &C,
    key: &str,
    builder: F,
    expiration: Option<Duration>,
) -> Result<T, E>
where
    C: Cache + ?Sized,
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Result<T, E>,
    E: From<CacheError>,
{
    let options = FetchOptions {
        expiration,
        lock_timeout: None,
    };
    Coordinator::global().fetch_or_save(cache, key, builder, &options)
}

/// `Ok(None)` on a miss, the value on a hit, the error on anything else.
fn fetch_unless_missing<C, T>(cache: &C, key: &str) -> Result<Option<T>, CacheError>
where
    C: Cache + ?Sized,
    T: DeserializeOwned,
{
    match cache.fetch(key) {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Lock key combining the identity of the cache instance with the logical key.
fn lock_key<C: Cache + ?Sized>(cache: &C, key: &str) -> String {
    format!("{:p}:{}", (cache as *const C).cast::<()>(), key)
}
