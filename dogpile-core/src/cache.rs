use crate::{Codec, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// The contract every cache backend implements.
///
/// Keys passed in are logical keys; a backend applies its configured prefix
/// (see [`Options::key`](crate::Options::key)) before talking to the store.
/// Values cross this trait as bytes so that it stays object safe and backends
/// can be chosen at runtime; typed access lives in [`CacheExt`].
///
/// # Thread Safety
///
/// Implementations are shared between threads behind an `Arc<dyn Cache>` and
/// must synchronize internally. Atomicity of a single `save_bytes` is up to the
/// backend; nothing is promised across keys.
pub trait Cache: Send + Sync {
    /// Existence check. Backend faults count as "not contained".
    fn contain(&self, key: &str) -> bool;

    /// Removes the key. Deleting an absent key succeeds.
    fn delete(&self, key: &str) -> Result<()>;

    /// Returns the stored bytes, or [`CacheError::NotFound`](crate::CacheError::NotFound).
    fn fetch_bytes(&self, key: &str) -> Result<Vec<u8>>;

    /// Stores `value` under `key`.
    ///
    /// `None` or a zero `expiration` means "use the configured default".
    fn save_bytes(&self, key: &str, value: Vec<u8>, expiration: Option<Duration>) -> Result<()>;

    /// Lightweight connectivity check.
    fn ping(&self) -> Result<()>;

    /// Logical keys starting with any of `prefixes`, or every key if none are given.
    ///
    /// This is a best-effort snapshot: writes racing with the scan may or may
    /// not show up, and the cost grows with the size of the keyspace.
    fn keys(&self, prefixes: &[&str]) -> Result<Vec<String>>;

    /// Codec used by [`CacheExt`] to serialize values for this backend.
    fn codec(&self) -> Codec {
        Codec::default()
    }
}

/// Typed access on top of any [`Cache`].
///
/// # Examples
///
/// ```
/// use dogpile_core::{CacheExt, MemoryCache, Options};
///
/// let cache = MemoryCache::new(Options::new());
/// cache.save("answer", &42u32, None).unwrap();
///
/// let answer: u32 = cache.fetch("answer").unwrap();
/// assert_eq!(answer, 42);
/// assert!(cache.fetch::<u32>("question").unwrap_err().is_not_found());
/// ```
pub trait CacheExt: Cache {
    /// Fetches and decodes the value stored under `key`.
    fn fetch<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let bytes = self.fetch_bytes(key)?;
        Ok(self.codec().decode(&bytes)?)
    }

    /// Encodes and stores `value` under `key`.
    fn save<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        expiration: Option<Duration>,
    ) -> Result<()> {
        let bytes = self.codec().encode(value)?;
        self.save_bytes(key, bytes, expiration)
    }
}

impl<C: Cache + ?Sized> CacheExt for C {}
