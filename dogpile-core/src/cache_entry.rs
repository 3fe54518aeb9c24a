use std::time::{Duration, Instant};

/// A stored value together with the moment it was written and how long it lives.
///
/// Used by [`MemoryCache`](crate::MemoryCache) to implement per-entry expiration.
///
/// # Examples
///
/// ```
/// use dogpile_core::CacheEntry;
/// use std::time::Duration;
///
/// let entry = CacheEntry::new(vec![1u8, 2, 3], Some(Duration::from_secs(60)));
/// assert_eq!(entry.value, vec![1, 2, 3]);
/// assert!(!entry.is_expired());
///
/// let forever = CacheEntry::new("data", None);
/// assert!(!forever.is_expired());
/// ```
#[derive(Clone, Debug)]
pub struct CacheEntry<R> {
    pub value: R,
    pub inserted_at: Instant,
    /// `None` means the entry never expires.
    pub expiration: Option<Duration>,
}

impl<R> CacheEntry<R> {
    /// Creates a new entry stamped with `Instant::now()`.
    pub fn new(value: R, expiration: Option<Duration>) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
            expiration,
        }
    }

    /// Returns true once the entry has lived at least its expiration.
    pub fn is_expired(&self) -> bool {
        self.expiration
            .map_or(false, |ttl| self.inserted_at.elapsed() >= ttl)
    }
}
